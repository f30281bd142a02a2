use std::time::Instant;

use rayon::prelude::*;
use serde_json::{Map, Value};
use tracing::{info, trace};

use crate::config::WorkerConfig;
use crate::error::LoadError;
use crate::feature::{load_record, FeatureCollection, RecordStore};
use crate::ids::RecordIds;
use crate::point_locator::PointLocator;
use crate::quadtree::SpatialIndex;

/// Progress is logged every time this many ids have been processed.
const PROGRESS_INTERVAL: usize = 10_000;

/// A fully loaded layer, ready to answer queries.
#[derive(Debug)]
pub struct Layer {
    name: String,
    index: SpatialIndex,
}

impl Layer {
    pub fn new(name: impl Into<String>, index: SpatialIndex) -> Self {
        Self {
            name: name.into(),
            index,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    /// The properties of the record containing `[lon, lat]`, or an empty map if there is none.
    pub fn search(&self, lon: f64, lat: f64) -> Map<String, Value> {
        self.index
            .locate_record(&[lon, lat])
            .map(|record| record.properties())
            .unwrap_or_default()
    }
}

/// Loads every record of a layer and builds its index.
///
/// Any record that cannot be read aborts the whole layer.
pub fn load_layer<S>(name: &str, source: &S, config: &WorkerConfig) -> Result<Layer, LoadError>
where
    S: RecordIds + RecordStore,
{
    let start = Instant::now();

    let ids = source.ids(name)?;
    info!(layer = name, ids = ids.len(), elapsed = ?start.elapsed(), "record ids loaded");

    let collection = load_collection(name, &ids, source, config)?;
    info!(
        layer = name,
        records = collection.len(),
        skipped = ids.len() - collection.len(),
        elapsed = ?start.elapsed(),
        "finished building feature collection"
    );

    let index = SpatialIndex::with_capacity(collection, config.capacity);
    info!(layer = name, elapsed = ?start.elapsed(), "finished loading layer");

    Ok(Layer::new(name, index))
}

fn load_collection<S>(
    name: &str,
    ids: &[String],
    source: &S,
    config: &WorkerConfig,
) -> Result<FeatureCollection, LoadError>
where
    S: RecordStore + ?Sized,
{
    if config.parallel_reads {
        // Collecting an indexed parallel iterator keeps the records in id order
        let records = ids
            .par_iter()
            .map(|id| load_record(id, name, source, config.tolerance))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(records.into_iter().flatten().collect());
    }

    let mut collection = FeatureCollection::new();
    for (count, id) in ids.iter().enumerate() {
        if count > 0 && count % PROGRESS_INTERVAL == 0 {
            trace!(
                layer = name,
                count,
                percentage = count as f64 / ids.len() as f64 * 100.,
                "loading records"
            );
        }
        if let Some(record) = load_record(id, name, source, config.tolerance)? {
            collection.push(record);
        }
    }
    Ok(collection)
}
