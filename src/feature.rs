use std::{
    fs,
    iter,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::LoadError;
use crate::geometry::Geometry;
use crate::simplify::simplify_geometry;

/// Ids shorter than this are malformed or reserved, and are never loaded.
pub const MIN_ID_LEN: usize = 6;

/// A GeoJSON feature as stored in the gazetteer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFeature {
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub geometry: Option<Geometry>,
}

/// A gazetteer record, normalized for one layer.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryRecord {
    pub id: Value,
    pub name: Option<String>,
    /// Always the name of the layer the record was loaded for.
    pub placetype: String,
    pub hierarchy: Value,
    pub geometry: Option<Geometry>,
}

impl GeometryRecord {
    /// The property map sent back for a query matching this record.
    pub fn properties(&self) -> Map<String, Value> {
        let mut properties = Map::with_capacity(4);
        properties.insert("Id".to_owned(), self.id.clone());
        properties.insert(
            "Name".to_owned(),
            self.name.clone().map_or(Value::Null, Value::String),
        );
        properties.insert("Placetype".to_owned(), Value::String(self.placetype.clone()));
        properties.insert("Hierarchy".to_owned(), self.hierarchy.clone());
        properties
    }
}

/// The ordered records of one layer.
///
/// It only grows while the layer loads, and is consumed by
/// [`SpatialIndex::build`](crate::SpatialIndex::build), after which it can only be read.
#[derive(Debug, Clone, Default)]
pub struct FeatureCollection {
    records: Vec<GeometryRecord>,
}

impl FeatureCollection {
    /// Constructs a new empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: GeometryRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[GeometryRecord] {
        &self.records
    }

    pub(crate) fn into_records(self) -> Vec<GeometryRecord> {
        self.records
    }
}

impl FromIterator<GeometryRecord> for FeatureCollection {
    fn from_iter<T: IntoIterator<Item = GeometryRecord>>(iter: T) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

/// Access to the stored features of a gazetteer.
pub trait RecordStore: Sync {
    /// Fetches the raw feature with the given id.
    fn fetch(&self, id: &str) -> Result<RawFeature, LoadError>;
}

/// A gazetteer checked out on the local filesystem.
///
/// Features live under `<directory>/data/`, sharded by the first digits of their id: record
/// `1108830809` is stored in `data/110/883/0809/1108830809.geojson`.
#[derive(Debug, Clone)]
pub struct FsStore {
    directory: PathBuf,
}

impl FsStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The path of the feature file of a record.
    pub fn feature_path(&self, id: &str) -> PathBuf {
        let mut bounds = id
            .char_indices()
            .map(|(idx, _)| idx)
            .chain(iter::once(id.len()));
        let first = bounds.nth(3).unwrap_or(id.len());
        let second = bounds.nth(2).unwrap_or(id.len());
        self.directory
            .join("data")
            .join(&id[..first])
            .join(&id[first..second])
            .join(&id[second..])
            .join(format!("{id}.geojson"))
    }
}

impl RecordStore for FsStore {
    fn fetch(&self, id: &str) -> Result<RawFeature, LoadError> {
        let path = self.feature_path(id);
        let bytes = fs::read(&path).map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| LoadError::Parse { path, source })
    }
}

/// Loads one record for a layer.
///
/// Returns `Ok(None)` when the id is too short to be a gazetteer record: such ids are skipped
/// without failing the layer. Errors from the store are returned as is.
pub fn load_record<S>(
    id: &str,
    layer: &str,
    store: &S,
    tolerance: f64,
) -> Result<Option<GeometryRecord>, LoadError>
where
    S: RecordStore + ?Sized,
{
    if id.chars().count() < MIN_ID_LEN {
        debug!(id, "skipping id");
        return Ok(None);
    }

    let RawFeature {
        properties,
        mut geometry,
    } = store.fetch(id)?;

    if let Some(geometry) = geometry.as_mut() {
        simplify_geometry(geometry, tolerance);
    }

    Ok(Some(GeometryRecord {
        id: properties
            .get("wof:id")
            .cloned()
            .unwrap_or_else(|| Value::String(id.to_owned())),
        name: resolve_name(&properties),
        placetype: layer.to_owned(),
        hierarchy: properties
            .get("wof:hierarchy")
            .cloned()
            .unwrap_or(Value::Null),
        geometry,
    }))
}

/// Language properties looked at for a localized name, by priority.
const LANGUAGE_PROPERTIES: [&str; 3] = ["wof:lang_x_spoken", "wof:lang_x_official", "wof:lang"];

/// Picks the display name of a record.
///
/// In order of priority:
/// 1. the `qs:a2_alt` name of US counties ("Lancaster County" rather than "Lancaster"),
/// 2. the preferred name in a spoken, then official, then any listed language of the place,
/// 3. `wof:label`,
/// 4. `wof:name`.
pub fn resolve_name(properties: &Map<String, Value>) -> Option<String> {
    is_us_county(properties)
        .then(|| property_str(properties, "qs:a2_alt"))
        .flatten()
        .or_else(|| {
            LANGUAGE_PROPERTIES
                .iter()
                .find_map(|lang_property| localized_name(properties, lang_property))
        })
        .or_else(|| property_str(properties, "wof:label"))
        .or_else(|| property_str(properties, "wof:name"))
}

fn is_us_county(properties: &Map<String, Value>) -> bool {
    properties.get("iso:country").and_then(Value::as_str) == Some("US")
        && properties.get("wof:placetype").and_then(Value::as_str) == Some("county")
}

fn localized_name(properties: &Map<String, Value>, lang_property: &str) -> Option<String> {
    let languages: Vec<&str> = match properties.get(lang_property)? {
        Value::String(lang) => vec![lang.as_str()],
        Value::Array(langs) => langs.iter().filter_map(Value::as_str).collect(),
        _ => return None,
    };
    if languages.is_empty() || matches!(languages.as_slice(), ["unk"] | ["und"]) {
        return None;
    }

    let name = languages
        .iter()
        .find_map(|lang| property_str(properties, &format!("name:{lang}_x_preferred")));
    if name.is_none() {
        warn!(
            lang_property,
            ?languages,
            name = ?properties.get("wof:name"),
            id = ?properties.get("wof:id"),
            "no preferred name for the listed languages"
        );
    }
    name
}

/// The string value of a property, or the first element if it is an array.
///
/// Empty strings count as missing.
fn property_str(properties: &Map<String, Value>, key: &str) -> Option<String> {
    let value = match properties.get(key)? {
        Value::Array(values) => values.first()?,
        value => value,
    };
    value
        .as_str()
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;

    use anyhow::Result;
    use rstest::rstest;
    use serde_json::json;

    use crate::geometry::{Polygon, Ring};
    use crate::simplify::DEFAULT_TOLERANCE;

    use super::*;

    /// An in-memory store, missing ids fail like a missing file.
    #[derive(Clone, Default)]
    pub(crate) struct MemoryStore {
        pub(crate) features: HashMap<String, Value>,
    }

    impl MemoryStore {
        pub(crate) fn insert(&mut self, id: &str, feature: Value) {
            self.features.insert(id.to_owned(), feature);
        }
    }

    impl RecordStore for MemoryStore {
        fn fetch(&self, id: &str) -> Result<RawFeature, LoadError> {
            let path = PathBuf::from(format!("memory://{id}"));
            let feature = self.features.get(id).ok_or_else(|| LoadError::Io {
                path: path.clone(),
                source: std::io::ErrorKind::NotFound.into(),
            })?;
            serde_json::from_value(feature.clone()).map_err(|source| LoadError::Parse { path, source })
        }
    }

    pub(crate) fn square(x: f64, y: f64, side: f64) -> Ring {
        vec![
            [x, y],
            [x + side, y],
            [x + side, y + side],
            [x, y + side],
            [x, y],
        ]
    }

    pub(crate) fn square_feature(id: u64, name: &str, x: f64, y: f64, side: f64) -> Value {
        json!({
            "type": "Feature",
            "properties": {
                "wof:id": id,
                "wof:name": name,
                "wof:placetype": "region",
                "wof:hierarchy": [{ "region_id": id }],
            },
            "geometry": { "type": "Polygon", "coordinates": [square(x, y, side)] },
        })
    }

    #[rstest]
    #[case("1108830809", "data/110/883/0809/1108830809.geojson")]
    #[case("85632793", "data/856/327/93/85632793.geojson")]
    #[case("856327", "data/856/327/856327.geojson")]
    fn feature_paths_are_sharded(#[case] id: &str, #[case] expected: &str) {
        let store = FsStore::new("/wof");

        assert_eq!(store.feature_path(id), Path::new("/wof").join(expected));
    }

    #[test]
    fn short_ids_are_skipped() -> Result<()> {
        let mut store = MemoryStore::default();
        store.insert("12345", square_feature(12345, "Short", 0., 0., 1.));

        let record = load_record("12345", "region", &store, DEFAULT_TOLERANCE)?;

        assert_eq!(record, None);
        Ok(())
    }

    #[test]
    fn valid_id_is_loaded_with_the_layer_placetype() -> Result<()> {
        let mut store = MemoryStore::default();
        store.insert("123456", square_feature(123456, "Square", 0., 0., 1.));

        let record = load_record("123456", "county", &store, DEFAULT_TOLERANCE)?.unwrap();

        assert_eq!(record.id, json!(123456));
        assert_eq!(record.name.as_deref(), Some("Square"));
        assert_eq!(record.placetype, "county");
        assert_eq!(
            record.geometry,
            Some(Geometry::Polygon(Polygon::new(square(0., 0., 1.), vec![])))
        );
        assert_eq!(
            Value::Object(record.properties()),
            json!({
                "Id": 123456,
                "Name": "Square",
                "Placetype": "county",
                "Hierarchy": [{ "region_id": 123456 }],
            })
        );
        Ok(())
    }

    #[test]
    fn null_geometry_is_kept() -> Result<()> {
        let mut store = MemoryStore::default();
        store.insert(
            "123456",
            json!({ "properties": { "wof:name": "Nowhere" }, "geometry": null }),
        );

        let record = load_record("123456", "region", &store, DEFAULT_TOLERANCE)?.unwrap();

        assert_eq!(record.geometry, None);
        assert_eq!(record.id, json!("123456")); // Falls back to the requested id
        assert_eq!(record.hierarchy, Value::Null);
        Ok(())
    }

    #[test]
    fn store_errors_are_returned() {
        let mut store = MemoryStore::default();
        store.insert("654321", json!({ "geometry": { "type": "Polygon", "coordinates": 3 } }));

        assert!(matches!(
            load_record("123456", "region", &store, DEFAULT_TOLERANCE),
            Err(LoadError::Io { .. })
        ));
        assert!(matches!(
            load_record("654321", "region", &store, DEFAULT_TOLERANCE),
            Err(LoadError::Parse { .. })
        ));
    }

    #[rstest]
    #[case::plain_name(json!({ "wof:name": "Lancaster" }), Some("Lancaster"))]
    #[case::label_over_name(
        json!({ "wof:name": "Lancaster", "wof:label": "Lancaster, PA" }),
        Some("Lancaster, PA")
    )]
    #[case::us_county(
        json!({
            "wof:name": "Lancaster",
            "wof:placetype": "county",
            "iso:country": "US",
            "qs:a2_alt": "Lancaster County",
        }),
        Some("Lancaster County")
    )]
    #[case::non_us_county(
        json!({
            "wof:name": "Lancaster",
            "wof:placetype": "county",
            "iso:country": "GB",
            "qs:a2_alt": "Lancaster County",
        }),
        Some("Lancaster")
    )]
    #[case::spoken_language(
        json!({
            "wof:name": "Kyiv",
            "wof:lang_x_spoken": ["ukr", "rus"],
            "wof:lang_x_official": ["eng"],
            "name:rus_x_preferred": ["Киев"],
            "name:eng_x_preferred": ["Kyiv"],
        }),
        Some("Киев")
    )]
    #[case::official_language(
        json!({
            "wof:name": "Deutschland",
            "wof:lang_x_spoken": ["unk"],
            "wof:lang_x_official": "deu",
            "name:deu_x_preferred": ["Deutschland"],
        }),
        Some("Deutschland")
    )]
    #[case::missing_localized_name(
        json!({ "wof:name": "Somewhere", "wof:lang": ["fra"] }),
        Some("Somewhere")
    )]
    #[case::empty_label(json!({ "wof:name": "Lancaster", "wof:label": "" }), Some("Lancaster"))]
    #[case::empty_preferred_name(
        json!({
            "wof:name": "Kyiv",
            "wof:lang_x_spoken": ["ukr", "rus"],
            "name:ukr_x_preferred": [""],
            "name:rus_x_preferred": ["Киев"],
        }),
        Some("Киев")
    )]
    #[case::empty_us_county_name(
        json!({
            "wof:name": "Lancaster",
            "wof:placetype": "county",
            "iso:country": "US",
            "qs:a2_alt": "",
        }),
        Some("Lancaster")
    )]
    #[case::only_empty_names(json!({ "wof:name": "", "wof:label": [""] }), None)]
    #[case::no_name(json!({}), None)]
    fn name_resolution(#[case] properties: Value, #[case] expected: Option<&str>) {
        let Value::Object(properties) = properties else {
            panic!("properties should be an object");
        };

        assert_eq!(resolve_name(&properties).as_deref(), expected);
    }
}
