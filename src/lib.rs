//! Point location in administrative boundaries, one layer at a time.
//!
//! A layer (countries, regions, counties...) is loaded from a gazetteer checked out on disk:
//! every record listed for the layer is read, its outer rings are simplified, and a quadtree
//! [`SpatialIndex`] is built once over all of them. Queries then return the properties of the
//! record containing a `[lon, lat]` point.
//!
//! ```no_run
//! use polyloc::{load_layer, FsStore, WorkerConfig};
//!
//! let store = FsStore::new("/data/whosonfirst");
//! let layer = load_layer("country", &store, &WorkerConfig::default())?;
//! let properties = layer.search(2.35, 48.85);
//! println!("{}", serde_json::Value::Object(properties));
//! # Ok::<(), polyloc::LoadError>(())
//! ```
//!
//! A [`Worker`] wraps a layer behind the load/search message [`protocol`], and the
//! `polyloc-worker` binary exposes it over stdin/stdout as JSON lines.
#![doc(html_root_url = "https://docs.rs/polyloc/0.1.0")]

mod config;
mod error;
mod feature;
mod geometry;
mod ids;
mod layer;
mod linear_scan;
mod point_locator;
mod quadtree;
mod simplify;
mod winding_number;
mod worker;

pub mod protocol;

pub use config::{WorkerConfig, CAPACITY_VAR, PARALLEL_READS_VAR, TOLERANCE_VAR};
pub use error::{ConfigError, LoadError};
pub use feature::{
    load_record, resolve_name, FeatureCollection, FsStore, GeometryRecord, RawFeature,
    RecordStore, MIN_ID_LEN,
};
pub use geometry::{BoundingBox, Coord, Geometry, Polygon, Ring};
pub use ids::RecordIds;
pub use layer::{load_layer, Layer};
pub use linear_scan::LinearScan;
pub use point_locator::PointLocator;
pub use protocol::{Command, Coords, Event, QueryId};
pub use quadtree::{SpatialIndex, DEFAULT_CAPACITY, MAX_DEPTH};
pub use simplify::{simplify, simplify_geometry, DEFAULT_TOLERANCE};
pub use winding_number::Point;
pub use worker::{OpenFs, Worker, WorkerHandle, WorkerState};
