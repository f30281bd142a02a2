//! Messages exchanged between a layer worker and its orchestrator.
//!
//! Both directions are internally tagged JSON objects, the tag being the `type` field:
//!
//! ```
//! use polyloc::protocol::{Command, Coords, QueryId};
//!
//! let command = Command::from_line(r#"{"type":"search","id":7,"coords":{"lat":1.5,"lon":2.5}}"#)?;
//! assert_eq!(
//!     command,
//!     Command::Search {
//!         id: QueryId::from(7),
//!         coords: Coords { lat: 1.5, lon: 2.5 },
//!     }
//! );
//! # Ok::<(), serde_json::Error>(())
//! ```
use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// A command sent to a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Command {
    /// Load the layer `name` from the gazetteer checked out at `directory`.
    Load { name: String, directory: PathBuf },
    /// Find the record containing `coords`.
    Search { id: QueryId, coords: Coords },
}

impl Command {
    /// Decodes a command from one line of JSON.
    pub fn from_line(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }

    /// Decodes a command from raw bytes, which need not be valid UTF-8.
    pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

/// The position of a query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coords {
    pub lat: f64,
    pub lon: f64,
}

/// The correlation id of a query, echoed back as received.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryId {
    Number(Number),
    Text(String),
}

impl From<i64> for QueryId {
    fn from(id: i64) -> Self {
        Self::Number(id.into())
    }
}

impl From<&str> for QueryId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_owned())
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(id) => write!(f, "{id}"),
            Self::Text(id) => write!(f, "{id:?}"),
        }
    }
}

/// An event emitted by a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Event {
    /// The layer is loaded and indexed. Emitted once per successful `load`.
    Loaded { name: String },
    /// The answer to a `search`. `results` is empty when no record contains the point.
    Results {
        name: String,
        id: QueryId,
        results: Map<String, Value>,
    },
    /// A `search` was received before any layer was ready.
    NotReady { name: Option<String>, id: QueryId },
    /// Loading the layer failed; the worker accepts a new `load`.
    LoadFailed { name: String, error: String },
    /// A command could not be decoded or is not allowed in the current state.
    Error { message: String },
}

impl Event {
    /// Encodes the event as one line of JSON, without the trailing newline.
    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
