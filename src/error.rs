use std::{io, path::PathBuf};

use thiserror::Error;

/// Failure to bring a record, or a whole layer, into memory.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The backing file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The backing file is not a valid GeoJSON feature.
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The record listing has no `id` column.
    #[error("no `id` column in the header of {}", path.display())]
    MissingIdColumn { path: PathBuf },
}

/// Invalid worker configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: expected {expected}")]
    InvalidValue {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}
