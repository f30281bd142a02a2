use crate::error::ConfigError;
use crate::quadtree::DEFAULT_CAPACITY;
use crate::simplify::DEFAULT_TOLERANCE;

/// Environment variable overriding [`WorkerConfig::tolerance`].
pub const TOLERANCE_VAR: &str = "POLYLOC_TOLERANCE";
/// Environment variable overriding [`WorkerConfig::parallel_reads`].
pub const PARALLEL_READS_VAR: &str = "POLYLOC_PARALLEL_READS";
/// Environment variable overriding [`WorkerConfig::capacity`].
pub const CAPACITY_VAR: &str = "POLYLOC_NODE_CAPACITY";

/// Settings of a layer worker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkerConfig {
    /// Douglas–Peucker tolerance applied to outer rings, in degrees.
    pub tolerance: f64,
    /// Read the records of a layer in parallel.
    pub parallel_reads: bool,
    /// Number of polygons a quadtree node may hold before it is split.
    pub capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            parallel_reads: false,
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl WorkerConfig {
    /// Builds a configuration from the process environment, starting from the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    /// Builds a configuration from `(key, value)` pairs, starting from the defaults.
    ///
    /// Unknown keys are ignored.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();
        for (key, value) in vars {
            let value = value.as_ref().trim();
            match key.as_ref() {
                TOLERANCE_VAR => {
                    config.tolerance = value
                        .parse()
                        .ok()
                        .filter(|tolerance: &f64| tolerance.is_finite() && *tolerance >= 0.)
                        .ok_or_else(|| invalid(TOLERANCE_VAR, value, "a non-negative number"))?;
                }
                PARALLEL_READS_VAR => {
                    config.parallel_reads = match value.to_ascii_lowercase().as_str() {
                        "1" | "true" | "yes" | "on" => true,
                        "0" | "false" | "no" | "off" | "" => false,
                        _ => return Err(invalid(PARALLEL_READS_VAR, value, "a boolean")),
                    };
                }
                CAPACITY_VAR => {
                    config.capacity = value
                        .parse()
                        .ok()
                        .filter(|&capacity: &usize| capacity > 0)
                        .ok_or_else(|| invalid(CAPACITY_VAR, value, "a positive integer"))?;
                }
                _ => {}
            }
        }
        Ok(config)
    }
}

fn invalid(key: &'static str, value: &str, expected: &'static str) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_owned(),
        expected,
    }
}
