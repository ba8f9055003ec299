//! Error taxonomy.
//!
//! The only process-wide failure path is configuration loading: a
//! missing or malformed travel-limit config aborts startup before any
//! worker spawns. Everything the workers hit at runtime (sensor
//! bounce, deferred fire requests, shutdown truncation) is handled
//! locally and never crosses a worker boundary as an error.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading / validation / persistence error.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file could not be written (calibration output).
    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML parse error.
    #[error("failed to parse config: {0}")]
    Parse(String),

    /// TOML serialization error.
    #[error("failed to serialize config: {0}")]
    Serialize(String),

    /// A value failed validation.
    #[error("config validation: {0}")]
    Validation(String),
}
