//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading launcher settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read launcher settings at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed launcher settings at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;
