//! Configuration errors.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading or validating repository settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Settings file could not be read.
    #[error("cannot read {path}: {message}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Settings file is not valid JSON for the settings schema.
    #[error("invalid settings in {path}: {message}")]
    Json {
        /// File path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// An override carries an unusable value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue {
        /// Setting or variable name.
        key: String,
        /// Error message.
        message: String,
    },

    /// Validation found errors.
    #[error("invalid repository settings: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Create an IO error with context.
    #[must_use]
    pub fn io(path: &Path, err: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    /// Create a JSON error with context.
    #[must_use]
    pub fn json(path: &Path, err: &sonic_rs::Error) -> Self {
        Self::Json {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

impl From<ConfigError> for overture_core::Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
