//! Error types for Overture operations.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Overture.
#[derive(Error, Debug)]
pub enum Error {
    /// Package not found.
    #[error("package '{name}' not found")]
    PackageNotFound {
        /// Package name.
        name: String,
    },

    /// Version not present for a known package.
    #[error("version '{version}' of '{name}' not found")]
    VersionNotFound {
        /// Package name.
        name: String,
        /// Requested version.
        version: String,
    },

    /// Malformed document or input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Unexpected format for an operation that requires a specific one.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// JSON error.
    #[error("json error: {0}")]
    Json(#[from] sonic_rs::Error),

    /// IO error.
    #[error("io error at {path}: {message}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Archive error.
    #[error("archive error: {0}")]
    Archive(String),

    /// Storage collaborator error.
    #[error("store error: {0}")]
    Store(String),

    /// Cache error.
    #[error("cache error: {0}")]
    Cache(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    /// Create an IO error with context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Whether this error means the requested coordinate does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::PackageNotFound { .. } | Self::VersionNotFound { .. }
        )
    }
}

/// Result type for Overture operations.
pub type Result<T> = std::result::Result<T, Error>;
