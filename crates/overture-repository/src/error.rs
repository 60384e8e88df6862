//! Repository layer errors.

use overture_core::Error as CoreError;
use overture_index::IndexError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by document sources, caches and the invalidation pipeline.
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Document engine failure.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Document cache failure.
    #[error("document cache error at {path}: {message}")]
    Cache {
        /// Cache path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Upstream repository failure.
    #[error("upstream fetch of '{location}' failed: {message}")]
    Upstream {
        /// Requested location.
        location: String,
        /// Error message.
        message: String,
    },

    /// Event bus failure.
    #[error("event bus error: {0}")]
    Channel(String),

    /// Background worker could not be started.
    #[error("worker error: {0}")]
    Worker(String),
}

impl RepositoryError {
    /// Create a cache error with context.
    #[must_use]
    pub fn cache(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::Cache {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Create an upstream error.
    #[must_use]
    pub fn upstream(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Whether the requested coordinate does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        match self {
            Self::Index(err) => err.is_not_found(),
            _ => false,
        }
    }
}

impl From<CoreError> for RepositoryError {
    fn from(err: CoreError) -> Self {
        Self::Index(IndexError::from(err))
    }
}

impl From<RepositoryError> for CoreError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Index(err) => err.into(),
            err @ RepositoryError::Cache { .. } => Self::Cache(err.to_string()),
            err @ (RepositoryError::Upstream { .. }
            | RepositoryError::Channel(_)
            | RepositoryError::Worker(_)) => Self::Store(err.to_string()),
        }
    }
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
