//! Index engine error types.

use overture_core::Error as CoreError;
use std::fmt;

/// Errors raised while building, merging, rewriting or minifying documents.
#[derive(Debug)]
pub enum IndexError {
    /// Malformed document input.
    Validation {
        /// Error message.
        message: String,
    },
    /// Package absent from a document.
    PackageNotFound {
        /// Package name.
        name: String,
    },
    /// Version absent from a known package.
    VersionNotFound {
        /// Package name.
        name: String,
        /// Requested version.
        version: String,
    },
    /// Dist type the operation cannot handle.
    UnsupportedFormat {
        /// Package name.
        name: String,
        /// Version string.
        version: String,
        /// Offending dist type.
        dist_type: String,
    },
    /// Metadata could not be extracted from a package archive.
    Extraction {
        /// Error message.
        message: String,
    },
    /// Component or blob store failure.
    Store {
        /// Error message.
        message: String,
    },
    /// Error from the core crate.
    Core(CoreError),
}

impl IndexError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create an extraction error.
    #[must_use]
    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction {
            message: message.into(),
        }
    }

    /// Create a store error.
    #[must_use]
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Whether the requested coordinate is absent ("not resolvable").
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        match self {
            Self::PackageNotFound { .. } | Self::VersionNotFound { .. } => true,
            Self::Core(err) => err.is_not_found(),
            _ => false,
        }
    }
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation { message } => write!(f, "Invalid document: {message}"),
            Self::PackageNotFound { name } => write!(f, "Package '{name}' not found"),
            Self::VersionNotFound { name, version } => {
                write!(f, "Version '{version}' of '{name}' not found")
            }
            Self::UnsupportedFormat {
                name,
                version,
                dist_type,
            } => write!(
                f,
                "Unsupported dist type '{dist_type}' for {name}@{version}, expected zip"
            ),
            Self::Extraction { message } => write!(f, "Metadata extraction failed: {message}"),
            Self::Store { message } => write!(f, "Store error: {message}"),
            Self::Core(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for IndexError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Core(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CoreError> for IndexError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(message) => Self::Validation { message },
            CoreError::Archive(message) => Self::Extraction { message },
            CoreError::Store(message) => Self::Store { message },
            other => Self::Core(other),
        }
    }
}

impl From<IndexError> for CoreError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::Validation { message } => Self::Validation(message),
            IndexError::PackageNotFound { name } => Self::PackageNotFound { name },
            IndexError::VersionNotFound { name, version } => {
                Self::VersionNotFound { name, version }
            }
            err @ IndexError::UnsupportedFormat { .. } => Self::UnsupportedFormat(err.to_string()),
            IndexError::Extraction { message } => Self::Archive(message),
            IndexError::Store { message } => Self::Store(message),
            IndexError::Core(err) => err,
        }
    }
}

/// Result type for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;
