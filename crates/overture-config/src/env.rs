//! `OVERTURE_*` environment overrides.

use crate::error::{ConfigError, Result};
use crate::settings::RepositorySettings;
use std::path::PathBuf;
use tracing::debug;

/// Environment variables that override settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvVar {
    /// `OVERTURE_BASE_URL`
    BaseUrl,
    /// `OVERTURE_REPOSITORY_NAME`
    RepositoryName,
    /// `OVERTURE_NODE_ID`
    NodeId,
    /// `OVERTURE_BLOB_UPDATE_WINDOW`
    BlobUpdateWindow,
    /// `OVERTURE_CACHE_DIR`
    CacheDir,
}

impl EnvVar {
    /// Every override, in application order.
    pub const ALL: [Self; 5] = [
        Self::BaseUrl,
        Self::RepositoryName,
        Self::NodeId,
        Self::BlobUpdateWindow,
        Self::CacheDir,
    ];

    /// Variable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::BaseUrl => "OVERTURE_BASE_URL",
            Self::RepositoryName => "OVERTURE_REPOSITORY_NAME",
            Self::NodeId => "OVERTURE_NODE_ID",
            Self::BlobUpdateWindow => "OVERTURE_BLOB_UPDATE_WINDOW",
            Self::CacheDir => "OVERTURE_CACHE_DIR",
        }
    }
}

/// Apply overrides from the process environment.
///
/// # Errors
/// Returns an invalid-value error for an unparsable duration.
pub fn apply_env(settings: &mut RepositorySettings) -> Result<Vec<EnvVar>> {
    apply_env_with(settings, |name| std::env::var(name).ok())
}

/// Apply overrides read through `lookup`. Empty values are ignored.
/// Returns the variables that were applied.
///
/// # Errors
/// Returns an invalid-value error for an unparsable duration.
pub fn apply_env_with(
    settings: &mut RepositorySettings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Vec<EnvVar>> {
    let mut applied = Vec::new();
    for var in EnvVar::ALL {
        let Some(value) = lookup(var.name()).filter(|v| !v.trim().is_empty()) else {
            continue;
        };
        let value = value.trim().to_string();
        match var {
            EnvVar::BaseUrl => settings.base_url = value,
            EnvVar::RepositoryName => settings.name = value,
            EnvVar::NodeId => settings.node_id = value,
            EnvVar::BlobUpdateWindow => {
                settings.blob_update_window_secs =
                    parse_duration_secs(&value).ok_or_else(|| ConfigError::InvalidValue {
                        key: var.name().to_string(),
                        message: format!("'{value}' is not a duration"),
                    })?;
            }
            EnvVar::CacheDir => settings.cache_dir = Some(PathBuf::from(value)),
        }
        debug!(variable = var.name(), "applied environment override");
        applied.push(var);
    }
    Ok(applied)
}

/// Parse `90`, `90s`, `5m` or `1h` into seconds.
#[must_use]
pub fn parse_duration_secs(s: &str) -> Option<u64> {
    let s = s.trim();
    let (number, unit) = match s.find(|c: char| !c.is_ascii_digit()) {
        Some(split) => s.split_at(split),
        None => (s, ""),
    };
    let number: u64 = number.parse().ok()?;
    let multiplier = match unit.trim() {
        "" | "s" => 1,
        "m" => 60,
        "h" => 3600,
        _ => return None,
    };
    number.checked_mul(multiplier)
}
