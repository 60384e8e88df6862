//! Repository settings for Overture.
//!
//! Settings come from a JSON file, are overridden by `OVERTURE_*`
//! environment variables and are validated before use:
//!
//! ```no_run
//! use std::path::Path;
//!
//! let settings = overture_config::load_settings(Path::new("php-hosted.json"))?;
//! println!("serving {} at {}", settings.name, settings.base_url);
//! # Ok::<(), overture_config::ConfigError>(())
//! ```

#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod env;
pub mod error;
pub mod settings;
pub mod validate;

pub use env::{EnvVar, apply_env, apply_env_with, parse_duration_secs};
pub use error::{ConfigError, Result};
pub use settings::{DEFAULT_BLOB_UPDATE_WINDOW_SECS, MemberSettings, RepositorySettings};
pub use validate::{Severity, ValidationIssue, ValidationResult, Validator};

use std::path::Path;
use tracing::{debug, warn};

/// Read settings from `path`, apply environment overrides and validate.
///
/// Warnings are logged; errors fail the load.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed, an override is
/// malformed, or validation finds an error.
pub fn load_settings(path: &Path) -> Result<RepositorySettings> {
    let mut settings = RepositorySettings::from_file(path)?;
    let applied = apply_env(&mut settings)?;
    finish(settings, path, applied.len())
}

/// Like [`load_settings`] with overrides read through `lookup`.
///
/// # Errors
/// See [`load_settings`].
pub fn load_settings_with(
    path: &Path,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<RepositorySettings> {
    let mut settings = RepositorySettings::from_file(path)?;
    let applied = apply_env_with(&mut settings, lookup)?;
    finish(settings, path, applied.len())
}

fn finish(settings: RepositorySettings, path: &Path, overrides: usize) -> Result<RepositorySettings> {
    let result = Validator::new().validate(&settings);
    for issue in result.warnings() {
        warn!(repository = %settings.name, field = %issue.field, "{}", issue.message);
    }
    result.into_result()?;
    debug!(
        path = %path.display(),
        repository = %settings.name,
        kind = %settings.kind,
        overrides,
        "loaded repository settings"
    );
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_applies_overrides_then_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("php-hosted.json");
        std::fs::write(&path, br#"{"name":"php-hosted","base-url":"not a url"}"#).unwrap();

        let err = load_settings_with(&path, |_| None).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref msg) if msg.contains("base-url")));

        let settings = load_settings_with(&path, |name| {
            (name == "OVERTURE_BASE_URL").then(|| "https://repo.example/php-hosted".to_string())
        })
        .unwrap();
        assert_eq!(settings.base_url, "https://repo.example/php-hosted");
    }
}
