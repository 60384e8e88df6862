//! Repository settings file.

use crate::error::{ConfigError, Result};
use overture_index::{DEFAULT_MAX_AVAILABLE_PACKAGES, RepositoryPriority, RepositoryType};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default recency window for update events, in seconds.
pub const DEFAULT_BLOB_UPDATE_WINDOW_SECS: u64 = 60;

/// A group member reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSettings {
    /// Member repository name.
    pub name: String,
    /// Merge precedence.
    #[serde(default)]
    pub priority: RepositoryPriority,
}

impl MemberSettings {
    /// Member with the given priority.
    #[must_use]
    pub fn new(name: impl Into<String>, priority: RepositoryPriority) -> Self {
        Self {
            name: name.into(),
            priority,
        }
    }
}

/// Settings of one repository.
///
/// ```json
/// {
///     "name": "php-group",
///     "base-url": "https://repo.example/repository/php-group",
///     "kind": "group",
///     "members": [
///         { "name": "php-hosted", "priority": "high" },
///         { "name": "php-proxy" }
///     ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RepositorySettings {
    /// Repository name.
    pub name: String,
    /// Public URL the repository is served at.
    pub base_url: String,
    /// Topology.
    pub kind: RepositoryType,
    /// Upstream repository URL (proxy only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_url: Option<String>,
    /// Members in declaration order (group only).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<MemberSettings>,
    /// Identity of this node in a clustered deployment.
    pub node_id: String,
    /// Updates whose blob changed longer ago than this are ignored.
    pub blob_update_window_secs: u64,
    /// Largest repository that still lists `available-packages`.
    pub max_available_packages: usize,
    /// Whether Composer 2 documents are advertised.
    pub serve_v2: bool,
    /// Directory of the filesystem document cache; in-memory when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            name: String::new(),
            base_url: String::new(),
            kind: RepositoryType::Hosted,
            upstream_url: None,
            members: Vec::new(),
            node_id: "local".to_string(),
            blob_update_window_secs: DEFAULT_BLOB_UPDATE_WINDOW_SECS,
            max_available_packages: DEFAULT_MAX_AVAILABLE_PACKAGES,
            serve_v2: true,
            cache_dir: None,
        }
    }
}

impl RepositorySettings {
    /// Hosted repository settings.
    #[must_use]
    pub fn hosted(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Parse settings from JSON.
    ///
    /// # Errors
    /// Returns a JSON error if the bytes do not match the settings schema.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        sonic_rs::from_slice(bytes).map_err(|e| ConfigError::json(Path::new("<memory>"), &e))
    }

    /// Read settings from a file.
    ///
    /// # Errors
    /// Returns an IO error if the file cannot be read or a JSON error if it
    /// does not match the settings schema.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read(path).map_err(|e| ConfigError::io(path, e))?;
        sonic_rs::from_slice(&content).map_err(|e| ConfigError::json(path, &e))
    }

    /// Serialize to pretty JSON.
    ///
    /// # Errors
    /// Returns a JSON error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String> {
        sonic_rs::to_string_pretty(self).map_err(|e| ConfigError::json(Path::new("<memory>"), &e))
    }

    /// Recency window for update events.
    #[must_use]
    pub const fn blob_update_window(&self) -> Duration {
        Duration::from_secs(self.blob_update_window_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_file_uses_defaults() {
        let settings = RepositorySettings::from_slice(
            br#"{"name":"php-hosted","base-url":"https://repo.example/repository/php-hosted"}"#,
        )
        .unwrap();
        assert_eq!(settings.kind, RepositoryType::Hosted);
        assert_eq!(settings.blob_update_window(), Duration::from_secs(60));
        assert_eq!(settings.max_available_packages, 100);
        assert!(settings.serve_v2);
        assert_eq!(settings.node_id, "local");
        assert!(settings.cache_dir.is_none());
    }

    #[test]
    fn group_members_parse_with_priorities() {
        let settings = RepositorySettings::from_slice(
            br#"{
                "name": "php-group",
                "base-url": "https://repo.example/repository/php-group",
                "kind": "group",
                "members": [
                    {"name": "php-hosted", "priority": "canonical"},
                    {"name": "php-proxy"}
                ],
                "serve-v2": false
            }"#,
        )
        .unwrap();
        assert_eq!(settings.kind, RepositoryType::Group);
        assert_eq!(
            settings.members,
            vec![
                MemberSettings::new("php-hosted", RepositoryPriority::Canonical),
                MemberSettings::new("php-proxy", RepositoryPriority::Normal),
            ]
        );
        assert!(!settings.serve_v2);
    }

    #[test]
    fn rejects_unknown_kind() {
        let err = RepositorySettings::from_slice(br#"{"name":"x","kind":"mirror"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json { .. }));
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("php-proxy.json");
        let mut settings = RepositorySettings::hosted("php-proxy", "https://repo.example/php-proxy");
        settings.kind = RepositoryType::Proxy;
        settings.upstream_url = Some("https://repo.packagist.org".into());
        std::fs::write(&path, settings.to_json_pretty().unwrap()).unwrap();

        assert_eq!(RepositorySettings::from_file(&path).unwrap(), settings);
        let missing = RepositorySettings::from_file(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }
}
