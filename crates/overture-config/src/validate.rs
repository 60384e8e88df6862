//! Settings validation.

use crate::error::{ConfigError, Result};
use crate::settings::RepositorySettings;
use overture_index::RepositoryType;
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;
use url::Url;

static NAME_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").ok());

/// How serious an issue is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Settings work but are probably not what was meant.
    Warning,
    /// Settings cannot be used.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// One finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Severity.
    pub severity: Severity,
    /// Offending setting.
    pub field: String,
    /// Description.
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.severity, self.field, self.message)
    }
}

/// All findings of one validation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    /// Findings in check order.
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    fn push(&mut self, severity: Severity, field: &str, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            severity,
            field: field.to_string(),
            message: message.into(),
        });
    }

    /// Whether no error was found (warnings allowed).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors().next().is_none()
    }

    /// Error findings.
    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity == Severity::Error)
    }

    /// Warning findings.
    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity == Severity::Warning)
    }

    /// `Ok` if valid, otherwise every error joined into one.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] when any error was found.
    pub fn into_result(self) -> Result<()> {
        if self.is_valid() {
            return Ok(());
        }
        let errors: Vec<String> = self.errors().map(ToString::to_string).collect();
        Err(ConfigError::Invalid(errors.join("; ")))
    }
}

/// Checks repository settings for consistency.
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator;

impl Validator {
    /// Create a validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validate `settings`.
    #[must_use]
    pub fn validate(&self, settings: &RepositorySettings) -> ValidationResult {
        let mut result = ValidationResult::default();

        if !is_valid_name(&settings.name) {
            result.push(
                Severity::Error,
                "name",
                format!("'{}' is not a valid repository name", settings.name),
            );
        }
        if let Err(message) = check_http_url(&settings.base_url) {
            result.push(Severity::Error, "base-url", message);
        }
        if settings.node_id.trim().is_empty() {
            result.push(
                Severity::Warning,
                "node-id",
                "empty node id; every event will be treated as local",
            );
        }
        if settings.blob_update_window_secs == 0 {
            result.push(
                Severity::Warning,
                "blob-update-window-secs",
                "zero window; every update event triggers a rebuild",
            );
        }

        match (settings.kind, &settings.upstream_url) {
            (RepositoryType::Proxy, None) => {
                result.push(Severity::Error, "upstream-url", "a proxy needs an upstream");
            }
            (RepositoryType::Proxy, Some(upstream)) => {
                if let Err(message) = check_http_url(upstream) {
                    result.push(Severity::Error, "upstream-url", message);
                }
            }
            (_, Some(_)) => result.push(
                Severity::Warning,
                "upstream-url",
                format!("ignored for {} repositories", settings.kind),
            ),
            (_, None) => {}
        }

        if settings.kind == RepositoryType::Group {
            self.validate_members(settings, &mut result);
        } else if !settings.members.is_empty() {
            result.push(
                Severity::Warning,
                "members",
                format!("ignored for {} repositories", settings.kind),
            );
        }

        result
    }

    fn validate_members(&self, settings: &RepositorySettings, result: &mut ValidationResult) {
        if settings.members.is_empty() {
            result.push(Severity::Error, "members", "a group needs at least one member");
        }
        let mut seen = HashSet::new();
        for member in &settings.members {
            if !is_valid_name(&member.name) {
                result.push(
                    Severity::Error,
                    "members",
                    format!("'{}' is not a valid repository name", member.name),
                );
            } else if member.name == settings.name {
                result.push(Severity::Error, "members", "a group cannot contain itself");
            } else if !seen.insert(member.name.as_str()) {
                result.push(
                    Severity::Error,
                    "members",
                    format!("duplicate member '{}'", member.name),
                );
            }
        }
    }
}

fn is_valid_name(name: &str) -> bool {
    NAME_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(name))
}

fn check_http_url(raw: &str) -> std::result::Result<(), String> {
    let url = Url::parse(raw).map_err(|e| format!("'{raw}' is not a URL: {e}"))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(format!("unsupported scheme '{scheme}', expected http or https")),
    }
}
