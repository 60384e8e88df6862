//! Package coordinates and stability.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Package name (`vendor/project`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageName {
    vendor: String,
    project: String,
}

impl PackageName {
    /// Create new package name.
    #[must_use]
    pub fn new(vendor: impl Into<String>, project: impl Into<String>) -> Self {
        Self {
            vendor: vendor.into(),
            project: project.into(),
        }
    }

    /// Parse from "vendor/project" string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let (vendor, project) = s.split_once('/')?;
        if vendor.is_empty() || project.is_empty() || project.contains('/') {
            return None;
        }
        Some(Self::new(vendor, project))
    }

    /// Get vendor.
    #[must_use]
    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    /// Get project.
    #[must_use]
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Get full name.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.vendor, self.project)
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.vendor, self.project)
    }
}

impl FromStr for PackageName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| Error::Validation(format!("invalid package name '{s}'")))
    }
}

impl TryFrom<String> for PackageName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PackageName> for String {
    fn from(name: PackageName) -> Self {
        name.full_name()
    }
}

/// Whether a version string names a development branch (`dev-main`, `2.x-dev`).
#[must_use]
pub fn is_dev_version(version: &str) -> bool {
    let lower = version.trim().to_ascii_lowercase();
    lower.starts_with("dev-") || lower.ends_with("-dev")
}
