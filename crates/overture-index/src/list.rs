//! `packages/list.json` documents and name filters.

use crate::error::{IndexError, Result};
use overture_core::PackageName;
use overture_core::json::{self, JsonMap, Value};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

const PACKAGE_NAMES_KEY: &str = "packageNames";

static FILTER_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^\s*(?P<vendor>[*a-zA-Z0-9_.-]+)/(?P<project>[*a-zA-Z0-9_.-]+)\s*$").ok()
});

/// A `vendor/project` filter where either segment may use `*` wildcards.
#[derive(Debug, Clone)]
pub struct PackageFilter {
    vendor: Regex,
    project: Regex,
}

impl PackageFilter {
    /// Parse a filter; `None` if it is not a valid `vendor/project` pattern.
    #[must_use]
    pub fn parse(filter: &str) -> Option<Self> {
        let captures = FILTER_PATTERN.as_ref()?.captures(filter)?;
        Some(Self {
            vendor: segment_regex(&captures["vendor"])?,
            project: segment_regex(&captures["project"])?,
        })
    }

    /// Whether `name` matches.
    #[must_use]
    pub fn matches(&self, name: &PackageName) -> bool {
        self.vendor.is_match(name.vendor()) && self.project.is_match(name.project())
    }
}

fn segment_regex(segment: &str) -> Option<Regex> {
    let body = segment
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{body}$")).ok()
}

/// `{"packageNames": [...]}` document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListDocument {
    /// Sorted package names.
    pub package_names: Vec<String>,
}

impl ListDocument {
    /// Parse from bytes. Non-string names are skipped.
    ///
    /// # Errors
    /// Returns a validation error if `packageNames` is not an array.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let root = json::parse_object(bytes)?;
        let package_names = match root.get(PACKAGE_NAMES_KEY) {
            None => Vec::new(),
            Some(Value::Array(names)) => names
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            Some(other) => {
                return Err(IndexError::validation(format!(
                    "'{PACKAGE_NAMES_KEY}' must be an array, found {}",
                    json::kind_of(other)
                )));
            }
        };
        Ok(Self { package_names })
    }

    /// JSON form.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut root = JsonMap::new();
        root.insert(PACKAGE_NAMES_KEY.into(), Value::from(self.package_names.clone()));
        Value::Object(root)
    }

    /// Serialize to compact JSON bytes.
    ///
    /// # Errors
    /// Returns error if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(json::to_json_bytes(&self.to_value())?)
    }
}

/// Build the sorted name list, optionally filtered.
///
/// An empty filter lists everything; an invalid filter lists nothing.
#[must_use]
pub fn build_list_document<'a>(
    names: impl IntoIterator<Item = &'a PackageName>,
    filter: Option<&str>,
) -> ListDocument {
    let filter = match filter.map(str::trim).filter(|f| !f.is_empty()) {
        None => None,
        Some(raw) => match PackageFilter::parse(raw) {
            Some(filter) => Some(filter),
            None => return ListDocument::default(),
        },
    };
    let package_names: BTreeSet<String> = names
        .into_iter()
        .filter(|name| filter.as_ref().is_none_or(|f| f.matches(name)))
        .map(PackageName::full_name)
        .collect();
    ListDocument {
        package_names: package_names.into_iter().collect(),
    }
}
