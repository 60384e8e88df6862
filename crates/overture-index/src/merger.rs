//! Group-side merging of member documents.
//!
//! Inputs are ranked by [`RepositoryPriority`](crate::RepositoryPriority)
//! (declaration order among equals) and merged first-writer-wins: the first
//! member to supply a `(name, version)` pair owns it.

use crate::document::{
    DIST_KEY, PackageDocument, PackagesDocument, ProviderDocument, REFERENCE_KEY, SHASUM_KEY,
    SOURCE_KEY, TIME_KEY, TYPE_KEY, VERSION_KEY, ZIP_TYPE, rebuild_entry,
};
use crate::error::Result;
use crate::minify::{expand_document, minify_document};
use crate::rewriter::{parse_name, zip_dist};
use crate::types::{MergeInput, rank};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use overture_core::{PackageName, format_utc};
use overture_core::json::{JsonMap, Value};
use overture_core::path::{metadata_url, providers_url};
use std::collections::BTreeSet;
use tracing::debug;

/// Merges member documents into documents served by a group repository.
#[derive(Debug, Clone)]
pub struct IndexMerger {
    base_url: String,
}

impl IndexMerger {
    /// Create a merger for the group served at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// Base URL of the group.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Merge root documents.
    ///
    /// The provider names are the union of every input, with placeholder
    /// digests since the group serves its own merged providers. URL templates
    /// always point at the group. `available-packages` survives only when
    /// every member lists it.
    #[must_use]
    pub fn merge_packages_documents(
        &self,
        inputs: Vec<MergeInput<PackagesDocument>>,
    ) -> PackagesDocument {
        let docs = rank(inputs);
        let mut names = BTreeSet::new();
        let mut available: Option<BTreeSet<String>> = Some(BTreeSet::new());
        let mut any_metadata_url = false;

        for doc in &docs {
            names.extend(doc.names().map(str::to_string));
            any_metadata_url |= doc.metadata_url.is_some();
            available = match (available, &doc.available_packages) {
                (Some(mut acc), Some(listed)) => {
                    acc.extend(listed.iter().cloned());
                    Some(acc)
                }
                _ => None,
            };
        }

        let mut merged = PackagesDocument::new(providers_url(&self.base_url));
        if any_metadata_url {
            merged.metadata_url = Some(metadata_url(&self.base_url));
        }
        merged.available_packages = available
            .filter(|names| !names.is_empty() && !docs.is_empty())
            .map(|names| names.into_iter().collect());
        merged.providers = Some(names.into_iter().map(|name| (name, None)).collect());
        merged
    }

    /// Merge provider documents.
    ///
    /// Entries without a dist are dropped, a missing `time` becomes `now`, and
    /// each kept entry is rebuilt with zip dists pointing at the group.
    ///
    /// Packages with a malformed name are skipped.
    #[must_use]
    pub fn merge_provider_documents(
        &self,
        inputs: Vec<MergeInput<ProviderDocument>>,
        now: DateTime<Utc>,
    ) -> ProviderDocument {
        let current_time = format_utc(now);
        let mut merged = ProviderDocument::default();

        for doc in rank(inputs) {
            for (name, versions) in doc.packages {
                let Some(package) = parse_name(&name) else {
                    continue;
                };
                for (version, entry) in versions {
                    self.merge_entry(&mut merged.packages, &package, &name, &version, &entry, &current_time);
                }
            }
        }
        merged
    }

    /// Merge Composer 2 documents: expand each input, merge as providers keyed
    /// by each entry's `version`, then re-minify.
    ///
    /// Packages with a malformed name are skipped.
    ///
    /// # Errors
    /// Returns a validation error for an undecodable input.
    pub fn merge_package_documents(
        &self,
        inputs: Vec<MergeInput<PackageDocument>>,
        now: DateTime<Utc>,
    ) -> Result<PackageDocument> {
        let current_time = format_utc(now);
        let mut merged: IndexMap<String, IndexMap<String, JsonMap>> = IndexMap::new();

        for doc in rank(inputs) {
            for (name, versions) in expand_document(doc)?.packages {
                let Some(package) = parse_name(&name) else {
                    continue;
                };
                for entry in versions {
                    let Some(version) = entry.get(VERSION_KEY).and_then(Value::as_str) else {
                        debug!(package = %name, "dropping entry without version");
                        continue;
                    };
                    let version = version.to_string();
                    self.merge_entry(&mut merged, &package, &name, &version, &entry, &current_time);
                }
            }
        }

        minify_document(PackageDocument {
            packages: merged
                .into_iter()
                .map(|(name, versions)| (name, versions.into_values().collect()))
                .collect(),
            minified: false,
        })
    }

    fn merge_entry(
        &self,
        merged: &mut IndexMap<String, IndexMap<String, JsonMap>>,
        package: &PackageName,
        name: &str,
        version: &str,
        entry: &JsonMap,
        current_time: &str,
    ) {
        let Some(Value::Object(dist)) = entry.get(DIST_KEY) else {
            debug!(package = name, version, "dropping entry without dist");
            return;
        };
        let versions = merged.entry(name.to_string()).or_default();
        if versions.contains_key(version) {
            return;
        }

        let time = entry
            .get(TIME_KEY)
            .and_then(Value::as_str)
            .unwrap_or(current_time);
        let dist = if dist.get(TYPE_KEY).and_then(Value::as_str) == Some(ZIP_TYPE) {
            zip_dist(
                &self.base_url,
                package,
                version,
                dist.get(REFERENCE_KEY).cloned().unwrap_or(Value::Null),
                dist.get(SHASUM_KEY).cloned().unwrap_or(Value::Null),
            )
        } else {
            Value::Object(dist.clone())
        };
        let source = entry.get(SOURCE_KEY).filter(|s| s.is_object()).cloned();

        versions.insert(
            version.to_string(),
            rebuild_entry(name, version, dist, source, time, entry),
        );
    }
}
