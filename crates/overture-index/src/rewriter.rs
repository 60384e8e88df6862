//! Proxy-side rewriting of upstream documents.
//!
//! Upstream entries are repointed at the local repository so clients fetch
//! archives through the proxy cache. Source blocks are always removed.

use crate::document::{
    DIST_KEY, PackageDocument, PackagesDocument, ProviderDocument, REFERENCE_KEY, SHASUM_KEY,
    SOURCE_KEY, TYPE_KEY, URL_KEY, VERSION_KEY, ZIP_TYPE,
};
use crate::error::{IndexError, Result};
use crate::minify::{expand_document, minify_document};
use overture_core::PackageName;
use overture_core::json::{JsonMap, Value};
use overture_core::path::{join_url, list_url, metadata_url, providers_url, zipball_path};
use tracing::{debug, warn};

/// Handling of dist entries whose type is not `zip`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NonZipPolicy {
    /// Keep the upstream dist untouched.
    #[default]
    PassThrough,
    /// Fail the rewrite with an unsupported-format error.
    Reject,
}

/// Rewrites upstream documents to point at a local repository.
#[derive(Debug, Clone)]
pub struct IndexRewriter {
    base_url: String,
    non_zip: NonZipPolicy,
}

impl IndexRewriter {
    /// Create a rewriter targeting `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            non_zip: NonZipPolicy::default(),
        }
    }

    /// Set the non-zip dist policy.
    #[must_use]
    pub const fn with_non_zip_policy(mut self, policy: NonZipPolicy) -> Self {
        self.non_zip = policy;
        self
    }

    /// Target base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Rewrite a provider document. Entries without a dist block and
    /// packages with a malformed name are dropped.
    ///
    /// # Errors
    /// Returns an unsupported-format error for non-zip dists under
    /// [`NonZipPolicy::Reject`].
    pub fn rewrite_provider_document(&self, doc: ProviderDocument) -> Result<ProviderDocument> {
        let mut out = ProviderDocument::default();
        for (name, versions) in doc.packages {
            let Some(package) = parse_name(&name) else {
                continue;
            };
            let mut rewritten = indexmap::IndexMap::with_capacity(versions.len());
            for (version, entry) in versions {
                if let Some(entry) = self.rewrite_entry(&package, &version, entry)? {
                    rewritten.insert(version, entry);
                }
            }
            out.packages.insert(name, rewritten);
        }
        Ok(out)
    }

    /// Rewrite a Composer 2 document: expand, rewrite each entry using its own
    /// `version` field, re-minify. Entries without a version or dist are dropped.
    ///
    /// # Errors
    /// As [`Self::rewrite_provider_document`], plus codec failures.
    pub fn rewrite_package_document(&self, doc: PackageDocument) -> Result<PackageDocument> {
        let expanded = expand_document(doc)?;
        let mut out = PackageDocument::default();
        for (name, versions) in expanded.packages {
            let Some(package) = parse_name(&name) else {
                continue;
            };
            let mut rewritten = Vec::with_capacity(versions.len());
            for entry in versions {
                let Some(version) = entry.get(VERSION_KEY).and_then(Value::as_str) else {
                    debug!(package = %name, "dropping entry without version");
                    continue;
                };
                let version = version.to_string();
                if let Some(entry) = self.rewrite_entry(&package, &version, entry)? {
                    rewritten.push(entry);
                }
            }
            out.packages.insert(name, rewritten);
        }
        minify_document(out)
    }

    /// Keep only the root keys a proxy serves and repoint its URLs here.
    #[must_use]
    pub fn rewrite_packages_document(&self, doc: PackagesDocument) -> PackagesDocument {
        PackagesDocument {
            providers_url: doc.providers_url.map(|_| providers_url(&self.base_url)),
            metadata_url: doc.metadata_url.map(|_| metadata_url(&self.base_url)),
            list: doc.list.map(|_| list_url(&self.base_url)),
            available_packages: doc.available_packages,
            available_package_patterns: doc.available_package_patterns,
            provider_includes: indexmap::IndexMap::new(),
            providers: None,
        }
    }

    fn rewrite_entry(
        &self,
        name: &PackageName,
        version: &str,
        mut entry: JsonMap,
    ) -> Result<Option<JsonMap>> {
        entry.shift_remove(SOURCE_KEY);

        let Some(Value::Object(dist)) = entry.get(DIST_KEY) else {
            debug!(package = %name, version, "dropping entry without dist");
            return Ok(None);
        };

        let dist_type = dist.get(TYPE_KEY).and_then(Value::as_str).unwrap_or_default();
        if dist_type != ZIP_TYPE {
            return match self.non_zip {
                NonZipPolicy::PassThrough => Ok(Some(entry)),
                NonZipPolicy::Reject => Err(IndexError::UnsupportedFormat {
                    name: name.full_name(),
                    version: version.to_string(),
                    dist_type: dist_type.to_string(),
                }),
            };
        }

        let local = zip_dist(
            &self.base_url,
            name,
            version,
            dist.get(REFERENCE_KEY).cloned().unwrap_or(Value::Null),
            dist.get(SHASUM_KEY).cloned().unwrap_or(Value::Null),
        );
        entry.insert(DIST_KEY.into(), local);
        Ok(Some(entry))
    }
}

/// Zip dist pointing at the canonical zipball path under `base_url`,
/// carrying upstream reference and shasum values as-is.
pub(crate) fn zip_dist(
    base_url: &str,
    name: &PackageName,
    version: &str,
    reference: Value,
    shasum: Value,
) -> Value {
    let mut dist = JsonMap::new();
    dist.insert(
        URL_KEY.into(),
        Value::from(join_url(
            base_url,
            &zipball_path(name.vendor(), name.project(), version),
        )),
    );
    dist.insert(TYPE_KEY.into(), Value::from(ZIP_TYPE));
    dist.insert(REFERENCE_KEY.into(), reference);
    dist.insert(SHASUM_KEY.into(), shasum);
    Value::Object(dist)
}

/// Parse a document's package key, warning when it is not `vendor/project`.
pub(crate) fn parse_name(name: &str) -> Option<PackageName> {
    let parsed = PackageName::parse(name);
    if parsed.is_none() {
        warn!(package = name, "skipping malformed package name");
    }
    parsed
}

fn dist_url(entry: &JsonMap, name: &str, version: &str) -> Result<String> {
    entry
        .get(DIST_KEY)
        .and_then(|dist| dist.get(URL_KEY))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| IndexError::VersionNotFound {
            name: name.to_string(),
            version: version.to_string(),
        })
}

/// Upstream dist URL of a version in a provider document.
///
/// # Errors
/// Returns a not-found error if the package, the version or its dist URL is
/// absent.
pub fn get_dist_url(name: &PackageName, version: &str, doc: &ProviderDocument) -> Result<String> {
    let full = name.full_name();
    let versions = doc
        .packages
        .get(&full)
        .ok_or_else(|| IndexError::PackageNotFound { name: full.clone() })?;
    let entry = versions
        .get(version)
        .ok_or_else(|| IndexError::VersionNotFound {
            name: full.clone(),
            version: version.to_string(),
        })?;
    dist_url(entry, &full, version)
}

/// Upstream dist URL of a version in a Composer 2 document (expanded first
/// when minified).
///
/// # Errors
/// Returns a not-found error if the package, the version or its dist URL is
/// absent, or a validation error if the document cannot be expanded.
pub fn get_dist_url_from_package(
    name: &PackageName,
    version: &str,
    doc: &PackageDocument,
) -> Result<String> {
    let full = name.full_name();
    let expanded = expand_document(doc.clone())?;
    let versions = expanded
        .packages
        .get(&full)
        .ok_or_else(|| IndexError::PackageNotFound { name: full.clone() })?;
    let entry = versions
        .iter()
        .find(|entry| entry.get(VERSION_KEY).and_then(Value::as_str) == Some(version))
        .ok_or_else(|| IndexError::VersionNotFound {
            name: full.clone(),
            version: version.to_string(),
        })?;
    dist_url(entry, &full, version)
}
