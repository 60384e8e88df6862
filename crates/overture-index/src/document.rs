//! Typed views over the Composer index documents.
//!
//! Every document keeps its version entries as ordered [`JsonMap`]s so fields
//! the engine does not know about pass through merge and rewrite untouched.
//! Parsing is strict about document structure (objects where objects belong)
//! and lenient about entry content; callers decide what an incomplete entry
//! means.

use crate::error::{IndexError, Result};
use indexmap::IndexMap;
use overture_core::json::{self, JsonMap, Value, kind_of};
use overture_core::path::{expand_template, join_url, zipball_path};
use overture_core::{PackageName, is_dev_version, version_uid};
use serde::{Deserialize, Serialize};

/// Sentinel marking a key removed in a minified diff.
pub const UNSET: &str = "__unset";

/// Root key flagging a minified document.
pub const MINIFIED_KEY: &str = "minified";

/// Value of [`MINIFIED_KEY`] for the Composer 2 format.
pub const MINIFIED_V2: &str = "composer/2.0";

/// Dist type that is synthesized and rewritten.
pub const ZIP_TYPE: &str = "zip";

/// Metadata fields copied verbatim into synthesized version entries, in
/// output order.
pub const PASSTHROUGH_FIELDS: [&str; 20] = [
    "autoload",
    "autoload-dev",
    "require",
    "replace",
    "require-dev",
    "suggest",
    "authors",
    "bin",
    "conflict",
    "description",
    "extra",
    "homepage",
    "include-path",
    "keywords",
    "license",
    "provide",
    "target-dir",
    "scripts",
    "support",
    "type",
];

pub(crate) const PACKAGES_KEY: &str = "packages";
pub(crate) const PROVIDERS_KEY: &str = "providers";
pub(crate) const PROVIDERS_URL_KEY: &str = "providers-url";
pub(crate) const METADATA_URL_KEY: &str = "metadata-url";
pub(crate) const PROVIDER_INCLUDES_KEY: &str = "provider-includes";
pub(crate) const LIST_KEY: &str = "list";
pub(crate) const AVAILABLE_PACKAGES_KEY: &str = "available-packages";
pub(crate) const AVAILABLE_PACKAGE_PATTERNS_KEY: &str = "available-package-patterns";
pub(crate) const SHA256_KEY: &str = "sha256";

pub(crate) const NAME_KEY: &str = "name";
pub(crate) const VERSION_KEY: &str = "version";
pub(crate) const DIST_KEY: &str = "dist";
pub(crate) const SOURCE_KEY: &str = "source";
pub(crate) const TIME_KEY: &str = "time";
pub(crate) const UID_KEY: &str = "uid";
pub(crate) const URL_KEY: &str = "url";
pub(crate) const TYPE_KEY: &str = "type";
pub(crate) const REFERENCE_KEY: &str = "reference";
pub(crate) const SHASUM_KEY: &str = "shasum";

/// Downloadable artifact pointer of one version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistInfo {
    /// Download URL.
    pub url: String,
    /// Archive type.
    #[serde(rename = "type")]
    pub dist_type: String,
    /// Commit or content reference.
    pub reference: Option<String>,
    /// SHA-1 checksum of the archive.
    pub shasum: Option<String>,
}

impl DistInfo {
    /// Zip dist served from the canonical zipball path under `base_url`.
    #[must_use]
    pub fn zip(
        base_url: &str,
        name: &PackageName,
        version: &str,
        reference: Option<String>,
        shasum: Option<String>,
    ) -> Self {
        Self {
            url: join_url(
                base_url,
                &zipball_path(name.vendor(), name.project(), version),
            ),
            dist_type: ZIP_TYPE.to_string(),
            reference,
            shasum,
        }
    }

    /// JSON form with the fixed `url, type, reference, shasum` key order.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = JsonMap::new();
        map.insert(URL_KEY.into(), Value::from(self.url.as_str()));
        map.insert(TYPE_KEY.into(), Value::from(self.dist_type.as_str()));
        map.insert(REFERENCE_KEY.into(), self.reference.clone().into());
        map.insert(SHASUM_KEY.into(), self.shasum.clone().into());
        Value::Object(map)
    }
}

/// Source-control provenance recorded at upload time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// VCS type.
    #[serde(rename = "type")]
    pub source_type: String,
    /// Repository URL.
    pub url: String,
    /// Commit, branch or tag.
    pub reference: String,
}

impl SourceInfo {
    /// Build from upload attributes; `None` unless all three are non-blank.
    #[must_use]
    pub fn from_attributes(
        source_type: Option<&str>,
        url: Option<&str>,
        reference: Option<&str>,
    ) -> Option<Self> {
        fn non_blank(s: Option<&str>) -> Option<&str> {
            s.map(str::trim).filter(|s| !s.is_empty())
        }
        Some(Self {
            source_type: non_blank(source_type)?.to_string(),
            url: non_blank(url)?.to_string(),
            reference: non_blank(reference)?.to_string(),
        })
    }

    /// JSON form with the fixed `type, url, reference` key order.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = JsonMap::new();
        map.insert(TYPE_KEY.into(), Value::from(self.source_type.as_str()));
        map.insert(URL_KEY.into(), Value::from(self.url.as_str()));
        map.insert(REFERENCE_KEY.into(), Value::from(self.reference.as_str()));
        Value::Object(map)
    }
}

/// One synthesized version entry.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageVersion {
    /// Package name.
    pub name: PackageName,
    /// Version string.
    pub version: String,
    /// Dist block.
    pub dist: DistInfo,
    /// Optional source block.
    pub source: Option<SourceInfo>,
    /// Formatted UTC timestamp.
    pub time: String,
    /// Deterministic id derived from name, version and time.
    pub uid: u32,
    /// Passthrough fields, already filtered and ordered.
    pub passthrough: JsonMap,
}

impl PackageVersion {
    /// Assemble an entry, keeping only the passthrough fields of `metadata`.
    #[must_use]
    pub fn new(
        name: PackageName,
        version: impl Into<String>,
        dist: DistInfo,
        source: Option<SourceInfo>,
        time: impl Into<String>,
        metadata: &JsonMap,
    ) -> Self {
        let version = version.into();
        let time = time.into();
        let uid = version_uid(&name.full_name(), &version, &time);
        Self {
            name,
            version,
            dist,
            source,
            time,
            uid,
            passthrough: passthrough(metadata),
        }
    }

    /// Whether this is a development version.
    #[must_use]
    pub fn is_dev(&self) -> bool {
        is_dev_version(&self.version)
    }

    /// JSON form: `name, version, dist, source?, time, uid, passthrough...`.
    #[must_use]
    pub fn to_entry(&self) -> JsonMap {
        assemble_entry(
            &self.name.full_name(),
            &self.version,
            self.dist.to_value(),
            self.source.as_ref().map(SourceInfo::to_value),
            &self.time,
            self.uid,
            &self.passthrough,
        )
    }
}

/// Rebuild a version entry from foreign metadata: recomputes `uid` and keeps
/// only the passthrough fields of `metadata`.
#[must_use]
pub fn rebuild_entry(
    name: &str,
    version: &str,
    dist: Value,
    source: Option<Value>,
    time: &str,
    metadata: &JsonMap,
) -> JsonMap {
    let uid = version_uid(name, version, time);
    assemble_entry(
        name,
        version,
        dist,
        source,
        time,
        uid,
        &passthrough(metadata),
    )
}

fn assemble_entry(
    name: &str,
    version: &str,
    dist: Value,
    source: Option<Value>,
    time: &str,
    uid: u32,
    passthrough: &JsonMap,
) -> JsonMap {
    let mut entry = JsonMap::new();
    entry.insert(NAME_KEY.into(), Value::from(name));
    entry.insert(VERSION_KEY.into(), Value::from(version));
    entry.insert(DIST_KEY.into(), dist);
    if let Some(source) = source {
        entry.insert(SOURCE_KEY.into(), source);
    }
    entry.insert(TIME_KEY.into(), Value::from(time));
    entry.insert(UID_KEY.into(), Value::from(uid));
    for (key, value) in passthrough {
        entry.insert(key.clone(), value.clone());
    }
    entry
}

/// Passthrough fields of `metadata`, in canonical order.
#[must_use]
pub fn passthrough(metadata: &JsonMap) -> JsonMap {
    PASSTHROUGH_FIELDS
        .iter()
        .filter_map(|key| {
            metadata
                .get(*key)
                .map(|value| ((*key).to_string(), value.clone()))
        })
        .collect()
}

/// Root `packages.json` document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackagesDocument {
    /// `providers-url` template.
    pub providers_url: Option<String>,
    /// `metadata-url` template (Composer 2).
    pub metadata_url: Option<String>,
    /// URL of the package name list.
    pub list: Option<String>,
    /// Names of every package the repository serves, for small repositories.
    pub available_packages: Option<Vec<String>>,
    /// Name patterns the repository may serve.
    pub available_package_patterns: Option<Vec<String>>,
    /// Provider include paths and their digests.
    pub provider_includes: IndexMap<String, Option<String>>,
    /// Package name to provider digest; `None` digests are placeholders.
    pub providers: Option<IndexMap<String, Option<String>>>,
}

impl PackagesDocument {
    /// Empty document with a `providers-url` template.
    #[must_use]
    pub fn new(providers_url: impl Into<String>) -> Self {
        Self {
            providers_url: Some(providers_url.into()),
            providers: Some(IndexMap::new()),
            ..Self::default()
        }
    }

    /// Names listed under `providers`.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.providers
            .iter()
            .flat_map(|providers| providers.keys().map(String::as_str))
    }

    /// Resolve the provider URL of `name` from the `providers-url` template.
    ///
    /// Returns `None` without a template, or when the template needs a
    /// `%hash%` and no digest is known for `name`.
    #[must_use]
    pub fn provider_url(&self, name: &str) -> Option<String> {
        let template = self.providers_url.as_deref()?;
        let digest = self.provider_digest(name);
        if template.contains(overture_core::path::HASH_PLACEHOLDER) && digest.is_none() {
            return None;
        }
        Some(expand_template(template, name, digest))
    }

    /// SHA-256 the provider document of `name` is published under.
    #[must_use]
    pub fn provider_digest(&self, name: &str) -> Option<&str> {
        self.providers
            .as_ref()
            .and_then(|providers| providers.get(name))
            .and_then(Option::as_deref)
    }

    /// Resolve each `provider-includes` path template against its digest,
    /// paired with that digest.
    #[must_use]
    pub fn provider_include_urls(&self) -> Vec<(String, Option<String>)> {
        self.provider_includes
            .iter()
            .map(|(template, digest)| {
                (
                    expand_template(template, "", digest.as_deref()),
                    digest.clone(),
                )
            })
            .collect()
    }

    /// Fold a fetched provider-include document (`{"providers": {...}}`) into
    /// this document's name to digest map. Existing digests are kept.
    ///
    /// # Errors
    /// Returns a validation error if the include is malformed.
    pub fn fold_provider_include(&mut self, include: &[u8]) -> Result<usize> {
        let mut root = json::parse_object(include)?;
        let providers = match root.remove(PROVIDERS_KEY) {
            Some(value) => parse_digests(value, PROVIDERS_KEY)?,
            None => IndexMap::new(),
        };
        let target = self.providers.get_or_insert_with(IndexMap::new);
        let mut added = 0;
        for (name, digest) in providers {
            target.entry(name).or_insert_with(|| {
                added += 1;
                digest
            });
        }
        Ok(added)
    }

    /// Parse from bytes.
    ///
    /// # Errors
    /// Returns a validation error if the document is malformed.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Self::from_map(json::parse_object(bytes)?)
    }

    /// Parse from a JSON object. Unknown keys are dropped.
    ///
    /// # Errors
    /// Returns a validation error if a known key has the wrong shape.
    pub fn from_map(mut root: JsonMap) -> Result<Self> {
        let providers = root
            .remove(PROVIDERS_KEY)
            .map(|value| parse_digests(value, PROVIDERS_KEY))
            .transpose()?;
        let provider_includes = root
            .remove(PROVIDER_INCLUDES_KEY)
            .map(|value| parse_digests(value, PROVIDER_INCLUDES_KEY))
            .transpose()?
            .unwrap_or_default();
        Ok(Self {
            providers_url: take_string(&mut root, PROVIDERS_URL_KEY)?,
            metadata_url: take_string(&mut root, METADATA_URL_KEY)?,
            list: take_string(&mut root, LIST_KEY)?,
            available_packages: take_strings(&mut root, AVAILABLE_PACKAGES_KEY)?,
            available_package_patterns: take_strings(&mut root, AVAILABLE_PACKAGE_PATTERNS_KEY)?,
            provider_includes,
            providers,
        })
    }

    /// JSON form.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut root = JsonMap::new();
        if let Some(url) = &self.providers_url {
            root.insert(PROVIDERS_URL_KEY.into(), Value::from(url.as_str()));
        }
        if let Some(url) = &self.metadata_url {
            root.insert(METADATA_URL_KEY.into(), Value::from(url.as_str()));
        }
        if let Some(url) = &self.list {
            root.insert(LIST_KEY.into(), Value::from(url.as_str()));
        }
        if let Some(names) = &self.available_packages {
            root.insert(AVAILABLE_PACKAGES_KEY.into(), Value::from(names.clone()));
        }
        if let Some(patterns) = &self.available_package_patterns {
            root.insert(
                AVAILABLE_PACKAGE_PATTERNS_KEY.into(),
                Value::from(patterns.clone()),
            );
        }
        if !self.provider_includes.is_empty() {
            root.insert(
                PROVIDER_INCLUDES_KEY.into(),
                digests_to_value(&self.provider_includes),
            );
        }
        if let Some(providers) = &self.providers {
            root.insert(PROVIDERS_KEY.into(), digests_to_value(providers));
        }
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

/// Composer 1 provider document: name to version to entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderDocument {
    /// Entries keyed by package name, then version string.
    pub packages: IndexMap<String, IndexMap<String, JsonMap>>,
}

impl ProviderDocument {
    /// Whether the document holds no version entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.values().all(IndexMap::is_empty)
    }

    /// Number of version entries.
    #[must_use]
    pub fn version_count(&self) -> usize {
        self.packages.values().map(IndexMap::len).sum()
    }

    /// Look up one entry.
    #[must_use]
    pub fn entry(&self, name: &str, version: &str) -> Option<&JsonMap> {
        self.packages.get(name)?.get(version)
    }

    /// Insert an entry, replacing an existing one for the same version.
    pub fn insert(&mut self, name: impl Into<String>, version: impl Into<String>, entry: JsonMap) {
        self.packages
            .entry(name.into())
            .or_default()
            .insert(version.into(), entry);
    }

    /// Parse from bytes.
    ///
    /// # Errors
    /// Returns a validation error if the document is malformed.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Self::from_map(json::parse_object(bytes)?)
    }

    /// Parse from a JSON object.
    ///
    /// # Errors
    /// Returns a validation error if `packages` is not a name to version to
    /// object map.
    pub fn from_map(mut root: JsonMap) -> Result<Self> {
        let mut packages = IndexMap::new();
        let Some(value) = root.remove(PACKAGES_KEY) else {
            return Ok(Self { packages });
        };
        for (name, versions) in object_or_empty(value, PACKAGES_KEY)? {
            let mut entries = IndexMap::new();
            for (version, entry) in object_or_empty(versions, &name)? {
                let context = format!("{name}@{version}");
                entries.insert(version, object_or_empty(entry, &context)?);
            }
            packages.insert(name, entries);
        }
        Ok(Self { packages })
    }

    /// JSON form.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let packages: JsonMap = self
            .packages
            .iter()
            .map(|(name, versions)| {
                let versions: JsonMap = versions
                    .iter()
                    .map(|(version, entry)| (version.clone(), Value::Object(entry.clone())))
                    .collect();
                (name.clone(), Value::Object(versions))
            })
            .collect();
        let mut root = JsonMap::new();
        root.insert(PACKAGES_KEY.into(), Value::Object(packages));
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

/// Composer 2 package document: name to ordered version list, possibly
/// minified.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackageDocument {
    /// Version lists keyed by package name.
    pub packages: IndexMap<String, Vec<JsonMap>>,
    /// Whether the version lists are diff-encoded.
    pub minified: bool,
}

impl PackageDocument {
    /// Whether the document holds no version entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.values().all(Vec::is_empty)
    }

    /// Number of version entries.
    #[must_use]
    pub fn version_count(&self) -> usize {
        self.packages.values().map(Vec::len).sum()
    }

    /// Parse from bytes.
    ///
    /// # Errors
    /// Returns a validation error if the document is malformed.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Self::from_map(json::parse_object(bytes)?)
    }

    /// Parse from a JSON object. Non-object list items are skipped.
    ///
    /// # Errors
    /// Returns a validation error if `packages` is not a name to list map.
    pub fn from_map(mut root: JsonMap) -> Result<Self> {
        let minified = root
            .get(MINIFIED_KEY)
            .and_then(Value::as_str)
            .is_some_and(|format| format == MINIFIED_V2);
        let mut packages = IndexMap::new();
        if let Some(value) = root.remove(PACKAGES_KEY) {
            for (name, versions) in object_or_empty(value, PACKAGES_KEY)? {
                let Value::Array(items) = versions else {
                    return Err(IndexError::validation(format!(
                        "versions of '{name}' must be an array, found {}",
                        kind_of(&versions)
                    )));
                };
                let entries = items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::Object(entry) => Some(entry),
                        _ => None,
                    })
                    .collect();
                packages.insert(name, entries);
            }
        }
        Ok(Self { packages, minified })
    }

    /// JSON form.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let packages: JsonMap = self
            .packages
            .iter()
            .map(|(name, versions)| {
                let list = versions.iter().cloned().map(Value::Object).collect();
                (name.clone(), Value::Array(list))
            })
            .collect();
        let mut root = JsonMap::new();
        root.insert(PACKAGES_KEY.into(), Value::Object(packages));
        if self.minified {
            root.insert(MINIFIED_KEY.into(), Value::from(MINIFIED_V2));
        }
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

/// Accept an object, or the empty array PHP emits for an empty map.
fn object_or_empty(value: Value, context: &str) -> Result<JsonMap> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Array(items) if items.is_empty() => Ok(JsonMap::new()),
        other => Err(IndexError::validation(format!(
            "'{context}' must be an object, found {}",
            kind_of(&other)
        ))),
    }
}

fn parse_digests(value: Value, context: &str) -> Result<IndexMap<String, Option<String>>> {
    object_or_empty(value, context)?
        .into_iter()
        .map(|(name, digest)| {
            let digest = match digest {
                Value::Object(mut map) => match map.remove(SHA256_KEY) {
                    Some(Value::String(sha)) => Some(sha),
                    _ => None,
                },
                _ => None,
            };
            Ok((name, digest))
        })
        .collect()
}

fn digests_to_value(digests: &IndexMap<String, Option<String>>) -> Value {
    let map: JsonMap = digests
        .iter()
        .map(|(name, digest)| {
            let mut entry = JsonMap::new();
            entry.insert(SHA256_KEY.into(), digest.clone().into());
            (name.clone(), Value::Object(entry))
        })
        .collect();
    Value::Object(map)
}

fn take_string(root: &mut JsonMap, key: &str) -> Result<Option<String>> {
    match root.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(IndexError::validation(format!(
            "'{key}' must be a string, found {}",
            kind_of(&other)
        ))),
    }
}

fn take_strings(root: &mut JsonMap, key: &str) -> Result<Option<Vec<String>>> {
    match root.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                other => Err(IndexError::validation(format!(
                    "'{key}' must hold strings, found {}",
                    kind_of(&other)
                ))),
            })
            .collect::<Result<Vec<_>>>()
            .map(Some),
        Some(other) => Err(IndexError::validation(format!(
            "'{key}' must be an array, found {}",
            kind_of(&other)
        ))),
    }
}
