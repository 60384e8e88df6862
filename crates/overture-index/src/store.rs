//! Collaborator interfaces the engine reads package data through.
//!
//! The engine never touches storage itself: components, blobs and archive
//! metadata are handed in through these traits. [`MemoryStore`] is a complete
//! in-process implementation for single-node use and tests.

use crate::error::{IndexError, Result};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use overture_core::PackageName;
use overture_core::json::JsonMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use md5::Md5;
use sha1::{Digest, Sha1};
use sha2::Sha256;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// Kind of a stored asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    /// Package archive.
    Zipball,
    /// Root `packages.json`.
    Packages,
    /// `packages/list.json`.
    List,
    /// Composer 1 provider document.
    Provider,
    /// Composer 2 package document.
    Package,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zipball => write!(f, "zipball"),
            Self::Packages => write!(f, "packages"),
            Self::List => write!(f, "list"),
            Self::Provider => write!(f, "provider"),
            Self::Package => write!(f, "package"),
        }
    }
}

/// Checksum algorithm of a stored blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-1, used for dist `shasum`.
    Sha1,
    /// SHA-256.
    Sha256,
    /// MD5.
    Md5,
}

impl HashAlgorithm {
    /// Lowercase hex digest of `data`.
    #[must_use]
    pub fn hex_digest(self, data: &[u8]) -> String {
        match self {
            Self::Sha1 => hex::encode(Sha1::digest(data)),
            Self::Sha256 => hex::encode(Sha256::digest(data)),
            Self::Md5 => hex::encode(Md5::digest(data)),
        }
    }
}

/// Opaque reference to a stored blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlobRef(String);

impl BlobRef {
    /// Wrap an identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Upload provenance recorded on an asset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceAttributes {
    /// VCS type.
    pub source_type: Option<String>,
    /// Repository URL.
    pub source_url: Option<String>,
    /// Commit, branch or tag.
    pub source_reference: Option<String>,
}

/// A stored asset of a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Logical path.
    pub path: String,
    /// Asset kind.
    pub kind: AssetKind,
    /// Backing blob, if content was stored.
    pub blob: Option<BlobRef>,
    /// When the backing blob last changed.
    pub blob_updated: Option<DateTime<Utc>>,
    /// Upload provenance.
    pub attributes: SourceAttributes,
}

impl Asset {
    /// Zipball asset at the canonical path for a version.
    #[must_use]
    pub fn zipball(name: &PackageName, version: &str, blob: BlobRef) -> Self {
        Self {
            path: overture_core::path::zipball_path(name.vendor(), name.project(), version),
            kind: AssetKind::Zipball,
            blob: Some(blob),
            blob_updated: None,
            attributes: SourceAttributes::default(),
        }
    }

    /// Attach upload provenance.
    #[must_use]
    pub fn with_attributes(mut self, attributes: SourceAttributes) -> Self {
        self.attributes = attributes;
        self
    }
}

/// A stored package version with its assets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    /// Vendor (namespace).
    pub vendor: String,
    /// Project (name).
    pub project: String,
    /// Version string.
    pub version: String,
    /// Last modification time.
    pub last_updated: DateTime<Utc>,
    /// Stored assets.
    pub assets: Vec<Asset>,
}

impl Component {
    /// Package name of this component.
    #[must_use]
    pub fn name(&self) -> PackageName {
        PackageName::new(&self.vendor, &self.project)
    }
}

/// Read access to stored components.
pub trait ComponentStore: Send + Sync {
    /// Components of one package, in store order.
    ///
    /// # Errors
    /// Returns a store error if the query fails.
    fn components(&self, name: &PackageName) -> Result<Vec<Component>>;

    /// Distinct package names.
    ///
    /// # Errors
    /// Returns a store error if the query fails.
    fn package_names(&self) -> Result<BTreeSet<PackageName>>;
}

/// Blob resolution and checksum lookup.
pub trait BlobStore: Send + Sync {
    /// Blob content, `None` if the blob is gone.
    ///
    /// # Errors
    /// Returns a store error if the read fails.
    fn read(&self, blob: &BlobRef) -> Result<Option<Bytes>>;

    /// Recorded checksum, `None` if not recorded.
    ///
    /// # Errors
    /// Returns a store error if the lookup fails.
    fn checksum(&self, blob: &BlobRef, algorithm: HashAlgorithm) -> Result<Option<String>>;
}

/// Extracts the flat `composer.json` map from a package archive.
pub trait ZipMetadataExtractor: Send + Sync {
    /// Extract metadata.
    ///
    /// # Errors
    /// Returns an extraction error if the archive holds no usable metadata.
    fn extract(&self, archive: &[u8]) -> Result<JsonMap>;
}

impl<F> ZipMetadataExtractor for F
where
    F: Fn(&[u8]) -> Result<JsonMap> + Send + Sync,
{
    fn extract(&self, archive: &[u8]) -> Result<JsonMap> {
        self(archive)
    }
}

#[derive(Debug, Default)]
struct StoredBlob {
    data: Bytes,
    sha1: String,
}

/// In-process component and blob store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    components: RwLock<BTreeMap<PackageName, Vec<Component>>>,
    blobs: RwLock<HashMap<BlobRef, StoredBlob>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store blob content under `id`, recording its SHA-1.
    pub fn put_blob(&self, id: impl Into<String>, data: impl Into<Bytes>) -> BlobRef {
        let blob = BlobRef::new(id);
        let data = data.into();
        let sha1 = HashAlgorithm::Sha1.hex_digest(&data);
        self.blobs
            .write()
            .insert(blob.clone(), StoredBlob { data, sha1 });
        blob
    }

    /// Remove a blob's content.
    pub fn remove_blob(&self, blob: &BlobRef) -> bool {
        self.blobs.write().remove(blob).is_some()
    }

    /// Insert or replace a component (matched by name and version).
    pub fn put_component(&self, component: Component) {
        let mut components = self.components.write();
        let versions = components.entry(component.name()).or_default();
        match versions.iter_mut().find(|c| c.version == component.version) {
            Some(existing) => *existing = component,
            None => versions.push(component),
        }
    }

    /// Remove a component, returning it if present.
    pub fn remove_component(&self, name: &PackageName, version: &str) -> Option<Component> {
        let mut components = self.components.write();
        let versions = components.get_mut(name)?;
        let index = versions.iter().position(|c| c.version == version)?;
        let removed = versions.remove(index);
        if versions.is_empty() {
            components.remove(name);
        }
        Some(removed)
    }
}

impl ComponentStore for MemoryStore {
    fn components(&self, name: &PackageName) -> Result<Vec<Component>> {
        Ok(self
            .components
            .read()
            .get(name)
            .cloned()
            .unwrap_or_default())
    }

    fn package_names(&self) -> Result<BTreeSet<PackageName>> {
        Ok(self.components.read().keys().cloned().collect())
    }
}

impl BlobStore for MemoryStore {
    fn read(&self, blob: &BlobRef) -> Result<Option<Bytes>> {
        Ok(self.blobs.read().get(blob).map(|b| b.data.clone()))
    }

    fn checksum(&self, blob: &BlobRef, algorithm: HashAlgorithm) -> Result<Option<String>> {
        let blobs = self.blobs.read();
        let Some(stored) = blobs.get(blob) else {
            return Err(IndexError::store(format!("unknown blob '{blob}'")));
        };
        Ok(Some(match algorithm {
            HashAlgorithm::Sha1 => stored.sha1.clone(),
            other => other.hex_digest(&stored.data),
        }))
    }
}
