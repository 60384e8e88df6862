//! Document synthesis for hosted repositories.

use crate::document::{
    DistInfo, PackageDocument, PackageVersion, PackagesDocument, ProviderDocument, SourceInfo,
};
use crate::error::Result;
use crate::minify::minify_document;
use crate::store::{AssetKind, BlobStore, Component, HashAlgorithm, ZipMetadataExtractor};
use indexmap::IndexMap;
use overture_core::path::{metadata_url, providers_url};
use overture_core::{PackageName, format_utc};
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Largest repository that still lists `available-packages`.
pub const DEFAULT_MAX_AVAILABLE_PACKAGES: usize = 100;

/// Build a `packages.json` with one null-digest provider per distinct name.
#[must_use]
pub fn build_packages_document<'a>(
    names: impl IntoIterator<Item = &'a PackageName>,
    providers_url_template: &str,
) -> PackagesDocument {
    let names: BTreeSet<&PackageName> = names.into_iter().collect();
    let mut doc = PackagesDocument::new(providers_url_template);
    doc.providers = Some(
        names
            .into_iter()
            .map(|name| (name.full_name(), None))
            .collect(),
    );
    doc
}

/// Result of a build: the document plus what happened to each component.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildReport<T> {
    /// Built document.
    pub document: T,
    /// Components offered to the build.
    pub components: usize,
    /// Components that produced an entry.
    pub built: usize,
    /// Components skipped because their metadata could not be assembled.
    pub skipped: usize,
    /// Components without a zipball whose blob still exists.
    pub unavailable: usize,
}

impl<T> BuildReport<T> {
    /// Whether nothing was built and at least one component failed to
    /// assemble.
    #[must_use]
    pub const fn all_failed(&self) -> bool {
        self.built == 0 && self.skipped > 0
    }

    /// Whether no component has a retrievable zipball, including the case of
    /// no components at all.
    #[must_use]
    pub const fn none_available(&self) -> bool {
        self.built == 0 && self.skipped == 0
    }

    fn map<U>(self, f: impl FnOnce(T) -> U) -> BuildReport<U> {
        BuildReport {
            document: f(self.document),
            components: self.components,
            built: self.built,
            skipped: self.skipped,
            unavailable: self.unavailable,
        }
    }
}

/// Composer 2 documents of one package, split by stability.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackageDocuments {
    /// Tagged releases (`p2/vendor/project.json`).
    pub stable: PackageDocument,
    /// Development branches (`p2/vendor/project~dev.json`).
    pub dev: PackageDocument,
}

/// Every per-package document of a hosted repository.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostedDocuments {
    /// Composer 1 provider document.
    pub provider: ProviderDocument,
    /// Composer 2 documents.
    pub packages: PackageDocuments,
}

/// Builds index documents from stored components.
pub struct IndexBuilder {
    base_url: String,
    blobs: Arc<dyn BlobStore>,
    extractor: Arc<dyn ZipMetadataExtractor>,
    serve_v2: bool,
    max_available_packages: usize,
}

impl fmt::Debug for IndexBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexBuilder")
            .field("base_url", &self.base_url)
            .field("serve_v2", &self.serve_v2)
            .field("max_available_packages", &self.max_available_packages)
            .finish_non_exhaustive()
    }
}

impl IndexBuilder {
    /// Create a builder whose dist URLs point at `base_url`.
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        blobs: Arc<dyn BlobStore>,
        extractor: Arc<dyn ZipMetadataExtractor>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            blobs,
            extractor,
            serve_v2: true,
            max_available_packages: DEFAULT_MAX_AVAILABLE_PACKAGES,
        }
    }

    /// Advertise `metadata-url` in `packages.json`.
    #[must_use]
    pub const fn with_serve_v2(mut self, serve_v2: bool) -> Self {
        self.serve_v2 = serve_v2;
        self
    }

    /// Set the `available-packages` size limit.
    #[must_use]
    pub const fn with_max_available_packages(mut self, max: usize) -> Self {
        self.max_available_packages = max;
        self
    }

    /// Base URL of the repository.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Root `packages.json` of the hosted repository.
    #[must_use]
    pub fn packages_document(&self, names: &BTreeSet<PackageName>) -> PackagesDocument {
        let mut doc = build_packages_document(names, &providers_url(&self.base_url));
        if self.serve_v2 {
            doc.metadata_url = Some(metadata_url(&self.base_url));
        }
        if !names.is_empty() && names.len() <= self.max_available_packages {
            doc.available_packages = Some(names.iter().map(PackageName::full_name).collect());
        }
        doc
    }

    /// Build the provider document of a component set. Components whose
    /// metadata cannot be assembled, or that have no retrievable zipball, are
    /// skipped.
    #[must_use]
    pub fn build_provider_document(&self, components: &[Component]) -> BuildReport<ProviderDocument> {
        self.assemble(components).map(|versions| provider_document(&versions))
    }

    /// Build the stable and dev Composer 2 documents, each minified.
    ///
    /// # Errors
    /// Returns a validation error if metadata cannot be minified.
    pub fn build_package_documents(
        &self,
        components: &[Component],
    ) -> Result<BuildReport<PackageDocuments>> {
        let report = self.assemble(components);
        let documents = package_documents(&report.document)?;
        Ok(report.map(|_| documents))
    }

    /// Build every per-package document from a single extraction pass.
    ///
    /// # Errors
    /// Returns a validation error if metadata cannot be minified.
    pub fn build_documents(&self, components: &[Component]) -> Result<BuildReport<HostedDocuments>> {
        let report = self.assemble(components);
        let documents = HostedDocuments {
            provider: provider_document(&report.document),
            packages: package_documents(&report.document)?,
        };
        Ok(report.map(|_| documents))
    }

    fn assemble(&self, components: &[Component]) -> BuildReport<Vec<PackageVersion>> {
        let results: Vec<_> = components
            .par_iter()
            .map(|component| (component, self.assemble_one(component)))
            .collect();

        let mut versions = Vec::with_capacity(results.len());
        let mut skipped = 0;
        let mut unavailable = 0;
        for (component, result) in results {
            match result {
                Ok(Some(version)) => versions.push(version),
                Ok(None) => {
                    unavailable += 1;
                    debug!(
                        vendor = %component.vendor,
                        project = %component.project,
                        version = %component.version,
                        "no retrievable zipball"
                    );
                }
                Err(e) => {
                    skipped += 1;
                    warn!(
                        vendor = %component.vendor,
                        project = %component.project,
                        version = %component.version,
                        error = %e,
                        "skipping component"
                    );
                }
            }
        }
        debug!(
            components = components.len(),
            built = versions.len(),
            skipped,
            unavailable,
            "assembled version entries"
        );

        BuildReport {
            components: components.len(),
            built: versions.len(),
            skipped,
            unavailable,
            document: versions,
        }
    }

    /// Entry of the first zipball asset whose blob can be read. `None` when
    /// every zipball blob is gone; an error when a read failed and no other
    /// asset could stand in.
    fn assemble_one(&self, component: &Component) -> Result<Option<PackageVersion>> {
        let name = component.name();
        let mut read_error = None;
        for asset in &component.assets {
            if asset.kind != AssetKind::Zipball {
                continue;
            }
            let Some(blob) = &asset.blob else {
                continue;
            };
            let data = match self.blobs.read(blob) {
                Ok(Some(data)) => data,
                Ok(None) => {
                    debug!(package = %name, blob = %blob, "blob not retrievable");
                    continue;
                }
                Err(e) => {
                    warn!(package = %name, blob = %blob, error = %e, "blob read failed");
                    read_error = Some(e);
                    continue;
                }
            };

            let metadata = self.extractor.extract(&data)?;
            let sha1 = match self.blobs.checksum(blob, HashAlgorithm::Sha1)? {
                Some(sha1) => sha1,
                None => HashAlgorithm::Sha1.hex_digest(&data),
            };
            let source = SourceInfo::from_attributes(
                asset.attributes.source_type.as_deref(),
                asset.attributes.source_url.as_deref(),
                asset.attributes.source_reference.as_deref(),
            );
            let dist = DistInfo::zip(
                &self.base_url,
                &name,
                &component.version,
                Some(sha1.clone()),
                Some(sha1),
            );
            return Ok(Some(PackageVersion::new(
                name,
                component.version.clone(),
                dist,
                source,
                format_utc(component.last_updated),
                &metadata,
            )));
        }

        read_error.map_or(Ok(None), Err)
    }
}

fn provider_document(versions: &[PackageVersion]) -> ProviderDocument {
    let mut doc = ProviderDocument::default();
    for version in versions {
        doc.insert(version.name.full_name(), version.version.clone(), version.to_entry());
    }
    doc
}

fn package_documents(versions: &[PackageVersion]) -> Result<PackageDocuments> {
    let mut stable: IndexMap<String, Vec<_>> = IndexMap::new();
    let mut dev: IndexMap<String, Vec<_>> = IndexMap::new();
    for version in versions {
        let target = if version.is_dev() { &mut dev } else { &mut stable };
        target
            .entry(version.name.full_name())
            .or_default()
            .push(version.to_entry());
    }
    let minified = |packages| {
        minify_document(PackageDocument {
            packages,
            minified: false,
        })
    };
    Ok(PackageDocuments {
        stable: minified(stable)?,
        dev: minified(dev)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IndexError;
    use crate::minify::expand_document;
    use crate::store::{Asset, BlobRef, MemoryStore, SourceAttributes};
    use bytes::Bytes;
    use chrono::{TimeZone, Utc};
    use overture_core::json::{JsonMap, parse_object};

    fn json_extractor() -> Arc<dyn ZipMetadataExtractor> {
        Arc::new(|data: &[u8]| -> Result<JsonMap> { Ok(parse_object(data)?) })
    }

    fn component(store: &MemoryStore, version: &str, metadata: &str) -> Component {
        let name = PackageName::new("acme", "widgets");
        let blob = store.put_blob(format!("blob-{version}"), metadata.as_bytes().to_vec());
        Component {
            vendor: "acme".into(),
            project: "widgets".into(),
            version: version.into(),
            last_updated: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            assets: vec![Asset::zipball(&name, version, blob)],
        }
    }

    fn builder(store: Arc<MemoryStore>) -> IndexBuilder {
        IndexBuilder::new("http://host/repository/php", store, json_extractor())
    }

    #[test]
    fn packages_document_scenario() {
        let names = [PackageName::new("acme", "widgets")];
        let doc = build_packages_document(&names, "http://host/p/%package%.json");
        assert_eq!(
            String::from_utf8(doc.to_bytes().unwrap()).unwrap(),
            r#"{"providers-url":"http://host/p/%package%.json","providers":{"acme/widgets":{"sha256":null}}}"#
        );
    }

    #[test]
    fn packages_document_dedupes_and_sorts() {
        let names = [
            PackageName::new("b", "x"),
            PackageName::new("a", "y"),
            PackageName::new("b", "x"),
        ];
        let doc = build_packages_document(&names, "/p/%package%.json");
        assert_eq!(doc.names().collect::<Vec<_>>(), vec!["a/y", "b/x"]);
    }

    #[test]
    fn hosted_packages_document_lists_small_repositories() {
        let store = Arc::new(MemoryStore::new());
        let names: BTreeSet<_> = [PackageName::new("acme", "widgets")].into_iter().collect();

        let doc = builder(store.clone()).packages_document(&names);
        assert_eq!(
            doc.metadata_url.as_deref(),
            Some("http://host/repository/php/p2/%package%.json")
        );
        assert_eq!(doc.available_packages, Some(vec!["acme/widgets".to_string()]));

        let doc = builder(store)
            .with_serve_v2(false)
            .with_max_available_packages(0)
            .packages_document(&names);
        assert!(doc.metadata_url.is_none());
        assert!(doc.available_packages.is_none());
    }

    #[test]
    fn provider_document_entries() {
        let store = Arc::new(MemoryStore::new());
        let meta = r#"{"name":"acme/widgets","description":"Widgets","require":{"php":">=8.1"}}"#;
        let mut c = component(&store, "1.0.0", meta);
        c.assets[0] = c.assets[0].clone().with_attributes(SourceAttributes {
            source_type: Some("git".into()),
            source_url: Some("https://git.example/acme/widgets.git".into()),
            source_reference: Some("v1.0.0".into()),
        });

        let report = builder(store).build_provider_document(&[c]);
        assert_eq!((report.built, report.skipped), (1, 0));
        let entry = report.document.entry("acme/widgets", "1.0.0").unwrap();
        let sha1 = HashAlgorithm::Sha1.hex_digest(meta.as_bytes());
        assert_eq!(
            entry["dist"]["url"],
            "http://host/repository/php/acme/widgets/1.0.0/acme-widgets-1.0.0.zip"
        );
        assert_eq!(entry["dist"]["reference"], sha1.as_str());
        assert_eq!(entry["dist"]["shasum"], sha1.as_str());
        assert_eq!(entry["source"]["reference"], "v1.0.0");
        assert_eq!(entry["time"], "2024-05-01T12:00:00+00:00");
        assert_eq!(entry["description"], "Widgets");
        assert!(entry.get("name").is_some());
    }

    #[test]
    fn build_is_deterministic() {
        let store = Arc::new(MemoryStore::new());
        let components = vec![
            component(&store, "2.0.0", r#"{"license":"MIT"}"#),
            component(&store, "1.0.0", r#"{"license":"MIT"}"#),
            component(&store, "dev-main", r#"{"license":"MIT"}"#),
        ];
        let b = builder(store);
        let first = b.build_provider_document(&components).document.to_bytes().unwrap();
        let second = b.build_provider_document(&components).document.to_bytes().unwrap();
        assert_eq!(first, second);
        let versions: Vec<_> = b.build_provider_document(&components).document.packages
            ["acme/widgets"]
            .keys()
            .cloned()
            .collect();
        assert_eq!(versions, vec!["2.0.0", "1.0.0", "dev-main"]);
    }

    #[test]
    fn unextractable_components_are_skipped() {
        let store = Arc::new(MemoryStore::new());
        let good = component(&store, "1.0.0", r#"{"license":"MIT"}"#);
        let broken = component(&store, "1.1.0", "not json");
        let missing = component(&store, "1.2.0", "{}");
        store.remove_blob(missing.assets[0].blob.as_ref().unwrap());

        let report = builder(store).build_provider_document(&[good, broken, missing]);
        assert_eq!(report.built, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.unavailable, 1);
        assert!(!report.all_failed());
        assert!(!report.none_available());
        assert_eq!(report.document.version_count(), 1);
    }

    #[test]
    fn first_retrievable_asset_is_used() {
        let store = Arc::new(MemoryStore::new());
        let mut c = component(&store, "1.0.0", r#"{"description":"second"}"#);
        let name = c.name();
        let gone = store.put_blob("gone", b"{}".to_vec());
        store.remove_blob(&gone);
        c.assets.insert(0, Asset::zipball(&name, "1.0.0", gone));

        let report = builder(store).build_provider_document(&[c]);
        let entry = report.document.entry("acme/widgets", "1.0.0").unwrap();
        assert_eq!(entry["description"], "second");
    }

    /// Fails reads of one blob, delegating everything else.
    struct FlakyBlobs {
        inner: Arc<MemoryStore>,
        failing: BlobRef,
    }

    impl BlobStore for FlakyBlobs {
        fn read(&self, blob: &BlobRef) -> Result<Option<Bytes>> {
            if *blob == self.failing {
                return Err(IndexError::store("disk error"));
            }
            self.inner.read(blob)
        }

        fn checksum(&self, blob: &BlobRef, algorithm: HashAlgorithm) -> Result<Option<String>> {
            self.inner.checksum(blob, algorithm)
        }
    }

    #[test]
    fn read_error_falls_through_to_next_asset() {
        let store = Arc::new(MemoryStore::new());
        let mut c = component(&store, "1.0.0", r#"{"description":"second"}"#);
        let name = c.name();
        let broken = store.put_blob("broken", b"{}".to_vec());
        c.assets.insert(0, Asset::zipball(&name, "1.0.0", broken.clone()));

        let blobs = Arc::new(FlakyBlobs {
            inner: store.clone(),
            failing: broken.clone(),
        });
        let b = IndexBuilder::new("http://host/repository/php", blobs, json_extractor());
        let report = b.build_provider_document(&[c.clone()]);
        assert_eq!(report.built, 1);
        let entry = report.document.entry("acme/widgets", "1.0.0").unwrap();
        assert_eq!(entry["description"], "second");

        // With no other asset to fall back on, the read error fails the component.
        c.assets.truncate(1);
        let report = b.build_provider_document(&[c]);
        assert!(report.all_failed());
        assert!(!report.none_available());
    }

    #[test]
    fn blobless_components_are_unavailable_not_failed() {
        let store = Arc::new(MemoryStore::new());
        let c = component(&store, "1.0.0", "{}");
        store.remove_blob(c.assets[0].blob.as_ref().unwrap());
        let mut no_zip = component(&store, "1.1.0", "{}");
        no_zip.assets.clear();

        let report = builder(store).build_provider_document(&[c, no_zip]);
        assert_eq!(report.unavailable, 2);
        assert!(report.none_available());
        assert!(!report.all_failed());
        assert!(report.document.is_empty());
    }

    #[test]
    fn all_failed_is_reported() {
        let store = Arc::new(MemoryStore::new());
        let broken = component(&store, "1.0.0", "not json");
        let report = builder(store).build_provider_document(&[broken]);
        assert!(report.all_failed());
        assert!(report.document.is_empty());
    }

    #[test]
    fn package_documents_split_by_stability() {
        let store = Arc::new(MemoryStore::new());
        let components = vec![
            component(&store, "2.0.0", r#"{"license":"MIT"}"#),
            component(&store, "1.0.0", r#"{"license":"MIT"}"#),
            component(&store, "2.x-dev", r#"{"license":"MIT"}"#),
        ];
        let report = builder(store).build_package_documents(&components).unwrap();
        let PackageDocuments { stable, dev } = report.document;
        assert!(stable.minified);
        assert!(dev.minified);
        assert_eq!(stable.packages["acme/widgets"].len(), 2);
        assert_eq!(dev.packages["acme/widgets"].len(), 1);

        let second = &stable.packages["acme/widgets"][1];
        assert!(second.get("license").is_none());
        assert_eq!(second["version"], "1.0.0");

        let expanded = expand_document(stable).unwrap();
        assert_eq!(expanded.packages["acme/widgets"][1]["license"], "MIT");
    }

    #[test]
    fn empty_partition_has_no_packages() {
        let store = Arc::new(MemoryStore::new());
        let components = vec![component(&store, "1.0.0", "{}")];
        let report = builder(store).build_documents(&components).unwrap();
        assert!(report.document.packages.dev.is_empty());
        assert!(!report.document.packages.stable.is_empty());
        assert!(!report.document.provider.is_empty());
    }
}
