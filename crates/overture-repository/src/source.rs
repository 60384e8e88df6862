//! Where a repository's documents come from.
//!
//! Routing code asks a [`DocumentSource`] for documents without knowing the
//! repository topology:
//!
//! - [`HostedSource`] derives documents from locally stored components and
//!   serves the per-package ones from the document cache.
//! - [`ProxySource`] fetches upstream documents and rewrites them.
//! - [`GroupSource`] merges its members' documents in priority order.
//!
//! `Ok(None)` means "not found"; errors are reserved for real failures.

use crate::controller::RebuildHandler;
use crate::error::{RepositoryError, Result};
use bytes::Bytes;
use chrono::Utc;
use overture_core::{PackageName, provider_digest};
use overture_core::path::{LIST_PATH, PACKAGES_PATH, expand_template, package_path, provider_path};
use overture_index::{
    IndexError, IndexMerger, IndexRewriter, ListDocument, MergeInput, PackageDocument,
    PackagesDocument, ProviderDocument, RepositoryPriority, RepositoryType, build_list_document,
    get_dist_url, get_dist_url_from_package,
};
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// Read access to a repository's index documents.
pub trait DocumentSource: Send + Sync {
    /// Topology of the repository.
    fn repository_type(&self) -> RepositoryType;

    /// Root `packages.json`.
    ///
    /// # Errors
    /// Returns error if the document cannot be produced.
    fn packages(&self) -> Result<Option<PackagesDocument>>;

    /// `packages/list.json`, optionally filtered by a `vendor/project`
    /// wildcard pattern.
    ///
    /// # Errors
    /// Returns error if the document cannot be produced.
    fn list(&self, filter: Option<&str>) -> Result<Option<ListDocument>>;

    /// Composer 1 provider document of `name`.
    ///
    /// # Errors
    /// Returns error if the document cannot be produced.
    fn provider(&self, name: &PackageName) -> Result<Option<ProviderDocument>>;

    /// Composer 2 document of `name`, stable or dev partition.
    ///
    /// # Errors
    /// Returns error if the document cannot be produced.
    fn package(&self, name: &PackageName, dev: bool) -> Result<Option<PackageDocument>>;
}

/// Hosted repository documents.
#[derive(Debug)]
pub struct HostedSource {
    handler: Arc<RebuildHandler>,
}

impl HostedSource {
    /// Serve documents through `handler`, the same handler the invalidation
    /// worker uses.
    #[must_use]
    pub const fn new(handler: Arc<RebuildHandler>) -> Self {
        Self { handler }
    }

    fn names(&self) -> Result<BTreeSet<PackageName>> {
        Ok(self.handler.components().package_names()?)
    }

    fn cached(&self, path: &str, name: &PackageName) -> Result<Option<Bytes>> {
        let cache = self.handler.cache();
        if let Some(content) = cache.get(path)? {
            debug!(path, "document cache hit");
            return Ok(Some(content));
        }
        debug!(path, "document cache miss, rebuilding");
        self.handler.rebuild(name);
        cache.get(path)
    }
}

impl DocumentSource for HostedSource {
    fn repository_type(&self) -> RepositoryType {
        RepositoryType::Hosted
    }

    fn packages(&self) -> Result<Option<PackagesDocument>> {
        let names = self.names()?;
        Ok(Some(self.handler.builder().packages_document(&names)))
    }

    fn list(&self, filter: Option<&str>) -> Result<Option<ListDocument>> {
        let names = self.names()?;
        Ok(Some(build_list_document(&names, filter)))
    }

    fn provider(&self, name: &PackageName) -> Result<Option<ProviderDocument>> {
        self.cached(&provider_path(name), name)?
            .map(|content| ProviderDocument::from_slice(&content))
            .transpose()
            .map_err(RepositoryError::from)
    }

    fn package(&self, name: &PackageName, dev: bool) -> Result<Option<PackageDocument>> {
        self.cached(&package_path(name, dev), name)?
            .map(|content| PackageDocument::from_slice(&content))
            .transpose()
            .map_err(RepositoryError::from)
    }
}

/// Retrieves raw upstream documents for a proxy.
pub trait UpstreamFetcher: Send + Sync {
    /// Fetch `location`: an absolute URL, a path relative to the upstream
    /// repository (`packages.json`), or a host-relative path from a URL
    /// template (`/p/acme/widgets.json`). `None` when upstream has nothing there.
    ///
    /// # Errors
    /// Returns an upstream error if the fetch fails.
    fn fetch(&self, location: &str) -> Result<Option<Bytes>>;
}

impl<F> UpstreamFetcher for F
where
    F: Fn(&str) -> Result<Option<Bytes>> + Send + Sync,
{
    fn fetch(&self, location: &str) -> Result<Option<Bytes>> {
        self(location)
    }
}

/// Resolve an [`UpstreamFetcher`] location against the upstream repository URL.
///
/// # Errors
/// Returns an upstream error if the location cannot be resolved.
pub fn resolve_upstream(upstream: &Url, location: &str) -> Result<Url> {
    let mut base = upstream.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(location)
        .map_err(|e| RepositoryError::upstream(location, e.to_string()))
}

/// Proxy repository documents.
pub struct ProxySource {
    fetcher: Arc<dyn UpstreamFetcher>,
    rewriter: IndexRewriter,
    root: RwLock<Option<Arc<PackagesDocument>>>,
}

impl fmt::Debug for ProxySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxySource")
            .field("rewriter", &self.rewriter)
            .finish_non_exhaustive()
    }
}

impl ProxySource {
    /// Proxy `fetcher`'s upstream, rewriting documents with `rewriter`.
    #[must_use]
    pub fn new(fetcher: Arc<dyn UpstreamFetcher>, rewriter: IndexRewriter) -> Self {
        Self {
            fetcher,
            rewriter,
            root: RwLock::new(None),
        }
    }

    /// Forget the remembered upstream `packages.json`.
    pub fn refresh(&self) {
        *self.root.write() = None;
    }

    /// Upstream zipball URL of `name` at `version`.
    ///
    /// Tries the stable Composer 2 document, then the dev one, then the
    /// Composer 1 provider document.
    ///
    /// # Errors
    /// Returns a not-found error when no upstream document knows the version.
    pub fn dist_url(&self, name: &PackageName, version: &str) -> Result<String> {
        for dev in [false, true] {
            if let Some(doc) = self.upstream_package(name, dev)?
                && let Some(url) = found(get_dist_url_from_package(name, version, &doc))?
            {
                return Ok(url);
            }
        }
        if let Some(doc) = self.upstream_provider(name)?
            && let Some(url) = found(get_dist_url(name, version, &doc))?
        {
            return Ok(url);
        }
        Err(IndexError::VersionNotFound {
            name: name.full_name(),
            version: version.to_string(),
        }
        .into())
    }

    fn upstream_root(&self) -> Result<Option<Arc<PackagesDocument>>> {
        if let Some(root) = self.root.read().clone() {
            return Ok(Some(root));
        }
        let Some(content) = self.fetcher.fetch(PACKAGES_PATH)? else {
            return Ok(None);
        };
        let mut root = PackagesDocument::from_slice(&content)?;
        for (include, digest) in root.provider_include_urls() {
            match self.fetcher.fetch(&include)? {
                Some(content) => {
                    verify_digest(&include, digest.as_deref(), &content)?;
                    let added = root.fold_provider_include(&content)?;
                    debug!(include, added, "folded provider include");
                }
                None => warn!(include, "upstream provider include missing"),
            }
        }
        let root = Arc::new(root);
        *self.root.write() = Some(Arc::clone(&root));
        Ok(Some(root))
    }

    fn upstream_provider(&self, name: &PackageName) -> Result<Option<ProviderDocument>> {
        let full_name = name.full_name();
        let root = self.upstream_root()?;
        let (location, digest) = match root.as_deref() {
            Some(root) => (
                root.provider_url(&full_name),
                root.provider_digest(&full_name),
            ),
            None => (None, None),
        };
        let location = location.unwrap_or_else(|| provider_path(name));
        let Some(content) = self.fetcher.fetch(&location)? else {
            return Ok(None);
        };
        verify_digest(&location, digest, &content)?;
        Ok(Some(ProviderDocument::from_slice(&content)?))
    }

    fn upstream_package(&self, name: &PackageName, dev: bool) -> Result<Option<PackageDocument>> {
        let template = self
            .upstream_root()?
            .and_then(|root| root.metadata_url.clone());
        let location = match template {
            Some(template) => {
                let key = if dev {
                    format!("{name}~dev")
                } else {
                    name.full_name()
                };
                expand_template(&template, &key, None)
            }
            None => package_path(name, dev),
        };
        self.fetcher
            .fetch(&location)?
            .map(|content| PackageDocument::from_slice(&content))
            .transpose()
            .map_err(RepositoryError::from)
    }
}

/// Reject upstream content whose SHA-256 differs from the advertised digest.
fn verify_digest(location: &str, expected: Option<&str>, content: &[u8]) -> Result<()> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let actual = provider_digest(content);
    if actual.eq_ignore_ascii_case(expected) {
        return Ok(());
    }
    warn!(location, expected, actual = %actual, "upstream digest mismatch");
    Err(RepositoryError::upstream(
        location,
        format!("sha256 {actual} does not match advertised {expected}"),
    ))
}

fn found(result: overture_index::Result<String>) -> Result<Option<String>> {
    match result {
        Ok(url) => Ok(Some(url)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl DocumentSource for ProxySource {
    fn repository_type(&self) -> RepositoryType {
        RepositoryType::Proxy
    }

    fn packages(&self) -> Result<Option<PackagesDocument>> {
        Ok(self
            .upstream_root()?
            .map(|root| self.rewriter.rewrite_packages_document((*root).clone())))
    }

    fn list(&self, filter: Option<&str>) -> Result<Option<ListDocument>> {
        let Some(content) = self.fetcher.fetch(LIST_PATH)? else {
            return Ok(None);
        };
        let upstream = ListDocument::from_slice(&content)?;
        let names: Vec<PackageName> = upstream
            .package_names
            .iter()
            .filter_map(|name| PackageName::parse(name))
            .collect();
        Ok(Some(build_list_document(&names, filter)))
    }

    fn provider(&self, name: &PackageName) -> Result<Option<ProviderDocument>> {
        self.upstream_provider(name)?
            .map(|doc| self.rewriter.rewrite_provider_document(doc))
            .transpose()
            .map_err(RepositoryError::from)
    }

    fn package(&self, name: &PackageName, dev: bool) -> Result<Option<PackageDocument>> {
        self.upstream_package(name, dev)?
            .map(|doc| self.rewriter.rewrite_package_document(doc))
            .transpose()
            .map_err(RepositoryError::from)
    }
}

/// A member of a group repository.
#[derive(Clone)]
pub struct GroupMember {
    /// Member repository name.
    pub name: String,
    /// Merge precedence.
    pub priority: RepositoryPriority,
    /// Member documents.
    pub source: Arc<dyn DocumentSource>,
}

impl fmt::Debug for GroupMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupMember")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("type", &self.source.repository_type())
            .finish()
    }
}

impl GroupMember {
    /// Create a member.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        priority: RepositoryPriority,
        source: Arc<dyn DocumentSource>,
    ) -> Self {
        Self {
            name: name.into(),
            priority,
            source,
        }
    }
}

/// Group repository documents.
#[derive(Debug)]
pub struct GroupSource {
    members: Vec<GroupMember>,
    merger: IndexMerger,
}

impl GroupSource {
    /// Merge `members` (in declaration order within a priority) with `merger`.
    #[must_use]
    pub const fn new(members: Vec<GroupMember>, merger: IndexMerger) -> Self {
        Self { members, merger }
    }

    /// Members in declaration order.
    #[must_use]
    pub fn members(&self) -> &[GroupMember] {
        &self.members
    }

    /// Collect a document from every member. Failing members are skipped.
    fn collect<T>(
        &self,
        document: &str,
        fetch: impl Fn(&dyn DocumentSource) -> Result<Option<T>>,
    ) -> Vec<MergeInput<T>> {
        let mut inputs = Vec::with_capacity(self.members.len());
        for member in &self.members {
            match fetch(member.source.as_ref()) {
                Ok(Some(doc)) => inputs.push(MergeInput::new(member.priority, doc)),
                Ok(None) => debug!(member = %member.name, document, "member has no document"),
                Err(e) => warn!(member = %member.name, document, error = %e, "skipping failed member"),
            }
        }
        inputs
    }
}

impl DocumentSource for GroupSource {
    fn repository_type(&self) -> RepositoryType {
        RepositoryType::Group
    }

    fn packages(&self) -> Result<Option<PackagesDocument>> {
        let inputs = self.collect(PACKAGES_PATH, |source| source.packages());
        if inputs.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.merger.merge_packages_documents(inputs)))
    }

    fn list(&self, filter: Option<&str>) -> Result<Option<ListDocument>> {
        let inputs = self.collect(LIST_PATH, |source| source.list(filter));
        if inputs.is_empty() {
            return Ok(None);
        }
        let names: BTreeSet<PackageName> = inputs
            .iter()
            .flat_map(|input| &input.document.package_names)
            .filter_map(|name| PackageName::parse(name))
            .collect();
        Ok(Some(build_list_document(&names, filter)))
    }

    fn provider(&self, name: &PackageName) -> Result<Option<ProviderDocument>> {
        let inputs = self.collect(&provider_path(name), |source| source.provider(name));
        if inputs.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.merger.merge_provider_documents(inputs, Utc::now())))
    }

    fn package(&self, name: &PackageName, dev: bool) -> Result<Option<PackageDocument>> {
        let inputs = self.collect(&package_path(name, dev), |source| source.package(name, dev));
        if inputs.is_empty() {
            return Ok(None);
        }
        Ok(Some(
            self.merger.merge_package_documents(inputs, Utc::now())?,
        ))
    }
}
