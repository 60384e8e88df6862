//! Composer index document engine.
//!
//! This crate holds the stateless algorithms behind a Composer repository's
//! metadata:
//!
//! - **[`IndexBuilder`]**: synthesizes `packages.json`, provider and Composer 2
//!   package documents from stored components.
//! - **[`IndexMerger`]**: merges member documents for group repositories,
//!   first-writer-wins in [`RepositoryPriority`] order.
//! - **[`IndexRewriter`]**: repoints upstream documents at a proxy and resolves
//!   upstream dist URLs.
//! - **[`minify`]**: the Composer 2 diff codec.
//! - **[`list`]**: `packages/list.json` with wildcard filters.
//!
//! All of it runs synchronously over in-memory documents. Storage is reached
//! only through the [`store`] collaborator traits.
//!
//! ## Example
//!
//! ```
//! use overture_index::{IndexRewriter, ProviderDocument};
//!
//! # fn example() -> overture_index::Result<()> {
//! let upstream = ProviderDocument::from_slice(
//!     br#"{"packages":{"acme/widgets":{"1.0.0":{"dist":{"url":"https://up/w.zip","type":"zip","reference":"abc","shasum":""}}}}}"#,
//! )?;
//! let local = IndexRewriter::new("http://localhost/repository/php-proxy")
//!     .rewrite_provider_document(upstream)?;
//! let entry = local.entry("acme/widgets", "1.0.0").unwrap();
//! assert_eq!(
//!     entry["dist"]["url"],
//!     "http://localhost/repository/php-proxy/acme/widgets/1.0.0/acme-widgets-1.0.0.zip"
//! );
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod builder;
pub mod document;
pub mod error;
pub mod extract;
pub mod list;
pub mod merger;
pub mod minify;
pub mod rewriter;
pub mod store;
pub mod types;

pub use builder::{
    BuildReport, DEFAULT_MAX_AVAILABLE_PACKAGES, HostedDocuments, IndexBuilder, PackageDocuments,
    build_packages_document,
};
pub use document::{
    DistInfo, MINIFIED_V2, PackageDocument, PackageVersion, PackagesDocument, ProviderDocument,
    SourceInfo, UNSET,
};
pub use error::{IndexError, Result};
pub use extract::ZipComposerJsonExtractor;
pub use list::{ListDocument, PackageFilter, build_list_document};
pub use merger::IndexMerger;
pub use rewriter::{IndexRewriter, NonZipPolicy, get_dist_url, get_dist_url_from_package};
pub use store::{
    Asset, AssetKind, BlobRef, BlobStore, Component, ComponentStore, HashAlgorithm, MemoryStore,
    SourceAttributes, ZipMetadataExtractor,
};
pub use types::{MergeInput, RepositoryPriority, RepositoryType};
