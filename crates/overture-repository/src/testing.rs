//! Shared fixtures for unit tests.

use crate::cache::MemoryDocumentCache;
use crate::controller::RebuildHandler;
use crate::lock::LocalCoordinateLock;
use chrono::{TimeZone, Utc};
use overture_core::PackageName;
use overture_core::json::{JsonMap, parse_object};
use overture_index::{Asset, Component, IndexBuilder, MemoryStore, ZipMetadataExtractor};
use std::sync::Arc;

pub const REPOSITORY: &str = "php-hosted";
pub const BASE_URL: &str = "http://localhost:8081/repository/php-hosted";

pub fn widgets() -> PackageName {
    PackageName::new("acme", "widgets")
}

/// Treats blob content as the `composer.json` itself.
pub fn json_extractor() -> Arc<dyn ZipMetadataExtractor> {
    Arc::new(|data: &[u8]| -> overture_index::Result<JsonMap> { Ok(parse_object(data)?) })
}

pub fn put_version(store: &MemoryStore, name: &PackageName, version: &str, metadata: &str) {
    let blob = store.put_blob(
        format!("{name}-{version}"),
        metadata.as_bytes().to_vec(),
    );
    store.put_component(Component {
        vendor: name.vendor().to_string(),
        project: name.project().to_string(),
        version: version.to_string(),
        last_updated: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        assets: vec![Asset::zipball(name, version, blob)],
    });
}

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub cache: Arc<MemoryDocumentCache>,
    pub handler: Arc<RebuildHandler>,
}

pub fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let cache = Arc::new(MemoryDocumentCache::new());
    let builder = IndexBuilder::new(BASE_URL, store.clone(), json_extractor());
    let handler = Arc::new(RebuildHandler::new(
        REPOSITORY,
        store.clone(),
        Arc::new(builder),
        cache.clone(),
        Arc::new(LocalCoordinateLock::new()),
    ));
    Fixture {
        store,
        cache,
        handler,
    }
}
