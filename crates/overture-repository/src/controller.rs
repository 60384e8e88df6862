//! Keeps the cached documents of hosted repositories in step with the store.
//!
//! [`MetadataInvalidationController`] turns relevant store changes into
//! [`InvalidationRequest`]s; [`RebuildHandler`] answers a request by
//! re-deriving the provider and Composer 2 documents of the coordinate.
//! [`InvalidationWorker`] wires both to an [`EventBus`] on a background thread.

use crate::cache::DocumentCache;
use crate::error::{RepositoryError, Result};
use crate::event_bus::{EventBus, EventSubscription};
use crate::events::{AssetEvent, ChangeKind, InvalidationRequest, RepositoryEvent};
use crate::lock::CoordinateLock;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use overture_core::path::{package_path, provider_path};
use overture_core::{ContentHash, PackageName};
use overture_index::{AssetKind, ComponentStore, IndexBuilder};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Updates whose blob changed longer ago than this are re-saves.
pub const DEFAULT_BLOB_UPDATE_WINDOW: Duration = Duration::from_secs(60);

/// Bus name the controller publishes under.
pub const CONTROLLER_NAME: &str = "invalidation-controller";

/// Bus name of the rebuild worker.
pub const WORKER_NAME: &str = "rebuild-worker";

/// Result of one rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RebuildOutcome {
    /// At least one cached document was written or removed.
    Replaced,
    /// Every document came out byte-identical.
    Unchanged,
    /// No component has a retrievable zipball; the documents were removed.
    Deleted,
    /// The rebuild failed; previous documents are kept.
    Failed,
}

impl fmt::Display for RebuildOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Replaced => write!(f, "replaced"),
            Self::Unchanged => write!(f, "unchanged"),
            Self::Deleted => write!(f, "deleted"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Controller counters.
#[derive(Debug, Default)]
pub struct ControllerStats {
    /// Asset events received.
    pub events_seen: AtomicU64,
    /// Asset events filtered out.
    pub events_ignored: AtomicU64,
    /// Invalidation requests emitted.
    pub invalidations: AtomicU64,
}

/// Filters store changes into invalidation requests for one repository.
#[derive(Debug)]
pub struct MetadataInvalidationController {
    repository: String,
    bus: Arc<EventBus>,
    blob_update_window: Duration,
    stats: ControllerStats,
}

impl MetadataInvalidationController {
    /// Create a controller for `repository` publishing on `bus`.
    #[must_use]
    pub fn new(repository: impl Into<String>, bus: Arc<EventBus>) -> Self {
        Self {
            repository: repository.into(),
            bus,
            blob_update_window: DEFAULT_BLOB_UPDATE_WINDOW,
            stats: ControllerStats::default(),
        }
    }

    /// Set the recency window for update events.
    #[must_use]
    pub const fn with_blob_update_window(mut self, window: Duration) -> Self {
        self.blob_update_window = window;
        self
    }

    /// Repository name.
    #[must_use]
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Counters.
    #[must_use]
    pub const fn stats(&self) -> &ControllerStats {
        &self.stats
    }

    /// Handle a store change; returns the request published, if any.
    pub fn on_asset_event(&self, event: &AssetEvent) -> Option<InvalidationRequest> {
        self.on_asset_event_at(event, Utc::now())
    }

    /// [`on_asset_event`](Self::on_asset_event) with an explicit clock.
    pub fn on_asset_event_at(
        &self,
        event: &AssetEvent,
        now: DateTime<Utc>,
    ) -> Option<InvalidationRequest> {
        self.stats.events_seen.fetch_add(1, Ordering::Relaxed);

        if let Some(reason) = self.ignore_reason(event, now) {
            self.stats.events_ignored.fetch_add(1, Ordering::Relaxed);
            debug!(
                repository = %event.repository,
                vendor = %event.vendor,
                project = %event.project,
                reason,
                "ignoring asset event"
            );
            return None;
        }

        let request = InvalidationRequest::from(event);
        self.stats.invalidations.fetch_add(1, Ordering::Relaxed);
        debug!(coordinate = %request, kind = ?event.kind, "invalidating documents");
        self.bus.publish(CONTROLLER_NAME, request.clone());
        Some(request)
    }

    fn ignore_reason(&self, event: &AssetEvent, now: DateTime<Utc>) -> Option<&'static str> {
        if event.repository != self.repository {
            return Some("other repository");
        }
        if !event.local {
            return Some("remote node");
        }
        if event.asset_kind != AssetKind::Zipball {
            return Some("not a zipball");
        }
        if event.kind == ChangeKind::Updated
            && let Some(updated) = event.blob_updated
            && now
                .signed_duration_since(updated)
                .to_std()
                .is_ok_and(|age| age > self.blob_update_window)
        {
            return Some("blob unchanged");
        }
        None
    }
}

/// Rebuild counters.
#[derive(Debug, Default)]
pub struct RebuildStats {
    /// Rebuilds attempted.
    pub rebuilds: AtomicU64,
    /// Rebuilds that replaced documents.
    pub replaced: AtomicU64,
    /// Rebuilds with identical output.
    pub unchanged: AtomicU64,
    /// Rebuilds that removed documents.
    pub deleted: AtomicU64,
    /// Failed rebuilds.
    pub failed: AtomicU64,
}

impl RebuildStats {
    fn record(&self, outcome: RebuildOutcome) {
        self.rebuilds.fetch_add(1, Ordering::Relaxed);
        let counter = match outcome {
            RebuildOutcome::Replaced => &self.replaced,
            RebuildOutcome::Unchanged => &self.unchanged,
            RebuildOutcome::Deleted => &self.deleted,
            RebuildOutcome::Failed => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Re-derives the per-package documents of a hosted repository.
pub struct RebuildHandler {
    repository: String,
    components: Arc<dyn ComponentStore>,
    builder: Arc<IndexBuilder>,
    cache: Arc<dyn DocumentCache>,
    lock: Arc<dyn CoordinateLock>,
    stats: RebuildStats,
}

impl fmt::Debug for RebuildHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RebuildHandler")
            .field("repository", &self.repository)
            .field("builder", &self.builder)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl RebuildHandler {
    /// Create a handler.
    #[must_use]
    pub fn new(
        repository: impl Into<String>,
        components: Arc<dyn ComponentStore>,
        builder: Arc<IndexBuilder>,
        cache: Arc<dyn DocumentCache>,
        lock: Arc<dyn CoordinateLock>,
    ) -> Self {
        Self {
            repository: repository.into(),
            components,
            builder,
            cache,
            lock,
            stats: RebuildStats::default(),
        }
    }

    /// Repository name.
    #[must_use]
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Counters.
    #[must_use]
    pub const fn stats(&self) -> &RebuildStats {
        &self.stats
    }

    pub(crate) fn components(&self) -> &Arc<dyn ComponentStore> {
        &self.components
    }

    pub(crate) fn builder(&self) -> &IndexBuilder {
        &self.builder
    }

    pub(crate) fn cache(&self) -> &Arc<dyn DocumentCache> {
        &self.cache
    }

    /// Answer an invalidation request. Requests for other repositories are
    /// ignored and reported as [`RebuildOutcome::Unchanged`].
    pub fn handle(&self, request: &InvalidationRequest) -> RebuildOutcome {
        if request.repository != self.repository {
            debug!(coordinate = %request, "request for another repository");
            return RebuildOutcome::Unchanged;
        }
        self.rebuild(&request.name())
    }

    /// Rebuild the documents of `name` under its coordinate lock. Never fails:
    /// errors are logged and reported as [`RebuildOutcome::Failed`].
    pub fn rebuild(&self, name: &PackageName) -> RebuildOutcome {
        let key = format!("{}:{name}", self.repository);
        let mut outcome = RebuildOutcome::Failed;
        self.lock.run_exclusive(&key, &mut || {
            outcome = match self.try_rebuild(name) {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(coordinate = %key, error = %e, "rebuild failed, keeping previous documents");
                    RebuildOutcome::Failed
                }
            };
        });
        self.stats.record(outcome);
        info!(coordinate = %key, %outcome, "rebuilt documents");
        outcome
    }

    fn try_rebuild(&self, name: &PackageName) -> Result<RebuildOutcome> {
        let paths = [
            provider_path(name),
            package_path(name, false),
            package_path(name, true),
        ];
        let components = self.components.components(name)?;
        let report = self.builder.build_documents(&components)?;

        if report.none_available() {
            self.apply(&paths, [None, None, None])?;
            return Ok(RebuildOutcome::Deleted);
        }
        if report.all_failed() {
            warn!(
                package = %name,
                components = report.components,
                skipped = report.skipped,
                "no component could be assembled"
            );
            return Ok(RebuildOutcome::Failed);
        }

        // Serialize everything before touching the cache.
        let documents = report.document;
        let contents = [
            non_empty(documents.provider.is_empty(), || documents.provider.to_bytes())?,
            non_empty(documents.packages.stable.is_empty(), || {
                documents.packages.stable.to_bytes()
            })?,
            non_empty(documents.packages.dev.is_empty(), || {
                documents.packages.dev.to_bytes()
            })?,
        ];

        Ok(if self.apply(&paths, contents)? {
            RebuildOutcome::Replaced
        } else {
            RebuildOutcome::Unchanged
        })
    }

    /// Bring every path to its new content (`None` removes it). Returns
    /// whether anything changed. If a write fails, paths already written are
    /// restored to their previous content.
    fn apply(&self, paths: &[String], contents: [Option<Vec<u8>>; 3]) -> Result<bool> {
        let mut staged = Vec::with_capacity(paths.len());
        for (path, content) in paths.iter().zip(contents) {
            let previous = self.cache.get(path)?;
            let unchanged = match (&previous, &content) {
                (None, None) => true,
                (Some(old), Some(new)) => ContentHash::from_bytes(old) == ContentHash::from_bytes(new),
                _ => false,
            };
            if !unchanged {
                staged.push(StagedWrite {
                    path: path.as_str(),
                    previous,
                    next: content.map(Bytes::from),
                });
            }
        }

        for (index, write) in staged.iter().enumerate() {
            if let Err(e) = self.store(write.path, write.next.as_ref()) {
                self.roll_back(&staged[..=index]);
                return Err(e);
            }
        }
        Ok(!staged.is_empty())
    }

    fn roll_back(&self, written: &[StagedWrite<'_>]) {
        for write in written.iter().rev() {
            if let Err(e) = self.store(write.path, write.previous.as_ref()) {
                warn!(path = %write.path, error = %e, "could not restore previous document");
            }
        }
    }

    fn store(&self, path: &str, content: Option<&Bytes>) -> Result<()> {
        match content {
            Some(content) => self.cache.put(path, content.clone()),
            None => self.cache.delete(path).map(|_| ()),
        }
    }
}

struct StagedWrite<'a> {
    path: &'a str,
    previous: Option<Bytes>,
    next: Option<Bytes>,
}

fn non_empty(
    empty: bool,
    serialize: impl FnOnce() -> overture_index::Result<Vec<u8>>,
) -> Result<Option<Vec<u8>>> {
    if empty {
        Ok(None)
    } else {
        Ok(Some(serialize()?))
    }
}

/// Background thread feeding bus events through the controller and the
/// rebuild handler. Stops when dropped.
#[derive(Debug)]
pub struct InvalidationWorker {
    bus: Arc<EventBus>,
    subscription_id: u64,
    thread: Option<JoinHandle<()>>,
}

impl InvalidationWorker {
    /// Subscribe to `bus` and start the worker thread.
    ///
    /// # Errors
    /// Returns a worker error if the thread cannot be spawned.
    pub fn spawn(
        bus: Arc<EventBus>,
        controller: Arc<MetadataInvalidationController>,
        handler: Arc<RebuildHandler>,
    ) -> Result<Self> {
        let repository = handler.repository().to_string();
        let subscription = bus.subscribe(WORKER_NAME);
        let subscription_id = subscription.id;
        let thread = std::thread::Builder::new()
            .name(format!("overture-rebuild-{repository}"))
            .spawn(move || run_worker(&subscription, &controller, &handler))
            .map_err(|e| {
                bus.unsubscribe(subscription_id);
                RepositoryError::Worker(e.to_string())
            })?;

        info!(%repository, "invalidation worker started");
        Ok(Self {
            bus,
            subscription_id,
            thread: Some(thread),
        })
    }

    /// Stop the worker after it drains pending events.
    pub fn stop(&mut self) {
        self.bus.unsubscribe(self.subscription_id);
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            warn!("invalidation worker panicked");
        }
    }
}

impl Drop for InvalidationWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker(
    subscription: &EventSubscription,
    controller: &MetadataInvalidationController,
    handler: &RebuildHandler,
) {
    while let Ok(envelope) = subscription.recv() {
        match envelope.event {
            RepositoryEvent::Asset(event) => {
                if let Some(request) = controller.on_asset_event(&event) {
                    handler.handle(&request);
                }
            }
            RepositoryEvent::Invalidation(request) if envelope.source != CONTROLLER_NAME => {
                handler.handle(&request);
            }
            RepositoryEvent::Invalidation(_) => {}
        }
    }
    debug!(repository = handler.repository(), "invalidation worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryDocumentCache;
    use crate::events::INVALIDATION_TOPIC;
    use crate::lock::LocalCoordinateLock;
    use crate::testing::{BASE_URL, REPOSITORY, fixture, json_extractor, put_version, widgets};
    use chrono::TimeDelta;
    use overture_index::{MemoryStore, PackageDocument, ProviderDocument};
    use std::sync::atomic::AtomicBool;
    use std::time::Instant;

    const PROVIDER: &str = "p/acme/widgets.json";
    const STABLE: &str = "p2/acme/widgets.json";
    const DEV: &str = "p2/acme/widgets~dev.json";

    fn event(kind: ChangeKind) -> AssetEvent {
        AssetEvent::zipball(kind, REPOSITORY, &widgets())
    }

    #[test]
    fn relevant_events_publish_invalidations() {
        let bus = Arc::new(EventBus::default());
        let sub = bus.subscribe_to_topic("test", INVALIDATION_TOPIC);
        let controller = MetadataInvalidationController::new(REPOSITORY, bus.clone());
        let now = Utc::now();

        for kind in [ChangeKind::Created, ChangeKind::Updated, ChangeKind::Deleted] {
            let request = controller.on_asset_event_at(&event(kind), now).unwrap();
            assert_eq!(request, InvalidationRequest::new(REPOSITORY, &widgets()));
        }
        let recent = event(ChangeKind::Updated).with_blob_updated(now - TimeDelta::seconds(5));
        assert!(controller.on_asset_event_at(&recent, now).is_some());

        assert_eq!(sub.drain().len(), 4);
        assert_eq!(controller.stats().invalidations.load(Ordering::Relaxed), 4);
    }

    #[test]
    fn irrelevant_events_are_ignored() {
        let bus = Arc::new(EventBus::default());
        let sub = bus.subscribe("test");
        let controller = MetadataInvalidationController::new(REPOSITORY, bus.clone());
        let now = Utc::now();

        let other = AssetEvent::zipball(ChangeKind::Created, "php-other", &widgets());
        let remote = event(ChangeKind::Created).remote();
        let mut metadata = event(ChangeKind::Created);
        metadata.asset_kind = AssetKind::Provider;
        let stale = event(ChangeKind::Updated).with_blob_updated(now - TimeDelta::minutes(10));

        for ignored in [other, remote, metadata, stale] {
            assert!(controller.on_asset_event_at(&ignored, now).is_none());
        }
        assert!(sub.try_recv().is_none());
        assert_eq!(controller.stats().events_seen.load(Ordering::Relaxed), 4);
        assert_eq!(controller.stats().events_ignored.load(Ordering::Relaxed), 4);
    }

    #[test]
    fn recency_window_is_configurable() {
        let bus = Arc::new(EventBus::default());
        let controller = MetadataInvalidationController::new(REPOSITORY, bus)
            .with_blob_update_window(Duration::from_secs(1));
        let now = Utc::now();
        let update = event(ChangeKind::Updated).with_blob_updated(now - TimeDelta::seconds(5));
        assert!(controller.on_asset_event_at(&update, now).is_none());
        // A deletion is never a no-op re-save.
        let delete = event(ChangeKind::Deleted).with_blob_updated(now - TimeDelta::seconds(5));
        assert!(controller.on_asset_event_at(&delete, now).is_some());
    }

    #[test]
    fn rebuild_writes_every_document() {
        let f = fixture();
        put_version(&f.store, &widgets(), "1.0.0", r#"{"license":"MIT"}"#);
        put_version(&f.store, &widgets(), "dev-main", r#"{"license":"MIT"}"#);

        assert_eq!(f.handler.rebuild(&widgets()), RebuildOutcome::Replaced);

        let provider = ProviderDocument::from_slice(&f.cache.get(PROVIDER).unwrap().unwrap()).unwrap();
        assert_eq!(provider.version_count(), 2);
        let stable = PackageDocument::from_slice(&f.cache.get(STABLE).unwrap().unwrap()).unwrap();
        assert!(stable.minified);
        assert_eq!(stable.version_count(), 1);
        let dev = PackageDocument::from_slice(&f.cache.get(DEV).unwrap().unwrap()).unwrap();
        assert_eq!(dev.version_count(), 1);
    }

    #[test]
    fn identical_rebuild_is_unchanged() {
        let f = fixture();
        put_version(&f.store, &widgets(), "1.0.0", r#"{"license":"MIT"}"#);
        assert_eq!(f.handler.rebuild(&widgets()), RebuildOutcome::Replaced);
        assert_eq!(f.handler.rebuild(&widgets()), RebuildOutcome::Unchanged);
        assert!(f.cache.get(DEV).unwrap().is_none());

        put_version(&f.store, &widgets(), "1.1.0", r#"{"license":"MIT"}"#);
        assert_eq!(f.handler.rebuild(&widgets()), RebuildOutcome::Replaced);
        assert_eq!(f.handler.stats().rebuilds.load(Ordering::Relaxed), 3);
        assert_eq!(f.handler.stats().unchanged.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn deleting_last_zipball_deletes_documents() {
        let f = fixture();
        put_version(&f.store, &widgets(), "1.0.0", r#"{"license":"MIT"}"#);
        put_version(&f.store, &widgets(), "dev-main", r#"{"license":"MIT"}"#);
        f.handler.rebuild(&widgets());
        assert_eq!(f.cache.len(), 3);

        f.store.remove_component(&widgets(), "dev-main");
        assert_eq!(f.handler.rebuild(&widgets()), RebuildOutcome::Replaced);
        assert!(f.cache.get(DEV).unwrap().is_none());

        f.store.remove_component(&widgets(), "1.0.0");
        assert_eq!(f.handler.rebuild(&widgets()), RebuildOutcome::Deleted);
        assert!(f.cache.is_empty());
    }

    #[test]
    fn blobless_zipball_deletes_documents() {
        let f = fixture();
        put_version(&f.store, &widgets(), "1.0.0", r#"{"license":"MIT"}"#);
        assert_eq!(f.handler.rebuild(&widgets()), RebuildOutcome::Replaced);
        assert_eq!(f.cache.len(), 2);

        // The component record survives but its archive is gone.
        let blob = f.store.components(&widgets()).unwrap()[0].assets[0]
            .blob
            .clone()
            .unwrap();
        f.store.remove_blob(&blob);
        assert_eq!(f.handler.rebuild(&widgets()), RebuildOutcome::Deleted);
        assert!(f.cache.is_empty());
    }

    /// Memory cache whose writes to one path fail while armed.
    #[derive(Debug)]
    struct FailingCache {
        inner: MemoryDocumentCache,
        path: &'static str,
        armed: AtomicBool,
    }

    impl DocumentCache for FailingCache {
        fn get(&self, path: &str) -> Result<Option<Bytes>> {
            self.inner.get(path)
        }

        fn put(&self, path: &str, content: Bytes) -> Result<()> {
            if path == self.path && self.armed.load(Ordering::SeqCst) {
                return Err(RepositoryError::Channel("write refused".into()));
            }
            self.inner.put(path, content)
        }

        fn delete(&self, path: &str) -> Result<bool> {
            self.inner.delete(path)
        }
    }

    #[test]
    fn failed_write_restores_earlier_writes() {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(FailingCache {
            inner: MemoryDocumentCache::new(),
            path: STABLE,
            armed: AtomicBool::new(false),
        });
        let handler = RebuildHandler::new(
            REPOSITORY,
            store.clone(),
            Arc::new(IndexBuilder::new(BASE_URL, store.clone(), json_extractor())),
            cache.clone(),
            Arc::new(LocalCoordinateLock::new()),
        );

        put_version(&store, &widgets(), "1.0.0", r#"{"license":"MIT"}"#);
        assert_eq!(handler.rebuild(&widgets()), RebuildOutcome::Replaced);
        let provider = cache.get(PROVIDER).unwrap().unwrap();
        let stable = cache.get(STABLE).unwrap().unwrap();

        put_version(&store, &widgets(), "1.1.0", r#"{"license":"MIT"}"#);
        put_version(&store, &widgets(), "dev-main", r#"{"license":"MIT"}"#);
        cache.armed.store(true, Ordering::SeqCst);
        assert_eq!(handler.rebuild(&widgets()), RebuildOutcome::Failed);
        assert_eq!(cache.get(PROVIDER).unwrap().unwrap(), provider);
        assert_eq!(cache.get(STABLE).unwrap().unwrap(), stable);
        assert!(cache.get(DEV).unwrap().is_none());

        cache.armed.store(false, Ordering::SeqCst);
        assert_eq!(handler.rebuild(&widgets()), RebuildOutcome::Replaced);
        let provider = ProviderDocument::from_slice(&cache.get(PROVIDER).unwrap().unwrap()).unwrap();
        assert_eq!(provider.version_count(), 3);
    }

    #[test]
    fn failed_rebuild_keeps_previous_documents() {
        let f = fixture();
        put_version(&f.store, &widgets(), "1.0.0", r#"{"license":"MIT"}"#);
        f.handler.rebuild(&widgets());
        let before = f.cache.get(PROVIDER).unwrap().unwrap();

        put_version(&f.store, &widgets(), "1.0.0", "{broken");
        assert_eq!(f.handler.rebuild(&widgets()), RebuildOutcome::Failed);
        assert_eq!(f.cache.get(PROVIDER).unwrap().unwrap(), before);
        assert_eq!(f.handler.stats().failed.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn requests_for_other_repositories_are_skipped() {
        let f = fixture();
        put_version(&f.store, &widgets(), "1.0.0", r#"{"license":"MIT"}"#);
        let request = InvalidationRequest::new("php-other", &widgets());
        assert_eq!(f.handler.handle(&request), RebuildOutcome::Unchanged);
        assert!(f.cache.is_empty());
    }

    #[test]
    fn worker_rebuilds_on_store_events() {
        let f = fixture();
        let bus = Arc::new(EventBus::default());
        let controller = Arc::new(MetadataInvalidationController::new(REPOSITORY, bus.clone()));
        let mut worker =
            InvalidationWorker::spawn(bus.clone(), controller.clone(), f.handler.clone()).unwrap();

        put_version(&f.store, &widgets(), "1.0.0", r#"{"license":"MIT"}"#);
        bus.publish("store", event(ChangeKind::Created));

        let deadline = Instant::now() + Duration::from_secs(5);
        while f.cache.get(PROVIDER).unwrap().is_none() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        worker.stop();

        assert!(f.cache.get(PROVIDER).unwrap().is_some());
        assert_eq!(controller.stats().invalidations.load(Ordering::Relaxed), 1);
        assert_eq!(f.handler.stats().rebuilds.load(Ordering::Relaxed), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
