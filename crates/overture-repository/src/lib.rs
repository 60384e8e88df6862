//! Repository plumbing around the Overture index engine.
//!
//! The engine in `overture-index` is pure. This crate adds the stateful parts
//! a running repository needs:
//!
//! - **[`DocumentSource`]** strategies for hosted, proxy and group
//!   repositories.
//! - **[`MetadataInvalidationController`]** and **[`RebuildHandler`]**, which
//!   keep cached hosted documents in step with the component store.
//! - **[`EventBus`]**, a topic-filtered crossbeam bus carrying store changes
//!   and invalidation requests.
//! - **[`DocumentCache`]** backends and a per-coordinate [`CoordinateLock`].

#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod controller;
pub mod error;
pub mod event_bus;
pub mod events;
pub mod lock;
pub mod source;

#[cfg(test)]
mod testing;

pub use cache::{CacheStats, DocumentCache, FsDocumentCache, MemoryDocumentCache};
pub use controller::{
    ControllerStats, DEFAULT_BLOB_UPDATE_WINDOW, InvalidationWorker,
    MetadataInvalidationController, RebuildHandler, RebuildOutcome, RebuildStats,
};
pub use error::{RepositoryError, Result};
pub use event_bus::{EventBus, EventBusStats, EventEnvelope, EventSubscription};
pub use events::{AssetEvent, ChangeKind, InvalidationRequest, RepositoryEvent};
pub use lock::{CoordinateLock, LocalCoordinateLock};
pub use source::{
    DocumentSource, GroupMember, GroupSource, HostedSource, ProxySource, UpstreamFetcher,
    resolve_upstream,
};
