//! Per-coordinate mutual exclusion for rebuilds.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::trace;

/// Serializes work keyed by a coordinate. Two tasks with the same key never
/// overlap; tasks with different keys run independently.
pub trait CoordinateLock: Send + Sync {
    /// Run `task` while holding the lock for `key`.
    fn run_exclusive(&self, key: &str, task: &mut dyn FnMut());
}

/// In-process lock for single-node deployments.
#[derive(Debug, Default)]
pub struct LocalCoordinateLock {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl LocalCoordinateLock {
    /// Create a lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys currently held or waited on.
    #[must_use]
    pub fn active(&self) -> usize {
        self.locks.len()
    }
}

impl CoordinateLock for LocalCoordinateLock {
    fn run_exclusive(&self, key: &str, task: &mut dyn FnMut()) {
        let lock = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        {
            let _guard = lock.lock();
            trace!(key, "coordinate locked");
            task();
        }

        // Drop the entry unless another caller is waiting on it.
        self.locks
            .remove_if(key, |_, entry| Arc::strong_count(entry) == 2);
    }
}
