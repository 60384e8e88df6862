//! Storage for the derived documents of hosted repositories.

use crate::error::{RepositoryError, Result};
use bytes::Bytes;
use dashmap::DashMap;
use overture_index::IndexError;
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

/// Keyed storage of serialized documents, addressed by logical path
/// (`p/acme/widgets.json`, `p2/acme/widgets~dev.json`, ...).
pub trait DocumentCache: Send + Sync {
    /// Stored content, `None` if absent.
    ///
    /// # Errors
    /// Returns a cache error if the read fails.
    fn get(&self, path: &str) -> Result<Option<Bytes>>;

    /// Store content, replacing any previous version.
    ///
    /// # Errors
    /// Returns a cache error if the write fails.
    fn put(&self, path: &str, content: Bytes) -> Result<()>;

    /// Remove content; `true` if something was removed.
    ///
    /// # Errors
    /// Returns a cache error if the removal fails.
    fn delete(&self, path: &str) -> Result<bool>;
}

/// Cache counters.
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Reads that found content.
    pub hits: AtomicU64,
    /// Reads that found nothing.
    pub misses: AtomicU64,
    /// Writes.
    pub writes: AtomicU64,
    /// Removals of existing content.
    pub deletes: AtomicU64,
}

impl CacheStats {
    fn record_read(&self, found: bool) {
        let counter = if found { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Hit ratio in `[0, 1]`; zero before any read.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_ratio(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let total = hits + self.misses.load(Ordering::Relaxed);
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

/// In-memory document cache.
#[derive(Debug, Default)]
pub struct MemoryDocumentCache {
    entries: DashMap<String, Bytes>,
    stats: CacheStats,
}

impl MemoryDocumentCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Counters.
    #[must_use]
    pub const fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

impl DocumentCache for MemoryDocumentCache {
    fn get(&self, path: &str) -> Result<Option<Bytes>> {
        let content = self.entries.get(path).map(|entry| entry.value().clone());
        self.stats.record_read(content.is_some());
        Ok(content)
    }

    fn put(&self, path: &str, content: Bytes) -> Result<()> {
        self.entries.insert(path.to_string(), content);
        self.stats.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<bool> {
        let removed = self.entries.remove(path).is_some();
        if removed {
            self.stats.deletes.fetch_add(1, Ordering::Relaxed);
        }
        Ok(removed)
    }
}

/// Document cache on the local filesystem. Writes go through a temporary
/// file in the target directory and an atomic rename, so readers see either
/// the old or the new document.
#[derive(Debug)]
pub struct FsDocumentCache {
    root: PathBuf,
    stats: CacheStats,
}

impl FsDocumentCache {
    /// Open a cache rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    /// Returns a cache error if the directory cannot be created.
    pub fn at_path(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| RepositoryError::cache(&root, e))?;
        debug!(root = %root.display(), "opened document cache");
        Ok(Self {
            root,
            stats: CacheStats::default(),
        })
    }

    /// Cache root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Counters.
    #[must_use]
    pub const fn stats(&self) -> &CacheStats {
        &self.stats
    }

    fn file_path(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let plain = !path.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !plain {
            return Err(IndexError::validation(format!("invalid document path '{path}'")).into());
        }
        Ok(self.root.join(relative))
    }
}

impl DocumentCache for FsDocumentCache {
    fn get(&self, path: &str) -> Result<Option<Bytes>> {
        let file = self.file_path(path)?;
        match std::fs::read(&file) {
            Ok(content) => {
                self.stats.record_read(true);
                Ok(Some(Bytes::from(content)))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.stats.record_read(false);
                Ok(None)
            }
            Err(e) => Err(RepositoryError::cache(&file, e)),
        }
    }

    fn put(&self, path: &str, content: Bytes) -> Result<()> {
        let file = self.file_path(path)?;
        let dir = file.parent().unwrap_or(&self.root);
        std::fs::create_dir_all(dir).map_err(|e| RepositoryError::cache(dir, e))?;

        let mut temp =
            tempfile::NamedTempFile::new_in(dir).map_err(|e| RepositoryError::cache(dir, e))?;
        temp.write_all(&content)
            .map_err(|e| RepositoryError::cache(dir, e))?;
        temp.persist(&file)
            .map_err(|e| RepositoryError::cache(&file, e.error))?;

        self.stats.writes.fetch_add(1, Ordering::Relaxed);
        trace!(path, bytes = content.len(), "wrote cached document");
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<bool> {
        let file = self.file_path(path)?;
        match std::fs::remove_file(&file) {
            Ok(()) => {
                self.stats.deletes.fetch_add(1, Ordering::Relaxed);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(RepositoryError::cache(&file, e)),
        }
    }
}
