use crate::error::LoadError;
use crate::index::{Snapshot, SnapshotStats};
use crate::persist::{load_snapshot, IndexPaths};
use parking_lot::RwLock;
use std::sync::Arc;

/// Long-lived owner of the snapshot queries run against.
///
/// Readers take an `Arc` to the current snapshot and search it without
/// holding the lock; a rebuild publishes a whole new snapshot with `swap`.
#[derive(Debug, Clone)]
pub struct SnapshotHandle {
    inner: Arc<RwLock<Arc<Snapshot>>>,
}

impl SnapshotHandle {
    pub fn new(snapshot: Snapshot) -> Self {
        Self { inner: Arc::new(RwLock::new(Arc::new(snapshot))) }
    }

    pub fn open(paths: &IndexPaths) -> Result<Self, LoadError> {
        Ok(Self::new(load_snapshot(paths)?))
    }

    pub fn current(&self) -> Arc<Snapshot> {
        self.inner.read().clone()
    }

    /// Publish `snapshot`, returning the one it replaced.
    pub fn swap(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let next = Arc::new(snapshot);
        std::mem::replace(&mut *self.inner.write(), next)
    }

    /// Load from disk and swap in. On error the current snapshot keeps serving.
    pub fn reload(&self, paths: &IndexPaths) -> Result<SnapshotStats, LoadError> {
        let snapshot = match load_snapshot(paths) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "snapshot reload failed, keeping current snapshot");
                return Err(e);
            }
        };
        let stats = snapshot.stats();
        self.swap(snapshot);
        tracing::info!(num_docs = stats.num_docs, num_terms = stats.num_terms, "snapshot swapped");
        Ok(stats)
    }
}
