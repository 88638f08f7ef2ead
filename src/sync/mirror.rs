//! # Read-Side Mirror
//!
//! Bounded local cache of the last known-good post snapshots, used for
//! rendering while offline. Pure storage: the mirror is fully replaced
//! (clear-then-repopulate) on every successful refresh and never patched
//! incrementally, so it can never hold a mix of two refresh generations.
//!
//! Replacement swaps an `Arc` under a write lock; a concurrent reader
//! always gets either the whole old generation or the whole new one. The
//! current window is also persisted to disk so offline reads survive a
//! process restart.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;

use crate::shared::error::SyncError;
use crate::shared::model::CachedRecord;
use crate::sync::queue::write_atomic;

/// File holding the persisted window
const MIRROR_FILE: &str = "mirror.json";

/// Bounded cache of post snapshots, newest first
#[derive(Debug)]
pub struct PostMirror {
    path: PathBuf,
    window: usize,
    records: RwLock<Arc<Vec<CachedRecord>>>,
}

impl PostMirror {
    /// Open the mirror rooted at `dir`, reloading any persisted window
    pub async fn open(dir: impl Into<PathBuf>, window: usize) -> Result<Self, SyncError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        let path = dir.join(MIRROR_FILE);

        let records = match fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<Vec<CachedRecord>>(&bytes) {
                Ok(mut records) => {
                    records.truncate(window);
                    records
                }
                Err(error) => {
                    // A torn or stale snapshot only costs a refresh.
                    tracing::warn!(%error, "discarding unreadable mirror snapshot");
                    Vec::new()
                }
            },
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(error) => return Err(error.into()),
        };

        Ok(Self {
            path,
            window,
            records: RwLock::new(Arc::new(records)),
        })
    }

    /// Replace the entire window atomically, then persist it.
    ///
    /// Records are ordered newest first and truncated to the bounded
    /// window before the swap.
    pub async fn replace_all(&self, mut records: Vec<CachedRecord>) -> Result<(), SyncError> {
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records.truncate(self.window);
        let generation = Arc::new(records);
        let bytes = serde_json::to_vec(generation.as_ref())?;

        // Persist while holding the write guard: concurrent replacements
        // (a drain refresh racing a live-feed refresh) must land on disk
        // in the same order they land in memory.
        let mut current = self.records.write().await;
        write_atomic(&self.path, &bytes).await?;
        tracing::debug!(count = generation.len(), "mirror replaced");
        *current = generation;
        Ok(())
    }

    /// The current generation, newest first
    pub async fn read_all(&self) -> Arc<Vec<CachedRecord>> {
        Arc::clone(&*self.records.read().await)
    }
}
