//! # Durable Write Queue
//!
//! On-disk store of pending mutations created while disconnected. Each
//! record is one JSON blob named after its local id; a whole-file JSON
//! index keeps the id list in enqueue (FIFO) order. A record exists on
//! disk from enqueue until successful remote commit or explicit removal
//! and survives process restart.
//!
//! ## Crash Consistency
//!
//! `enqueue` writes the record blob first and appends to the index second.
//! A crash between the two leaves an orphan blob that is simply never
//! listed; an indexed-but-missing record is skipped at read time and never
//! corrupts other entries. Record and index writes both go through a temp
//! file and rename, so a crash mid-rewrite can never tear an indexed
//! record, and every index read-modify-write is serialized behind one
//! async mutex.

use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::shared::error::SyncError;
use crate::shared::model::{AttemptState, PendingWrite, WriteKind};

/// File holding the ordered id list
const INDEX_FILE: &str = "pending.json";

/// Keyed, on-disk store of pending writes
#[derive(Debug)]
pub struct WriteQueue {
    dir: PathBuf,
    index_path: PathBuf,
    /// Serializes every index read-modify-write
    lock: Mutex<()>,
}

impl WriteQueue {
    /// Open (creating if needed) a queue rooted at `dir`
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, SyncError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        let index_path = dir.join(INDEX_FILE);
        Ok(Self {
            dir,
            index_path,
            lock: Mutex::new(()),
        })
    }

    /// Persist a new pending write, returning its local id.
    ///
    /// Disk failures surface as [`SyncError::Storage`] and are not retried
    /// here; the caller decides whether to warn the user.
    pub async fn enqueue(&self, kind: WriteKind) -> Result<String, SyncError> {
        let _guard = self.lock.lock().await;
        let local_id = Uuid::new_v4().to_string();
        let write = PendingWrite::new(local_id.clone(), kind);

        // Record first, index second: a crash here orphans the blob
        // instead of indexing a record that does not exist.
        self.write_record(&write).await?;
        let mut ids = self.read_index().await?;
        ids.push(local_id.clone());
        self.write_index(&ids).await?;

        tracing::debug!(%local_id, "queued pending write");
        Ok(local_id)
    }

    /// All pending writes in enqueue order.
    ///
    /// An id whose blob is missing is treated as already consumed and
    /// skipped; a blob that no longer parses is skipped with a warning.
    pub async fn list_pending(&self) -> Result<Vec<PendingWrite>, SyncError> {
        let _guard = self.lock.lock().await;
        let ids = self.read_index().await?;
        let mut writes = Vec::with_capacity(ids.len());

        for local_id in &ids {
            match fs::read(self.record_path(local_id)).await {
                Ok(bytes) => match serde_json::from_slice::<PendingWrite>(&bytes) {
                    Ok(write) => writes.push(write),
                    Err(error) => {
                        tracing::warn!(%local_id, %error, "skipping unreadable queue record");
                    }
                },
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!(%local_id, "indexed record missing on disk; skipping");
                }
                Err(error) => return Err(error.into()),
            }
        }

        Ok(writes)
    }

    /// Remove a pending write. Idempotent: removing an absent id is a
    /// no-op, not an error.
    pub async fn remove(&self, local_id: &str) -> Result<(), SyncError> {
        let _guard = self.lock.lock().await;
        match fs::remove_file(self.record_path(local_id)).await {
            Ok(()) => {}
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
            Err(error) => return Err(error.into()),
        }

        let mut ids = self.read_index().await?;
        let before = ids.len();
        ids.retain(|id| id != local_id);
        if ids.len() != before {
            self.write_index(&ids).await?;
            tracing::debug!(%local_id, "removed pending write");
        }
        Ok(())
    }

    /// Mark a record as currently being sent. Drains never overlap, so at
    /// most one record is in flight at a time; a crash mid-commit leaves
    /// the state behind and the record is simply retried on the next
    /// drain. A no-op if the record was consumed in the meantime.
    pub async fn mark_in_flight(&self, local_id: &str) -> Result<(), SyncError> {
        self.set_attempt(local_id, AttemptState::InFlight).await
    }

    /// Record the reason the last attempt failed; the entry stays listed
    /// and is retried on the next drain. A no-op if the record was
    /// consumed in the meantime.
    pub async fn mark_failed(&self, local_id: &str, reason: &str) -> Result<(), SyncError> {
        self.set_attempt(
            local_id,
            AttemptState::Failed {
                reason: reason.to_string(),
            },
        )
        .await
    }

    async fn set_attempt(&self, local_id: &str, attempt: AttemptState) -> Result<(), SyncError> {
        let _guard = self.lock.lock().await;
        let bytes = match fs::read(self.record_path(local_id)).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(error) => return Err(error.into()),
        };
        let mut write: PendingWrite = serde_json::from_slice(&bytes)?;
        write.attempt = attempt;
        self.write_record(&write).await
    }

    /// Number of indexed pending writes
    pub async fn pending_count(&self) -> Result<usize, SyncError> {
        let _guard = self.lock.lock().await;
        Ok(self.read_index().await?.len())
    }

    fn record_path(&self, local_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", local_id))
    }

    async fn write_record(&self, write: &PendingWrite) -> Result<(), SyncError> {
        let bytes = serde_json::to_vec(write)?;
        write_atomic(&self.record_path(&write.local_id), &bytes).await
    }

    async fn read_index(&self) -> Result<Vec<String>, SyncError> {
        match fs::read(&self.index_path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(error) => Err(error.into()),
        }
    }

    async fn write_index(&self, ids: &[String]) -> Result<(), SyncError> {
        let bytes = serde_json::to_vec(ids)?;
        write_atomic(&self.index_path, &bytes).await
    }
}

/// Write via a temp file and rename so readers never see a torn file.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), SyncError> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}
