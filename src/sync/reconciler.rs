//! # Sync Reconciler
//!
//! The orchestrator of the offline-first core, expressed as an explicit
//! state machine: `Idle -> Draining -> RefreshingMirror -> Idle`. A
//! trigger arriving while a pass is underway is coalesced, so at most one
//! drain ever runs at a time; the state cell itself is the guard.
//!
//! A drain processes pending writes oldest first, one commit attempt per
//! item per pass. Every failure is contained to its item: the write stays
//! queued with the failure recorded and the drain moves on. After the
//! drain the mirror is refreshed from a bounded window of the remote
//! posts collection and swapped atomically.

use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::remote::{Fields, RemoteStore};
use crate::remote::upload::Uploader;
use crate::shared::config::SyncConfig;
use crate::shared::error::SyncError;
use crate::shared::model::{CachedRecord, WriteKind};
use crate::sync::mirror::PostMirror;
use crate::sync::queue::WriteQueue;

/// State of the drain machine; `Draining` and `RefreshingMirror` double as
/// the at-most-one-concurrent-drain guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcilerState {
    Idle,
    Draining,
    RefreshingMirror,
}

/// What a trigger did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// A full pass ran
    Completed(DrainReport),
    /// A pass was already underway; this trigger was a no-op
    Coalesced,
}

/// Per-pass accounting
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Items the pass attempted
    pub attempted: usize,
    /// Items committed and removed from the queue
    pub committed: usize,
    /// Items that failed and stay queued for the next trigger
    pub failed: usize,
}

/// Drains the write queue and refreshes the mirror
#[derive(Debug)]
pub struct SyncReconciler<R, U> {
    store: Arc<R>,
    uploader: Arc<U>,
    queue: Arc<WriteQueue>,
    mirror: Arc<PostMirror>,
    config: SyncConfig,
    state: Mutex<ReconcilerState>,
}

impl<R: RemoteStore, U: Uploader> SyncReconciler<R, U> {
    /// Wire a reconciler to its collaborators
    pub fn new(
        store: Arc<R>,
        uploader: Arc<U>,
        queue: Arc<WriteQueue>,
        mirror: Arc<PostMirror>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            uploader,
            queue,
            mirror,
            config,
            state: Mutex::new(ReconcilerState::Idle),
        }
    }

    /// Current machine state
    pub async fn state(&self) -> ReconcilerState {
        *self.state.lock().await
    }

    /// Run one drain-then-refresh pass, or coalesce if one is underway.
    ///
    /// Fired on the reconnect edge and at app start with connectivity.
    /// Item failures are contained; the machine always returns to `Idle`.
    pub async fn trigger(&self) -> TriggerOutcome {
        {
            let mut state = self.state.lock().await;
            if *state != ReconcilerState::Idle {
                tracing::debug!(?state, "drain already underway; coalescing trigger");
                return TriggerOutcome::Coalesced;
            }
            *state = ReconcilerState::Draining;
        }

        let report = self.drain().await;

        *self.state.lock().await = ReconcilerState::RefreshingMirror;
        if let Err(error) = self.refresh_mirror().await {
            tracing::warn!(%error, "mirror refresh failed; keeping previous generation");
        }

        *self.state.lock().await = ReconcilerState::Idle;
        tracing::info!(
            attempted = report.attempted,
            committed = report.committed,
            failed = report.failed,
            "drain pass complete"
        );
        TriggerOutcome::Completed(report)
    }

    /// Attempt every pending write once, oldest first
    async fn drain(&self) -> DrainReport {
        let pending = match self.queue.list_pending().await {
            Ok(pending) => pending,
            Err(error) => {
                tracing::warn!(%error, "could not read write queue; skipping drain");
                return DrainReport::default();
            }
        };

        let mut report = DrainReport::default();
        for write in pending {
            report.attempted += 1;
            let local_id = write.local_id;

            if let Err(error) = self.queue.mark_in_flight(&local_id).await {
                tracing::debug!(%local_id, %error, "could not mark record in flight");
            }
            match self.commit(write.kind).await {
                Ok(()) => match self.queue.remove(&local_id).await {
                    Ok(()) => report.committed += 1,
                    Err(error) => {
                        // Committed remotely but still queued locally; the
                        // next pass will re-send it (accepted duplicate
                        // risk, same as the original client).
                        tracing::warn!(%local_id, %error, "committed but could not dequeue");
                        report.failed += 1;
                    }
                },
                Err(error) => {
                    report.failed += 1;
                    tracing::warn!(%local_id, %error, "pending write failed; will retry on next drain");
                    if let Err(mark_error) = self.queue.mark_failed(&local_id, &error.to_string()).await {
                        tracing::warn!(%local_id, %mark_error, "could not record failure reason");
                    }
                }
            }
        }
        report
    }

    /// Commit one mutation to the remote store. Also the direct path for
    /// write intents made while connected.
    pub(crate) async fn commit(&self, kind: WriteKind) -> Result<(), SyncError> {
        match kind {
            WriteKind::NewPost {
                text,
                created_at,
                tags,
                image,
                author_id,
            } => {
                // The image must be attached before commit; a post is
                // never created without it.
                let asset_url = match image {
                    Some(bytes) => Some(self.uploader.upload(bytes, "image/jpeg").await?),
                    None => None,
                };
                let author = self.resolve_author(&author_id).await?;

                let mut fields = Fields::new();
                fields.insert("text".to_string(), json!(text));
                fields.insert("timestamp".to_string(), json!(created_at.to_rfc3339()));
                fields.insert("user".to_string(), json!(author));
                fields.insert("upvotedBy".to_string(), json!([]));
                fields.insert("upvotes".to_string(), json!(0));
                if !tags.is_empty() {
                    let tags: Vec<String> = tags.iter().map(|tag| tag.to_lowercase()).collect();
                    fields.insert("tags".to_string(), json!(tags));
                }
                if let Some(url) = asset_url {
                    fields.insert("asset".to_string(), json!(url));
                }

                let id = self
                    .store
                    .create_document(&self.config.posts_collection, fields)
                    .await?;
                tracing::debug!(%id, "post committed");
                Ok(())
            }
            WriteKind::CommentBatch { post_id, comments } => {
                // Field-level last-write-wins: the merged map overwrites
                // whatever the server holds, which can drop a comment
                // merged concurrently on another device. Accepted gap.
                let mut fields = Fields::new();
                fields.insert("comments".to_string(), json!(comments));
                self.store
                    .update_fields(&self.config.posts_collection, &post_id, fields)
                    .await?;
                tracing::debug!(%post_id, "comment batch committed");
                Ok(())
            }
        }
    }

    /// Resolve the author's display name from the users collection
    async fn resolve_author(&self, author_id: &str) -> Result<String, SyncError> {
        let profile = self
            .store
            .get_document(&self.config.users_collection, author_id)
            .await
            .map_err(|error| SyncError::lookup(format!("author {}: {}", author_id, error)))?;
        profile
            .fields
            .get("username")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| {
                SyncError::lookup(format!("user profile {} has no username", author_id))
            })
    }

    /// Fetch a fresh bounded window of posts and swap the mirror
    pub async fn refresh_mirror(&self) -> Result<(), SyncError> {
        let documents = self
            .store
            .query_ordered(
                &self.config.posts_collection,
                &self.config.order_field,
                self.config.query_limit,
            )
            .await?;
        let records: Vec<CachedRecord> =
            documents.iter().map(CachedRecord::from_document).collect();
        self.mirror.replace_all(records).await
    }

    /// Swap the mirror to an already-materialized result set. Used by the
    /// live feed, fire-and-forget.
    pub async fn refresh_mirror_with(&self, records: Vec<CachedRecord>) {
        if let Err(error) = self.mirror.replace_all(records).await {
            tracing::warn!(%error, "mirror refresh from live feed failed");
        }
    }
}
