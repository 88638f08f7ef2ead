//! # Offline-First Sync Core
//!
//! Coordinates the offline-resilience subsystem of the EcoSphere client:
//! writes made while disconnected are queued durably and drained against
//! the remote store on reconnect, while a bounded local mirror of the
//! newest posts keeps read intents working offline.
//!
//! ## Architecture
//!
//! The service wires five components:
//! - **Network Monitor**: connectivity state plus the reconnect edge
//! - **Write Queue**: durable, restart-surviving pending mutations
//! - **Reconciler**: the drain state machine, at most one pass at a time
//! - **Mirror**: atomically-swapped read cache for offline rendering
//! - **Live Feed**: change-feed republisher used while connected
//!
//! ## Data Flow
//!
//! A write intent commits directly while connected and queues while
//! offline, returning optimistic success. The reconnect edge triggers a
//! drain (oldest first, best effort) followed by a mirror refresh and a
//! live-feed re-attach. Read intents render from the live feed while
//! connected and from the mirror otherwise.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ecosphere_sync::{ConnectivityState, SyncConfig, SyncService};
//! # use ecosphere_sync::remote::{AuthProvider, RemoteStore};
//! # use ecosphere_sync::remote::upload::Uploader;
//!
//! # async fn example<R: RemoteStore, U: Uploader, A: AuthProvider>(store: R, uploader: U, auth: A) -> Result<(), Box<dyn std::error::Error>> {
//! let config = SyncConfig::builder().build()?;
//! let mut service = SyncService::new(config, store, uploader, auth).await?;
//! service.start().await?;
//!
//! // The platform probe feeds connectivity samples:
//! service.monitor().report(ConnectivityState::Disconnected);
//!
//! // Queued now, drained automatically on the reconnect edge:
//! service.create_post("hello".into(), vec![], None).await?;
//! # Ok(())
//! # }
//! ```

pub mod live_feed;
pub mod mirror;
pub mod network_monitor;
pub mod queue;
pub mod reconciler;

use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::remote::upload::Uploader;
use crate::remote::{AuthProvider, RemoteStore};
use crate::shared::config::SyncConfig;
use crate::shared::error::SyncError;
use crate::shared::model::{CachedRecord, WriteKind};
use live_feed::LiveFeed;
use mirror::PostMirror;
use network_monitor::{ConnectivityEvent, NetworkMonitor};
use queue::WriteQueue;
use reconciler::SyncReconciler;

/// Subdirectory of the data dir holding queued write records
const QUEUE_DIR: &str = "pending_writes";

/// How a write intent was handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Sent directly to the remote store
    Committed,
    /// Persisted locally; will be drained on the next reconnect
    Queued {
        /// Queue id of the persisted write
        local_id: String,
    },
}

/// Dependency-injected coordinator of the offline-first core.
///
/// Constructed once at process start and passed to consumers; replaces
/// the original client's pile of `shared` singletons while keeping their
/// single-instance semantics.
#[derive(Debug)]
pub struct SyncService<R, U, A> {
    config: SyncConfig,
    monitor: Arc<NetworkMonitor>,
    queue: Arc<WriteQueue>,
    mirror: Arc<PostMirror>,
    reconciler: Arc<SyncReconciler<R, U>>,
    live: Arc<LiveFeed>,
    store: Arc<R>,
    auth: A,
    listener: Option<JoinHandle<()>>,
}

impl<R, U, A> SyncService<R, U, A>
where
    R: RemoteStore,
    U: Uploader,
    A: AuthProvider,
{
    /// Build the service and open its durable state under the configured
    /// data directory.
    pub async fn new(
        config: SyncConfig,
        store: R,
        uploader: U,
        auth: A,
    ) -> Result<Self, SyncError> {
        let store = Arc::new(store);
        let uploader = Arc::new(uploader);
        let queue = Arc::new(WriteQueue::open(config.data_dir.join(QUEUE_DIR)).await?);
        let mirror = Arc::new(PostMirror::open(&config.data_dir, config.mirror_window).await?);
        let reconciler = Arc::new(SyncReconciler::new(
            Arc::clone(&store),
            uploader,
            Arc::clone(&queue),
            Arc::clone(&mirror),
            config.clone(),
        ));

        Ok(Self {
            config,
            monitor: Arc::new(NetworkMonitor::new()),
            queue,
            mirror,
            reconciler,
            live: Arc::new(LiveFeed::new()),
            store,
            auth,
            listener: None,
        })
    }

    /// Start reacting to connectivity.
    ///
    /// Spawns the reconnect listener and, if currently connected, runs the
    /// app-start drain and attaches the live feed. Calling `start` again
    /// is a no-op.
    pub async fn start(&mut self) -> Result<(), SyncError> {
        if self.listener.is_some() {
            tracing::warn!("sync service already started");
            return Ok(());
        }

        let mut events = self.monitor.subscribe();
        let reconciler = Arc::clone(&self.reconciler);
        let live = Arc::clone(&self.live);
        let store = Arc::clone(&self.store);
        let collection = self.config.posts_collection.clone();
        let order_field = self.config.order_field.clone();

        self.listener = Some(tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(ConnectivityEvent::BecameConnected) => {
                        let _ = reconciler.trigger().await;
                        // Re-establish the feed once the drain is done.
                        live.attach(
                            store.as_ref(),
                            Arc::clone(&reconciler),
                            &collection,
                            &order_field,
                        )
                        .await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "connectivity events lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }));

        if self.monitor.is_connected() {
            let _ = self.reconciler.trigger().await;
            self.live
                .attach(
                    self.store.as_ref(),
                    Arc::clone(&self.reconciler),
                    &self.config.posts_collection,
                    &self.config.order_field,
                )
                .await;
        }
        Ok(())
    }

    /// Stop reacting to connectivity
    pub async fn stop(&mut self) {
        if let Some(handle) = self.listener.take() {
            handle.abort();
        }
    }

    /// Write intent: create a post.
    ///
    /// Commits directly while connected (errors surface to the caller);
    /// queues while offline and reports optimistic success.
    pub async fn create_post(
        &self,
        text: String,
        tags: Vec<String>,
        image: Option<Vec<u8>>,
    ) -> Result<WriteOutcome, SyncError> {
        let author_id = self
            .auth
            .current_user_id()
            .ok_or_else(|| SyncError::lookup("no signed-in user"))?;
        let kind = WriteKind::NewPost {
            text,
            created_at: Utc::now(),
            tags,
            image,
            author_id,
        };

        if self.monitor.is_connected() {
            self.reconciler.commit(kind).await?;
            Ok(WriteOutcome::Committed)
        } else {
            let local_id = self.queue.enqueue(kind).await?;
            tracing::info!(%local_id, "post queued while offline");
            Ok(WriteOutcome::Queued { local_id })
        }
    }

    /// Write intent: replace a post's comment map with the given merged
    /// map (field-level last-write-wins).
    pub async fn add_comments(
        &self,
        post_id: impl Into<String>,
        comments: BTreeMap<String, String>,
    ) -> Result<WriteOutcome, SyncError> {
        let kind = WriteKind::CommentBatch {
            post_id: post_id.into(),
            comments,
        };

        if self.monitor.is_connected() {
            self.reconciler.commit(kind).await?;
            Ok(WriteOutcome::Committed)
        } else {
            let local_id = self.queue.enqueue(kind).await?;
            tracing::info!(%local_id, "comment batch queued while offline");
            Ok(WriteOutcome::Queued { local_id })
        }
    }

    /// Read intent: the live feed's result set while connected, the
    /// mirror's last known-good window otherwise.
    pub async fn posts(&self) -> Arc<Vec<CachedRecord>> {
        if self.monitor.is_connected() {
            self.live.latest()
        } else {
            self.mirror.read_all().await
        }
    }

    /// Number of writes still awaiting delivery
    pub async fn pending_count(&self) -> Result<usize, SyncError> {
        self.queue.pending_count().await
    }

    /// The connectivity monitor, for the platform probe and UI indicators
    pub fn monitor(&self) -> &NetworkMonitor {
        &self.monitor
    }

    /// The drain state machine
    pub fn reconciler(&self) -> &Arc<SyncReconciler<R, U>> {
        &self.reconciler
    }

    /// The read-side mirror
    pub fn mirror(&self) -> &Arc<PostMirror> {
        &self.mirror
    }

    /// The live subscription feed
    pub fn live_feed(&self) -> &Arc<LiveFeed> {
        &self.live
    }
}

impl<R, U, A> Drop for SyncService<R, U, A> {
    fn drop(&mut self) {
        if let Some(handle) = self.listener.take() {
            handle.abort();
        }
    }
}
