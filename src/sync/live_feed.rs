//! # Live Subscription Feed
//!
//! While connected, consumes the remote store's change feed for the posts
//! collection and republishes each fully-materialized result set over a
//! watch channel for the UI. Every batch also asks the reconciler to
//! refresh the mirror, fire-and-forget, so delivery to subscribers is
//! never blocked on disk.
//!
//! Going offline does not tear the subscription down; the SDK's errors
//! are caught, logged, and ignored, and consumers simply stop reading
//! from the feed per the read-intent policy. On reconnect the service
//! re-attaches the feed after the drain completes, replacing the old
//! task.

use futures_util::StreamExt;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::remote::upload::Uploader;
use crate::remote::RemoteStore;
use crate::shared::model::CachedRecord;
use crate::sync::reconciler::SyncReconciler;

/// Republishes the subscribed posts collection to the rest of the app
#[derive(Debug)]
pub struct LiveFeed {
    latest: Arc<watch::Sender<Arc<Vec<CachedRecord>>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl LiveFeed {
    /// Create a feed with an empty initial result set
    pub fn new() -> Self {
        let (latest, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            latest: Arc::new(latest),
            task: Mutex::new(None),
        }
    }

    /// The most recently published result set
    pub fn latest(&self) -> Arc<Vec<CachedRecord>> {
        Arc::clone(&self.latest.borrow())
    }

    /// Watch the published result sets, e.g. from a view model
    pub fn watch(&self) -> watch::Receiver<Arc<Vec<CachedRecord>>> {
        self.latest.subscribe()
    }

    /// (Re)attach to the store's change feed, replacing any previous
    /// subscription task.
    pub async fn attach<R, U>(
        &self,
        store: &R,
        reconciler: Arc<SyncReconciler<R, U>>,
        collection: &str,
        order_field: &str,
    ) where
        R: RemoteStore,
        U: Uploader,
    {
        let mut stream = store.subscribe(collection, order_field);
        let latest = Arc::clone(&self.latest);

        let handle = tokio::spawn(async move {
            while let Some(batch) = stream.next().await {
                match batch {
                    Ok(documents) => {
                        let records: Vec<CachedRecord> =
                            documents.iter().map(CachedRecord::from_document).collect();
                        let snapshot = Arc::new(records);
                        let _ = latest.send(Arc::clone(&snapshot));

                        // Mirror refresh must not block delivery to the UI.
                        let reconciler = Arc::clone(&reconciler);
                        tokio::spawn(async move {
                            reconciler
                                .refresh_mirror_with(snapshot.as_ref().clone())
                                .await;
                        });
                    }
                    Err(error) => {
                        // Expected while offline; the feed is simply not
                        // the consumed source then.
                        tracing::debug!(%error, "subscription error ignored");
                    }
                }
            }
            tracing::debug!("post subscription stream ended");
        });

        let mut task = self.task.lock().await;
        if let Some(previous) = task.replace(handle) {
            previous.abort();
        }
    }
}

impl Default for LiveFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for LiveFeed {
    fn drop(&mut self) {
        if let Ok(mut task) = self.task.try_lock() {
            if let Some(handle) = task.take() {
                handle.abort();
            }
        }
    }
}
