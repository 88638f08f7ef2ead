//! EcoSphere Sync - Offline-First Write Queue and Reconciliation
//!
//! This library implements the offline-resilience core of the EcoSphere
//! community app: a durable queue for posts and comments created while
//! disconnected, a network monitor that fires on reconnect, and a
//! reconciler that drains the queue against the remote document store and
//! keeps a bounded local mirror fresh for offline reading.
//!
//! # Overview
//!
//! The library provides:
//! - Durable, restart-surviving queuing of write intents made offline
//! - Edge-triggered reconnect detection with a broadcast event channel
//! - A drain state machine that commits pending writes oldest-first
//! - An atomically-swapped read-side mirror of the newest posts
//! - A live subscription feed that republishes remote changes while online
//!
//! # Module Structure
//!
//! The library is organized into three main modules:
//!
//! - **`shared`** - Platform-agnostic types
//!   - Pending write and cached record models
//!   - Error taxonomy
//!   - Configuration
//!
//! - **`remote`** - Collaborator seams
//!   - Remote document store and auth provider traits
//!   - Image uploader trait and HTTP multipart implementation
//!
//! - **`sync`** - The offline-first core
//!   - Network monitor, write queue, mirror, reconciler, live feed
//!   - `SyncService`, the dependency-injected coordinator
//!
//! # Usage
//!
//! ```rust,no_run
//! use ecosphere_sync::{SyncConfig, SyncService};
//! # use ecosphere_sync::remote::{RemoteStore, AuthProvider};
//! # use ecosphere_sync::remote::upload::Uploader;
//!
//! # async fn example<R: RemoteStore, U: Uploader, A: AuthProvider>(store: R, uploader: U, auth: A) -> Result<(), Box<dyn std::error::Error>> {
//! let config = SyncConfig::builder().build()?;
//! let mut service = SyncService::new(config, store, uploader, auth).await?;
//! service.start().await?;
//!
//! // Write intents commit directly while connected, queue while offline.
//! service.create_post("hello".into(), vec!["recycling".into()], None).await?;
//!
//! // Read intents come from the live feed while connected, the mirror otherwise.
//! let posts = service.posts().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! All components are `Send + Sync` and coordinate through `tokio` channels
//! and short-lived locks. The reconciler's drain state doubles as the guard
//! against concurrent drains; the mirror swaps whole generations so readers
//! never observe a partial refresh.

/// Shared types and data structures
pub mod shared;

/// Remote collaborator seams (document store, auth, upload)
pub mod remote;

/// Offline-first sync core
pub mod sync;

/// Re-export commonly used types for convenience
pub use remote::upload::{CloudinaryUploader, Uploader};
pub use remote::{AuthProvider, Document, Fields, RemoteStore};
pub use shared::config::{ConfigError, SyncConfig, SyncConfigBuilder};
pub use shared::error::SyncError;
pub use shared::model::{AttemptState, CachedRecord, PendingWrite, WriteKind};
pub use sync::live_feed::LiveFeed;
pub use sync::mirror::PostMirror;
pub use sync::network_monitor::{ConnectivityEvent, ConnectivityState, NetworkMonitor};
pub use sync::queue::WriteQueue;
pub use sync::reconciler::{DrainReport, ReconcilerState, SyncReconciler, TriggerOutcome};
pub use sync::{SyncService, WriteOutcome};
