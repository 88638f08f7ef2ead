//! Shared Module
//!
//! This module contains the platform-agnostic types used across the sync
//! core: the pending-write and cached-record models, the error taxonomy,
//! and configuration. All types here are designed for serialization so the
//! write queue and mirror can round-trip them to disk exactly.

/// Pending write and cached record models
pub mod model;

/// Shared error types
pub mod error;

/// Library configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use config::{ConfigError, SyncConfig, SyncConfigBuilder};
pub use error::SyncError;
pub use model::{AttemptState, CachedRecord, PendingWrite, WriteKind};
