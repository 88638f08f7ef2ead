//! Shared Error Types
//!
//! This module defines the error taxonomy of the sync core. Every failure
//! is contained to the single affected queue item or operation; none of
//! these errors is fatal to the process.
//!
//! # Error Categories
//!
//! - `Storage` - local disk read/write failures (surfaced to the caller of
//!   `enqueue`, never retried internally)
//! - `Network` - remote store call failures (the affected drain item stays
//!   pending and is retried on the next trigger)
//! - `Upload` - image upload failures (a post is never committed without
//!   its image)
//! - `Lookup` - author resolution failures (aborts the commit of that one
//!   item)
//!
//! # Usage
//!
//! ```rust
//! use ecosphere_sync::shared::error::SyncError;
//!
//! let error = SyncError::network("remote store unreachable");
//! assert!(error.to_string().contains("network"));
//! ```
//!
//! # Thread Safety
//!
//! All error types are `Send + Sync` and can be safely shared across thread
//! boundaries.
use thiserror::Error;

/// Errors produced by the offline-first sync core
#[derive(Debug, Error, Clone)]
pub enum SyncError {
    /// Local disk read or write failure
    #[error("storage error: {message}")]
    Storage {
        /// Human-readable error message
        message: String,
    },

    /// Remote store call failure
    #[error("network error: {message}")]
    Network {
        /// Human-readable error message
        message: String,
    },

    /// Image upload failure
    #[error("upload error: {message}")]
    Upload {
        /// Human-readable error message
        message: String,
    },

    /// Author resolution failure
    #[error("lookup error: {message}")]
    Lookup {
        /// Human-readable error message
        message: String,
    },
}

impl SyncError {
    /// Create a new storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a new upload error
    pub fn upload(message: impl Into<String>) -> Self {
        Self::Upload {
            message: message.into(),
        }
    }

    /// Create a new lookup error
    pub fn lookup(message: impl Into<String>) -> Self {
        Self::Lookup {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        Self::storage(format!("I/O error: {}", err))
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        Self::storage(format!("JSON error: {}", err))
    }
}
