//! Library configuration module
//!
//! Provides the configuration consumed by the sync service: collection
//! names, the recency field and query window for mirror refreshes, and the
//! directory holding the durable queue and mirror files.

use std::path::PathBuf;
use thiserror::Error;

/// Default bounded window held by the read-side mirror
const DEFAULT_MIRROR_WINDOW: usize = 10;

/// Default number of records fetched per mirror refresh
const DEFAULT_QUERY_LIMIT: usize = 50;

/// Sync service configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Remote collection holding post documents
    pub posts_collection: String,
    /// Remote collection holding user profiles
    pub users_collection: String,
    /// Field the posts collection is ordered by, newest first
    pub order_field: String,
    /// Number of records fetched per mirror refresh
    pub query_limit: usize,
    /// Bounded window held by the read-side mirror
    pub mirror_window: usize,
    /// Directory holding the durable queue and the mirror snapshot
    pub data_dir: PathBuf,
}

impl SyncConfig {
    /// Create a new SyncConfigBuilder
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.posts_collection.is_empty() {
            return Err(ConfigError::MissingValue("posts_collection"));
        }
        if self.users_collection.is_empty() {
            return Err(ConfigError::MissingValue("users_collection"));
        }
        if self.order_field.is_empty() {
            return Err(ConfigError::MissingValue("order_field"));
        }
        if self.mirror_window == 0 {
            return Err(ConfigError::InvalidValue(
                "mirror_window must be at least 1".to_string(),
            ));
        }
        if self.query_limit == 0 {
            return Err(ConfigError::InvalidValue(
                "query_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        let data_dir = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("ecosphere-sync");
        Self {
            posts_collection: "posts".to_string(),
            users_collection: "users".to_string(),
            order_field: "timestamp".to_string(),
            query_limit: DEFAULT_QUERY_LIMIT,
            mirror_window: DEFAULT_MIRROR_WINDOW,
            data_dir,
        }
    }
}

/// Builder for SyncConfig
#[derive(Debug, Default)]
pub struct SyncConfigBuilder {
    posts_collection: Option<String>,
    users_collection: Option<String>,
    order_field: Option<String>,
    query_limit: Option<usize>,
    mirror_window: Option<usize>,
    data_dir: Option<PathBuf>,
}

impl SyncConfigBuilder {
    /// Set the posts collection name
    pub fn posts_collection(mut self, name: impl Into<String>) -> Self {
        self.posts_collection = Some(name.into());
        self
    }

    /// Set the users collection name
    pub fn users_collection(mut self, name: impl Into<String>) -> Self {
        self.users_collection = Some(name.into());
        self
    }

    /// Set the recency ordering field
    pub fn order_field(mut self, name: impl Into<String>) -> Self {
        self.order_field = Some(name.into());
        self
    }

    /// Set the number of records fetched per mirror refresh
    pub fn query_limit(mut self, limit: usize) -> Self {
        self.query_limit = Some(limit);
        self
    }

    /// Set the bounded window held by the read-side mirror
    pub fn mirror_window(mut self, window: usize) -> Self {
        self.mirror_window = Some(window);
        self
    }

    /// Set the directory holding the queue and mirror files
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<SyncConfig, ConfigError> {
        let defaults = SyncConfig::default();
        let config = SyncConfig {
            posts_collection: self.posts_collection.unwrap_or(defaults.posts_collection),
            users_collection: self.users_collection.unwrap_or(defaults.users_collection),
            order_field: self.order_field.unwrap_or(defaults.order_field),
            query_limit: self.query_limit.unwrap_or(defaults.query_limit),
            mirror_window: self.mirror_window.unwrap_or(defaults.mirror_window),
            data_dir: self.data_dir.unwrap_or(defaults.data_dir),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value: {0}")]
    InvalidValue(String),
    #[error("missing value: {0}")]
    MissingValue(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SyncConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.posts_collection, "posts");
        assert_eq!(config.mirror_window, 10);
    }

    #[test]
    fn test_builder_overrides() {
        let config = SyncConfig::builder()
            .posts_collection("forum_posts")
            .mirror_window(25)
            .data_dir("/tmp/sync-test")
            .build()
            .unwrap();
        assert_eq!(config.posts_collection, "forum_posts");
        assert_eq!(config.mirror_window, 25);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/sync-test"));
        // Untouched fields keep their defaults
        assert_eq!(config.users_collection, "users");
    }

    #[test]
    fn test_zero_window_rejected() {
        let result = SyncConfig::builder().mirror_window(0).build();
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_empty_collection_rejected() {
        let result = SyncConfig::builder().posts_collection("").build();
        assert!(matches!(
            result,
            Err(ConfigError::MissingValue("posts_collection"))
        ));
    }
}
