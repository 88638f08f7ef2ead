//! Data Model
//!
//! This module defines the two records the sync core persists: the
//! `PendingWrite` queued while disconnected, and the `CachedRecord`
//! snapshot of a server post held in the read-side mirror. Both round-trip
//! through JSON exactly, which is what the on-disk queue and mirror rely on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::remote::Document;

/// The mutation carried by a pending write
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WriteKind {
    /// A post created while offline
    NewPost {
        /// Post body text
        text: String,
        /// Creation time recorded at enqueue, not at commit
        created_at: DateTime<Utc>,
        /// Ordered tag list, lowercased at commit time
        tags: Vec<String>,
        /// Raw image bytes awaiting upload, if any
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image: Option<Vec<u8>>,
        /// Opaque id of the authoring user
        author_id: String,
    },
    /// The full merged comment map for one post
    CommentBatch {
        /// Target post document id
        post_id: String,
        /// Author display name mapped to comment text
        comments: BTreeMap<String, String>,
    },
}

/// Delivery state of a queued write
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AttemptState {
    /// Awaiting its next commit attempt
    #[default]
    Pending,
    /// Commit attempt underway; at most one record at a time since
    /// drains never overlap. Survives a crash mid-commit, after which
    /// the record is listed and retried like a pending one.
    InFlight,
    /// Last attempt failed; retried on the next drain
    Failed {
        /// Why the last attempt failed
        reason: String,
    },
}

/// A queued mutation awaiting transmission to the remote store.
///
/// Exists on disk from enqueue until successful remote commit or explicit
/// removal, and survives process restart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingWrite {
    /// Locally generated unique id, never reused
    pub local_id: String,
    /// The queued mutation
    pub kind: WriteKind,
    /// Delivery state; successful delivery deletes the entry instead
    #[serde(default)]
    pub attempt: AttemptState,
}

impl PendingWrite {
    /// Create a new pending write in the `Pending` state
    pub fn new(local_id: impl Into<String>, kind: WriteKind) -> Self {
        Self {
            local_id: local_id.into(),
            kind,
            attempt: AttemptState::Pending,
        }
    }
}

/// Last known-good snapshot of a post, held by the read-side mirror.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CachedRecord {
    /// Remote document id
    pub id: String,
    /// Post title
    pub title: String,
    /// Post body text
    pub text: String,
    /// Server-side creation time
    pub timestamp: DateTime<Utc>,
    /// Lowercased tag list
    pub tags: Vec<String>,
    /// Upvote count
    pub upvotes: i64,
    /// Ids of users who upvoted
    pub upvoted_by: Vec<String>,
    /// Author display name mapped to comment text
    pub comments: BTreeMap<String, String>,
    /// Uploaded image URL, if the post has one
    pub asset_url: Option<String>,
    /// Author display name
    pub author: String,
}

impl CachedRecord {
    /// Decode a remote post document, tolerating absent or oddly-typed
    /// fields the way the live forum view does: strings default to empty,
    /// counts to zero, and an unparseable timestamp to "now".
    pub fn from_document(document: &Document) -> Self {
        let fields = &document.fields;
        let text_field = |name: &str| {
            fields
                .get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned()
        };
        let list_field = |name: &str| {
            fields
                .get(name)
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_owned)
                        .collect()
                })
                .unwrap_or_default()
        };

        let timestamp = fields
            .get("timestamp")
            .and_then(Value::as_str)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|parsed| parsed.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        let comments = fields
            .get("comments")
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .filter_map(|(author, text)| {
                        text.as_str().map(|text| (author.clone(), text.to_owned()))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            id: document.id.clone(),
            title: text_field("title"),
            text: text_field("text"),
            timestamp,
            tags: list_field("tags"),
            upvotes: fields.get("upvotes").and_then(Value::as_i64).unwrap_or(0),
            upvoted_by: list_field("upvotedBy"),
            comments,
            asset_url: fields
                .get("asset")
                .and_then(Value::as_str)
                .map(str::to_owned),
            author: text_field("user"),
        }
    }
}
