//! Remote Collaborator Seams
//!
//! The sync core treats everything on the other side of the network as a
//! black box reachable only while online: a collection-oriented document
//! store, an auth provider that knows the current user, and an image
//! upload endpoint. This module defines those seams as traits so the
//! reconciler and live feed can be driven against a real backend in the
//! app and an in-memory double in tests.
//!
//! Trait methods return named `Send` futures rather than using `async fn`
//! so the futures can be driven from spawned tasks.

use futures_util::stream::BoxStream;
use serde_json::{Map, Value};
use std::future::Future;

use crate::shared::error::SyncError;

/// Image uploader seam and the HTTP multipart implementation
pub mod upload;

/// The field map of one remote document
pub type Fields = Map<String, Value>;

/// One record of a remote collection: an id plus its fields
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Document id within its collection
    pub id: String,
    /// Field values
    pub fields: Fields,
}

impl Document {
    /// Create a document from an id and a field map
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

/// Collection-oriented CRUD plus change-feed subscription, as exposed by
/// the remote document store.
///
/// Calls may fail at any time; the core maps every failure to
/// [`SyncError::Network`] and contains it to the affected operation.
pub trait RemoteStore: Send + Sync + 'static {
    /// Create a document, returning its server-assigned id
    fn create_document(
        &self,
        collection: &str,
        fields: Fields,
    ) -> impl Future<Output = Result<String, SyncError>> + Send;

    /// Merge the given fields into an existing document (field-level
    /// last-write-wins)
    fn update_fields(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> impl Future<Output = Result<(), SyncError>> + Send;

    /// Fetch one document by id
    fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> impl Future<Output = Result<Document, SyncError>> + Send;

    /// Fetch the newest documents of a collection, ordered by the given
    /// field descending, at most `limit` of them
    fn query_ordered(
        &self,
        collection: &str,
        order_field: &str,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Document>, SyncError>> + Send;

    /// Subscribe to the collection's change feed. Each item is the fully
    /// materialized current result set, newest first. The stream lives
    /// until dropped; errors while offline are expected and non-fatal.
    fn subscribe(
        &self,
        collection: &str,
        order_field: &str,
    ) -> BoxStream<'static, Result<Vec<Document>, SyncError>>;
}

/// Supplies the opaque id of the signed-in user, if any.
pub trait AuthProvider: Send + Sync + 'static {
    /// Current user id, or `None` when signed out
    fn current_user_id(&self) -> Option<String>;
}
