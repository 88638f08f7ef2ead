//! Shared test doubles: an in-memory remote store with scriptable
//! failures, a scriptable uploader, and a static auth provider.

#![allow(dead_code)]

use chrono::Utc;
use ecosphere_sync::remote::upload::Uploader;
use ecosphere_sync::remote::{AuthProvider, Document, Fields, RemoteStore};
use ecosphere_sync::{SyncError, WriteKind};
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Install log capture for the current test binary; later calls are
/// no-ops. Filtered through `RUST_LOG` as usual.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Default)]
struct StoreInner {
    collections: HashMap<String, Vec<Document>>,
    /// Text field of every created post, in commit order
    commit_log: Vec<String>,
    subscribers: Vec<(String, mpsc::UnboundedSender<Vec<Document>>)>,
    next_id: u64,
    fail_creates: bool,
}

impl StoreInner {
    fn notify(&mut self, collection: &str) {
        let documents = self
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default();
        self.subscribers.retain(|(subscribed, sender)| {
            subscribed != collection || sender.send(documents.clone()).is_ok()
        });
    }
}

/// In-memory stand-in for the remote document store
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user profile so author resolution succeeds
    pub fn with_user(self, id: &str, username: &str) -> Self {
        self.insert(
            "users",
            id,
            serde_json::json!({ "username": username }),
        );
        self
    }

    /// Seed a document directly
    pub fn insert(&self, collection: &str, id: &str, fields: Value) {
        let fields = fields.as_object().cloned().unwrap_or_default();
        let mut inner = self.inner.lock().unwrap();
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(Document::new(id, fields));
    }

    /// All documents of a collection, in insertion order
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.inner
            .lock()
            .unwrap()
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Text field of every created post, in commit order
    pub fn commit_log(&self) -> Vec<String> {
        self.inner.lock().unwrap().commit_log.clone()
    }

    /// Make every `create_document` fail until cleared
    pub fn set_fail_creates(&self, fail: bool) {
        self.inner.lock().unwrap().fail_creates = fail;
    }

    /// Push the collection's current state to all subscribers
    pub fn publish(&self, collection: &str) {
        self.inner.lock().unwrap().notify(collection);
    }

    fn ordered(&self, collection: &str, order_field: &str, limit: usize) -> Vec<Document> {
        let mut documents = self.documents(collection);
        documents.sort_by(|a, b| {
            let key = |doc: &Document| {
                doc.fields
                    .get(order_field)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned()
            };
            key(b).cmp(&key(a))
        });
        documents.truncate(limit);
        documents
    }
}

impl RemoteStore for InMemoryStore {
    async fn create_document(&self, collection: &str, fields: Fields) -> Result<String, SyncError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_creates {
            return Err(SyncError::network("simulated outage"));
        }
        inner.next_id += 1;
        let id = format!("doc-{}", inner.next_id);
        if let Some(text) = fields.get("text").and_then(Value::as_str) {
            inner.commit_log.push(text.to_owned());
        }
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(Document::new(id.clone(), fields));
        inner.notify(collection);
        Ok(id)
    }

    async fn update_fields(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<(), SyncError> {
        let mut inner = self.inner.lock().unwrap();
        let document = inner
            .collections
            .get_mut(collection)
            .and_then(|documents| documents.iter_mut().find(|doc| doc.id == id))
            .ok_or_else(|| SyncError::network(format!("no document {}/{}", collection, id)))?;
        for (key, value) in fields {
            document.fields.insert(key, value);
        }
        inner.notify(collection);
        Ok(())
    }

    async fn get_document(&self, collection: &str, id: &str) -> Result<Document, SyncError> {
        self.inner
            .lock()
            .unwrap()
            .collections
            .get(collection)
            .and_then(|documents| documents.iter().find(|doc| doc.id == id))
            .cloned()
            .ok_or_else(|| SyncError::network(format!("no document {}/{}", collection, id)))
    }

    async fn query_ordered(
        &self,
        collection: &str,
        order_field: &str,
        limit: usize,
    ) -> Result<Vec<Document>, SyncError> {
        Ok(self.ordered(collection, order_field, limit))
    }

    fn subscribe(
        &self,
        collection: &str,
        _order_field: &str,
    ) -> BoxStream<'static, Result<Vec<Document>, SyncError>> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.inner
            .lock()
            .unwrap()
            .subscribers
            .push((collection.to_string(), sender));
        UnboundedReceiverStream::new(receiver)
            .map(Ok::<_, SyncError>)
            .boxed()
    }
}

/// Scriptable uploader: rejects flagged payloads, serves URLs otherwise
#[derive(Debug, Clone, Default)]
pub struct TestUploader {
    fail_payloads: Arc<Mutex<HashSet<Vec<u8>>>>,
    counter: Arc<AtomicUsize>,
}

impl TestUploader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make uploads of exactly these bytes fail
    pub fn fail_for(&self, bytes: &[u8]) {
        self.fail_payloads.lock().unwrap().insert(bytes.to_vec());
    }

    /// Number of successful uploads
    pub fn upload_count(&self) -> usize {
        self.counter.load(Ordering::SeqCst)
    }
}

impl Uploader for TestUploader {
    async fn upload(&self, bytes: Vec<u8>, _content_type: &str) -> Result<String, SyncError> {
        if self.fail_payloads.lock().unwrap().contains(&bytes) {
            return Err(SyncError::upload("upload refused"));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(format!("https://cdn.test/img-{}.jpg", n))
    }
}

/// Auth provider returning a fixed user id
#[derive(Debug, Clone)]
pub struct StaticAuth(pub Option<String>);

impl AuthProvider for StaticAuth {
    fn current_user_id(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Build a plain text-only post write
pub fn new_post(text: &str, author_id: &str) -> WriteKind {
    WriteKind::NewPost {
        text: text.to_string(),
        created_at: Utc::now(),
        tags: Vec::new(),
        image: None,
        author_id: author_id.to_string(),
    }
}

/// Build a post write carrying image bytes
pub fn new_post_with_image(text: &str, author_id: &str, image: Vec<u8>) -> WriteKind {
    WriteKind::NewPost {
        text: text.to_string(),
        created_at: Utc::now(),
        tags: Vec::new(),
        image: Some(image),
        author_id: author_id.to_string(),
    }
}
