//! Durability of the write queue across simulated process restarts.

mod common;

use common::{new_post, new_post_with_image};
use ecosphere_sync::{AttemptState, WriteKind, WriteQueue};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;

#[tokio::test]
async fn restart_preserves_exactly_the_unremoved_items() {
    let dir = tempfile::tempdir().unwrap();

    let removed;
    {
        let queue = WriteQueue::open(dir.path()).await.unwrap();
        queue.enqueue(new_post("first", "u1")).await.unwrap();
        removed = queue.enqueue(new_post("second", "u1")).await.unwrap();
        queue
            .enqueue(new_post_with_image("third", "u1", vec![0xFF, 0xD8, 0xFF]))
            .await
            .unwrap();
        queue.remove(&removed).await.unwrap();
        // Queue handle dropped here: simulated process exit.
    }

    let queue = WriteQueue::open(dir.path()).await.unwrap();
    let pending = queue.list_pending().await.unwrap();
    assert_eq!(pending.len(), 2);
    assert!(pending.iter().all(|write| write.local_id != removed));

    // Contents round-trip exactly, image bytes included.
    match &pending[1].kind {
        WriteKind::NewPost { text, image, .. } => {
            assert_eq!(text, "third");
            assert_eq!(image.as_deref(), Some(&[0xFF, 0xD8, 0xFF][..]));
        }
        other => panic!("expected NewPost, got {:?}", other),
    }
}

#[tokio::test]
async fn restart_preserves_comment_batches_and_failure_state() {
    let dir = tempfile::tempdir().unwrap();
    let mut comments = BTreeMap::new();
    comments.insert("Ana".to_string(), "great idea".to_string());

    let id;
    {
        let queue = WriteQueue::open(dir.path()).await.unwrap();
        id = queue
            .enqueue(WriteKind::CommentBatch {
                post_id: "p1".to_string(),
                comments: comments.clone(),
            })
            .await
            .unwrap();
        queue.mark_failed(&id, "network error: timeout").await.unwrap();
    }

    let queue = WriteQueue::open(dir.path()).await.unwrap();
    let pending = queue.list_pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].local_id, id);
    assert_eq!(
        pending[0].attempt,
        AttemptState::Failed {
            reason: "network error: timeout".to_string()
        }
    );
    match &pending[0].kind {
        WriteKind::CommentBatch { post_id, comments: stored } => {
            assert_eq!(post_id, "p1");
            assert_eq!(stored, &comments);
        }
        other => panic!("expected CommentBatch, got {:?}", other),
    }
}

#[tokio::test]
async fn double_remove_is_a_noop() {
    let dir = tempfile::tempdir().unwrap();
    let queue = WriteQueue::open(dir.path()).await.unwrap();

    let keep = queue.enqueue(new_post("keep", "u1")).await.unwrap();
    let gone = queue.enqueue(new_post("gone", "u1")).await.unwrap();

    queue.remove(&gone).await.unwrap();
    let after_first: Vec<_> = queue.list_pending().await.unwrap();
    queue.remove(&gone).await.unwrap();
    let after_second: Vec<_> = queue.list_pending().await.unwrap();

    assert_eq!(after_first, after_second);
    assert_eq!(after_second.len(), 1);
    assert_eq!(after_second[0].local_id, keep);
}
