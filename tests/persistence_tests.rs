// Persistence worker tests: flush-on-dirty, retry after failure, final flush on stop

mod common;

use common::*;
use dockhours::document_file::{DocumentFile, Loader};
use dockhours::persistence_worker::{FlushOutcome, PersistenceConfig, flush_if_dirty, spawn};
use dockhours::store::*;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn clean_store_is_not_written() {
    let store = DocumentStore::new(office_hours_doc());
    let saver = FlakySaver::new(0);
    let outcome = flush_if_dirty(&store, &saver).await.unwrap();
    assert_eq!(outcome, FlushOutcome::Clean);
    assert_eq!(saver.attempts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failed_save_is_retried_on_next_tick() {
    let store = DocumentStore::new(office_hours_doc());
    store.add_container(container("api", true)).unwrap();
    let saver = FlakySaver::new(1);

    assert!(flush_if_dirty(&store, &saver).await.is_err());
    assert!(store.is_dirty());
    assert_eq!(store.last_update(), 1000);

    let outcome = flush_if_dirty(&store, &saver).await.unwrap();
    let FlushOutcome::Flushed { version } = outcome else {
        panic!("expected a flush, got {:?}", outcome);
    };
    assert!(!store.is_dirty());
    assert_eq!(saver.saved_count(), 1);
    assert_eq!(saver.attempts.load(Ordering::SeqCst), 2);
    assert_eq!(store.last_update(), version);

    let saved = saver.saved.lock().unwrap()[0].clone();
    assert_eq!(saved.metadata.last_update, version);
    assert!(saved.container("api").is_some());
}

#[tokio::test]
async fn flush_version_is_strictly_increasing() {
    let mut doc = office_hours_doc();
    // Far-future version, as if written by a host with a fast clock.
    doc.metadata.last_update = i64::MAX / 2;
    let store = DocumentStore::new(doc);
    store.mark_dirty();
    let saver = FlakySaver::new(0);

    flush_if_dirty(&store, &saver).await.unwrap();
    assert_eq!(store.last_update(), i64::MAX / 2 + 1);
}

#[tokio::test]
async fn flush_at_max_version_saturates_instead_of_overflowing() {
    let mut doc = office_hours_doc();
    doc.metadata.last_update = i64::MAX;
    let store = DocumentStore::new(doc);
    store.mark_dirty();
    let saver = FlakySaver::new(0);

    let outcome = flush_if_dirty(&store, &saver).await.unwrap();
    assert_eq!(outcome, FlushOutcome::Flushed { version: i64::MAX });
    assert!(!store.is_dirty());
    assert_eq!(saver.saved.lock().unwrap()[0].metadata.last_update, i64::MAX);
}

#[tokio::test]
async fn stop_request_triggers_final_flush_to_disk() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("state").join("data.json");
    let file = Arc::new(DocumentFile::new(&path));

    let store = Arc::new(DocumentStore::new(office_hours_doc()));
    let root = CancellationToken::new();
    let handle = spawn(
        store.clone(),
        file.clone(),
        PersistenceConfig {
            flush_interval_ms: 3_600_000,
        },
        &root,
    );
    // Let the immediate first tick pass before mutating.
    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
    store.add_container(container("late", true)).unwrap();

    handle.request_stop();
    handle.wait_drained().await;

    assert!(!store.is_dirty());
    let on_disk = file.load().await.unwrap();
    assert!(on_disk.container("late").is_some());
    assert_eq!(on_disk.metadata.last_update, store.last_update());
}
