//! Persistence scheduler behavior against a slow, flaky backend
//!
//! Time is paused, so debounce windows and write delays advance
//! deterministically.

use folio_editor::Document;
use folio_schema::Block;
use folio_workspace::{MemoryStorage, SchedulerHandle, WorkspaceError};
use std::sync::Arc;
use std::time::Duration;

const DEBOUNCE: Duration = Duration::from_millis(1500);

fn doc(text: &str) -> Document {
    let mut document = Document::new("page", "Page");
    document.blocks = Arc::new(vec![Block::paragraph(text).with_id("p")]);
    document
}

fn stored_text(storage: &MemoryStorage) -> String {
    let raw = storage.get("page").unwrap();
    raw.decode_blocks("Page")[0].plain_text()
}

#[tokio::test(start_paused = true)]
async fn test_at_most_one_save_in_flight() {
    let storage = Arc::new(MemoryStorage::new().with_write_delay(Duration::from_millis(1000)));
    let scheduler = SchedulerHandle::spawn(storage.clone(), DEBOUNCE, None);

    scheduler.schedule_save(doc("first")).unwrap();
    tokio::time::sleep(Duration::from_millis(1600)).await;

    // "first" is being written; these must wait for it
    scheduler.schedule_save(doc("second")).unwrap();
    let saved = scheduler.flush_now(doc("third")).await.unwrap();

    assert!(saved.is_some());
    assert_eq!(stored_text(&storage), "third");
    assert_eq!(storage.max_concurrent_saves("page"), 1);
    assert_eq!(storage.save_count("page"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_request_during_flight_is_reevaluated() {
    let storage = Arc::new(MemoryStorage::new().with_write_delay(Duration::from_millis(1000)));
    let scheduler = SchedulerHandle::spawn(storage.clone(), DEBOUNCE, None);

    scheduler.schedule_save(doc("same")).unwrap();
    tokio::time::sleep(Duration::from_millis(1600)).await;

    // identical to what is in flight: nothing left to write once it lands
    let saved = scheduler.flush_now(doc("same")).await.unwrap();
    assert!(saved.is_none());
    assert_eq!(storage.save_count("page"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_save_is_retried_on_next_cycle() {
    let storage = Arc::new(MemoryStorage::new());
    storage.fail_next_saves(1);
    let scheduler = SchedulerHandle::spawn(storage.clone(), DEBOUNCE, None);

    scheduler.schedule_save(doc("retry me")).unwrap();
    tokio::time::sleep(Duration::from_millis(1600)).await;
    assert_eq!(storage.save_count("page"), 0);

    tokio::time::sleep(Duration::from_millis(1600)).await;
    assert_eq!(storage.save_count("page"), 1);
    assert_eq!(stored_text(&storage), "retry me");
    assert!(scheduler.last_saved().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_flush_reports_failure_and_keeps_content() {
    let storage = Arc::new(MemoryStorage::new());
    storage.set_offline(true);
    let scheduler = SchedulerHandle::spawn(storage.clone(), DEBOUNCE, None);

    let result = scheduler.flush_now(doc("offline")).await;
    assert!(matches!(result, Err(WorkspaceError::Persistence(_))));

    storage.set_offline(false);
    tokio::time::sleep(Duration::from_millis(1600)).await;
    assert_eq!(stored_text(&storage), "offline");
}

#[tokio::test(start_paused = true)]
async fn test_cancel_drops_pending_save() {
    let storage = Arc::new(MemoryStorage::new());
    let scheduler = SchedulerHandle::spawn(storage.clone(), DEBOUNCE, None);

    scheduler.schedule_save(doc("doomed")).unwrap();
    scheduler.cancel().await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(storage.save_count("page"), 0);
    assert!(storage.get("page").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_returns_after_in_flight_save() {
    let storage = Arc::new(MemoryStorage::new().with_write_delay(Duration::from_millis(500)));
    let scheduler = SchedulerHandle::spawn(storage.clone(), DEBOUNCE, None);

    scheduler.schedule_save(doc("racing")).unwrap();
    tokio::time::sleep(DEBOUNCE + Duration::from_millis(100)).await;
    assert!(storage.get("page").is_none());

    scheduler.cancel().await.unwrap();
    assert_eq!(stored_text(&storage), "racing");
    assert!(scheduler.last_saved().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_failed_save_after_cancel_is_not_retried() {
    let storage = Arc::new(MemoryStorage::new().with_write_delay(Duration::from_millis(500)));
    let scheduler = SchedulerHandle::spawn(storage.clone(), DEBOUNCE, None);
    storage.fail_next_saves(1);

    scheduler.schedule_save(doc("doomed")).unwrap();
    tokio::time::sleep(DEBOUNCE + Duration::from_millis(100)).await;
    scheduler.cancel().await.unwrap();

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(storage.get("page").is_none());
    assert_eq!(storage.save_count("page"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_known_content_is_not_rewritten() {
    let storage = Arc::new(MemoryStorage::new());
    let loaded = doc("on disk");
    let scheduler = SchedulerHandle::spawn(storage.clone(), DEBOUNCE, Some(loaded.blocks.clone()));

    assert!(scheduler.flush_now(loaded).await.unwrap().is_none());
    assert_eq!(storage.save_count("page"), 0);
}
