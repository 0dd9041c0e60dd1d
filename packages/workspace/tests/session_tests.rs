//! End-to-end document session flows over in-memory storage

use folio_editor::{Command, FormatStyle, Target};
use folio_schema::{Block, BlockType, PROP_TARGET_ID};
use folio_workspace::{
    BufferSurface, DocumentSession, EditorSurface, EngineConfig, FixedInterpreter, MemoryStorage,
    Storage, UtteranceOutcome, WorkspaceError,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn sessions() -> (Arc<MemoryStorage>, DocumentSession) {
    let storage = Arc::new(MemoryStorage::new());
    let sessions = DocumentSession::new(storage.clone(), storage.clone(), EngineConfig::default());
    (storage, sessions)
}

fn stored_blocks(storage: &MemoryStorage, id: &str) -> Vec<Block> {
    storage.get(id).unwrap().decode_blocks("Untitled")
}

#[tokio::test(start_paused = true)]
async fn test_command_then_flush_persists() {
    let (storage, sessions) = sessions();
    let session = sessions.open("page").await.unwrap();

    let report = session.execute(Command::insert_text("Buy milk")).await.unwrap();
    assert_eq!(report.affected, 1);

    let saved = session.flush().await.unwrap();
    assert!(saved.is_some());

    let blocks = stored_blocks(&storage, "page");
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[1].plain_text(), "Buy milk");
}

#[tokio::test(start_paused = true)]
async fn test_raw_edits_are_debounced() {
    let (storage, sessions) = sessions();
    let session = sessions.open("page").await.unwrap();
    let mut blocks = session.snapshot().await.unwrap().blocks.to_vec();

    for text in ["h", "he", "hel"] {
        blocks[0].content[0].text = text.to_string();
        session.content_changed(blocks.clone()).unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
    }
    assert_eq!(storage.save_count("page"), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(storage.save_count("page"), 1);
    assert_eq!(stored_blocks(&storage, "page")[0].plain_text(), "hel");
}

#[tokio::test(start_paused = true)]
async fn test_structural_burst_settles_into_one_undo_entry() {
    let (storage, sessions) = sessions();
    let session = sessions.open("page").await.unwrap();
    let mut blocks = session.snapshot().await.unwrap().blocks.to_vec();

    for i in 0..3 {
        blocks.push(Block::paragraph(format!("line {i}")).with_id(format!("l{i}")));
        session.content_changed(blocks.clone()).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    let status = session.status().await.unwrap();
    assert!(status.history_pending);
    assert!(status.can_undo);
    assert_eq!(status.undo_levels, 0);

    tokio::time::sleep(Duration::from_millis(1100)).await;
    let status = session.status().await.unwrap();
    assert!(!status.history_pending);
    assert_eq!(status.undo_levels, 1);
    assert_eq!(storage.history("page").unwrap().undo.len(), 1);

    session.undo().await.unwrap();
    assert_eq!(session.snapshot().await.unwrap().blocks.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_history_survives_reopen() {
    let (_storage, sessions) = sessions();

    let session = sessions.open("page").await.unwrap();
    session.execute(Command::insert_text("kept")).await.unwrap();
    session.close().await.unwrap();

    let reopened = sessions.open("page").await.unwrap();
    let status = reopened.status().await.unwrap();
    assert!(status.can_undo);

    reopened.undo().await.unwrap();
    let blocks = reopened.snapshot().await.unwrap().blocks;
    assert_eq!(blocks.len(), 1);
    assert!(reopened.status().await.unwrap().can_redo);
}

#[tokio::test(start_paused = true)]
async fn test_create_linked_document() {
    let (storage, sessions) = sessions();
    let session = sessions.open("parent").await.unwrap();

    let report = session
        .execute(Command::CreateLinkedDocument {
            title: "Child page".to_string(),
            icon: Some("📝".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(report.affected, 1);

    let children = storage.list_children("parent").await.unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].title, "Child page");

    let blocks = session.snapshot().await.unwrap().blocks;
    let link = blocks.last().unwrap();
    assert_eq!(link.block_type, BlockType::Link);
    assert_eq!(link.prop_str(PROP_TARGET_ID), Some(children[0].id.as_str()));
    assert!(link.content.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_delete_cancels_pending_save_and_clears_history() {
    let (storage, sessions) = sessions();
    let session = sessions.open("page").await.unwrap();
    session.execute(Command::insert_text("saved")).await.unwrap();
    session.flush().await.unwrap();

    session.execute(Command::insert_text("never saved")).await.unwrap();
    assert!(storage.history("page").is_some());

    let existed = session.delete_document().await.unwrap();
    assert!(existed);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(storage.get("page").is_none());
    assert!(storage.history("page").is_none());
    assert_eq!(storage.save_count("page"), 1);

    let after = session.execute(Command::Undo).await;
    assert_eq!(after, Err(WorkspaceError::SessionClosed));
}

#[tokio::test(start_paused = true)]
async fn test_failed_command_reports_reason() {
    let (_storage, sessions) = sessions();
    let session = sessions.open("page").await.unwrap();

    let result = session
        .execute(Command::DeleteBlocks {
            target: Target::ids(["nope"]),
        })
        .await;
    assert!(matches!(result, Err(WorkspaceError::Editor(_))));
    assert_eq!(session.status().await.unwrap().version, 0);
}

#[tokio::test(start_paused = true)]
async fn test_interpreter_failure_inserts_text() {
    let (_storage, sessions) = sessions();
    let session = sessions.open("page").await.unwrap();

    let outcome = session
        .submit_utterance(&FixedInterpreter::failing("timeout"), "call the vet")
        .await
        .unwrap();
    assert!(matches!(outcome, UtteranceOutcome::Applied(_)));

    let blocks = session.snapshot().await.unwrap().blocks;
    assert_eq!(blocks.last().unwrap().plain_text(), "call the vet");
}

#[tokio::test(start_paused = true)]
async fn test_clarification_changes_nothing() {
    let (_storage, sessions) = sessions();
    let session = sessions.open("page").await.unwrap();
    let interpreter = FixedInterpreter::responding(json!({
        "action": "CLARIFICATION",
        "message": "Which list do you mean?"
    }));

    let outcome = session.submit_utterance(&interpreter, "check it").await.unwrap();
    assert_eq!(
        outcome,
        UtteranceOutcome::Clarification("Which list do you mean?".to_string())
    );
    assert_eq!(session.status().await.unwrap().version, 0);
}

#[tokio::test(start_paused = true)]
async fn test_surface_round_trip() {
    let (_storage, sessions) = sessions();
    let session = sessions.open("page").await.unwrap();
    let mut surface = BufferSurface::default();

    session.render_to(&mut surface).await.unwrap();
    surface.focus();
    assert!(surface.is_focused());
    assert_eq!(surface.content().len(), 1);

    surface.blocks_mut().push(Block::paragraph("typed").with_id("t"));
    session.sync_from_surface(&surface).unwrap();

    let blocks = session.snapshot().await.unwrap().blocks;
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[1].plain_text(), "typed");
}

#[tokio::test(start_paused = true)]
async fn test_flush_failure_keeps_local_state() {
    let (storage, sessions) = sessions();
    let session = sessions.open("page").await.unwrap();
    session.execute(Command::insert_text("precious")).await.unwrap();

    storage.set_offline(true);
    assert!(matches!(
        session.flush().await,
        Err(WorkspaceError::Persistence(_))
    ));
    assert_eq!(session.snapshot().await.unwrap().blocks.len(), 2);

    storage.set_offline(false);
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(stored_blocks(&storage, "page").len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_open_window_is_persisted_when_command_is_rejected() -> anyhow::Result<()> {
    let (storage, sessions) = sessions();
    let session = sessions.open("page").await?;
    let mut blocks = session.snapshot().await?.blocks.to_vec();
    blocks.push(Block::paragraph("typed").with_id("t1"));
    session.content_changed(blocks)?;

    let rejected = session
        .execute(Command::DeleteBlocks {
            target: Target::ids(["nope"]),
        })
        .await;
    assert!(matches!(rejected, Err(WorkspaceError::Editor(_))));
    assert_eq!(storage.history("page").map(|h| h.undo.len()), Some(1));

    session.close().await?;
    let reopened = sessions.open("page").await?;
    assert_eq!(reopened.status().await?.undo_levels, 1);

    reopened.undo().await?;
    assert_eq!(reopened.snapshot().await?.blocks.len(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_open_window_is_persisted_by_formatting_nothing() -> anyhow::Result<()> {
    let (storage, sessions) = sessions();
    let session = sessions.open("page").await?;
    let mut blocks = session.snapshot().await?.blocks.to_vec();
    blocks.push(Block::paragraph("typed").with_id("t1"));
    session.content_changed(blocks)?;

    let report = session
        .execute(Command::ApplyFormatting {
            target: Target::ids(["nope"]),
            style: FormatStyle::Bold,
            enabled: true,
        })
        .await?;
    assert_eq!(report.affected, 0);
    assert_eq!(storage.history("page").map(|h| h.undo.len()), Some(1));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_delete_waits_for_in_flight_save() -> anyhow::Result<()> {
    let storage = Arc::new(MemoryStorage::new().with_write_delay(Duration::from_millis(500)));
    let sessions = DocumentSession::new(storage.clone(), storage.clone(), EngineConfig::default());
    let session = sessions.open("page").await?;
    session.execute(Command::insert_text("racing")).await?;

    // debounce elapsed, save still sleeping in the backend
    tokio::time::sleep(Duration::from_millis(1600)).await;
    assert!(storage.get("page").is_none());

    assert!(session.delete_document().await?);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(storage.get("page").is_none());
    assert!(storage.history("page").is_none());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_failed_close_keeps_session_open() -> anyhow::Result<()> {
    let (storage, sessions) = sessions();
    let session = sessions.open("page").await?;
    session.execute(Command::insert_text("precious")).await?;

    storage.set_offline(true);
    assert!(matches!(
        session.close().await,
        Err(WorkspaceError::Persistence(_))
    ));
    assert_eq!(session.snapshot().await?.blocks.len(), 2);

    storage.set_offline(false);
    session.close().await?;
    assert_eq!(stored_blocks(&storage, "page")[1].plain_text(), "precious");
    assert!(matches!(
        session.status().await,
        Err(WorkspaceError::SessionClosed)
    ));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_unsaved_changes_follow_debounced_saves() -> anyhow::Result<()> {
    let (storage, sessions) = sessions();
    let session = sessions.create("Inbox", None).await?;
    let id = session.id().to_string();
    assert!(!session.status().await?.unsaved_changes);

    session.execute(Command::insert_text("call mom")).await?;
    assert!(session.status().await?.unsaved_changes);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(storage.save_count(&id), 2);
    assert!(!session.status().await?.unsaved_changes);

    // a trailing blank line is never written, so storage is still current
    let mut blocks = session.snapshot().await?.blocks.to_vec();
    blocks.push(Block::empty_paragraph());
    session.content_changed(blocks)?;
    assert!(!session.status().await?.unsaved_changes);
    Ok(())
}
