//! Tests for sequences of edits against one engine
//!
//! This tests:
//! - Undo/redo inverse law over several major changes
//! - Bursts of raw updates collapsing into one history entry
//! - Redo invalidation by new changes
//! - Document integrity after every step

use folio_editor::{ChangeKind, Command, Document, Engine, EngineOptions, Target};
use folio_schema::{validate_document, Block, BlockType, TextRun};
use std::sync::Arc;

fn engine_with(options: EngineOptions) -> Engine {
    let mut doc = Document::new("notes", "Notes");
    doc.blocks = Arc::new(vec![
        Block::heading("Notes", 1).with_id("title"),
        Block::paragraph("first").with_id("p1"),
    ]);
    Engine::new(doc, options)
}

fn texts(engine: &Engine) -> Vec<String> {
    engine.blocks().iter().map(Block::plain_text).collect()
}

#[test]
fn test_undo_redo_inverse_law() {
    let mut engine = engine_with(EngineOptions::default());
    let mut states = vec![engine.snapshot()];

    for i in 0..5 {
        engine
            .execute(&Command::insert_text(format!("item {i}")))
            .unwrap();
        assert!(validate_document(engine.blocks()).is_ok());
        states.push(engine.snapshot());
    }

    for expected in states.iter().rev().skip(1) {
        engine.undo();
        assert_eq!(&engine.snapshot(), expected);
    }
    assert!(!engine.can_undo());

    for expected in states.iter().skip(1) {
        engine.redo();
        assert_eq!(&engine.snapshot(), expected);
    }
    assert!(!engine.can_redo());
}

#[test]
fn test_burst_of_raw_updates_is_one_undo_step() {
    let mut engine = engine_with(EngineOptions::default());
    let original = engine.snapshot();

    let mut blocks = engine.blocks().to_vec();
    for i in 0..3 {
        blocks.push(Block::paragraph(format!("typed {i}")).with_id(format!("t{i}")));
        assert_eq!(engine.content_changed(blocks.clone()), ChangeKind::Major);
    }
    engine.settle();

    assert_eq!(engine.history().undo_levels(), 1);
    engine.undo();
    assert_eq!(engine.snapshot(), original);
}

#[test]
fn test_text_typing_inside_window_is_undone_with_it() {
    let mut engine = engine_with(EngineOptions::default());
    let original = engine.snapshot();

    let mut blocks = engine.blocks().to_vec();
    blocks.push(Block::paragraph("").with_id("new"));
    engine.content_changed(blocks.clone());

    blocks[2].content = vec![TextRun::plain("hello")];
    assert_eq!(engine.content_changed(blocks), ChangeKind::Minor);

    engine.undo();
    assert_eq!(engine.snapshot(), original);
    engine.redo();
    assert_eq!(texts(&engine), vec!["Notes", "first", "hello"]);
}

#[test]
fn test_new_change_after_undo_clears_redo() {
    let mut engine = engine_with(EngineOptions::default());
    engine.execute(&Command::insert_text("a")).unwrap();
    engine.undo();
    assert!(engine.can_redo());

    engine
        .execute(&Command::ModifyBlockType {
            target: Target::ids(["p1"]),
            new_type: BlockType::Quote,
            level: None,
            checked: None,
        })
        .unwrap();
    assert!(!engine.can_redo());
}

#[test]
fn test_history_limit_drops_oldest_entries() {
    let mut engine = engine_with(EngineOptions {
        max_history_levels: 2,
        ..EngineOptions::default()
    });

    for i in 0..4 {
        engine.execute(&Command::insert_text(format!("{i}"))).unwrap();
    }
    assert_eq!(engine.history().undo_levels(), 2);

    engine.undo();
    engine.undo();
    assert_eq!(texts(&engine), vec!["Notes", "first", "0", "1"]);
    assert!(!engine.can_undo());
}

#[test]
fn test_undo_on_empty_history_is_noop() {
    let mut engine = engine_with(EngineOptions::default());
    let report = engine.undo();
    assert_eq!(report.affected, 0);
    assert_eq!(engine.version(), 0);
}

#[test]
fn test_heading_level_backfill_respects_existing_and_supplied() {
    let mut engine = engine_with(EngineOptions {
        default_heading_level: 3,
        ..EngineOptions::default()
    });

    engine
        .execute(&Command::ModifyBlockType {
            target: Target::ids(["p1"]),
            new_type: BlockType::Heading,
            level: None,
            checked: None,
        })
        .unwrap();
    assert_eq!(engine.blocks()[1].heading_level(), Some(3));

    engine
        .execute(&Command::ModifyBlockType {
            target: Target::ids(["title"]),
            new_type: BlockType::Heading,
            level: None,
            checked: None,
        })
        .unwrap();
    assert_eq!(engine.blocks()[0].heading_level(), Some(1));

    engine
        .execute(&Command::ModifyBlockType {
            target: Target::ids(["title"]),
            new_type: BlockType::Heading,
            level: Some(2),
            checked: None,
        })
        .unwrap();
    assert_eq!(engine.blocks()[0].heading_level(), Some(2));
}
