//! # Editing Engine
//!
//! Coordinates one document's store, change classifier and history. Every
//! mutation, whether a raw editor update, a structured command or an
//! undo/redo step, is committed through here so the classifier sees all of
//! them in order.
//!
//! The engine is synchronous and owns no timers. Callers decide when the
//! history window settles (the workspace session does it after a quiet
//! period) and when to persist.

use crate::classifier::{ChangeClassifier, ChangeKind};
use crate::commands::{self, Command, TransformOptions, Transformed};
use crate::document::{Document, DocumentStore, Snapshot};
use crate::errors::EditorError;
use crate::history::{History, PersistedHistory};
use folio_schema::{normalize, Block};
use serde::Serialize;
use std::fmt::Display;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub default_heading_level: u8,
    /// 0 = unlimited
    pub max_history_levels: usize,
    pub untitled_title: String,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            default_heading_level: 2,
            max_history_levels: 0,
            untitled_title: "Untitled".to_string(),
        }
    }
}

/// Result of a successfully applied command
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandReport {
    pub action: &'static str,
    pub affected: usize,
    pub block_ids: Vec<String>,
    pub version: u64,
}

/// Caller-facing `{success, affectedCount, reason}` summary
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOutcome {
    pub success: bool,
    pub affected_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl CommandOutcome {
    pub fn from_result<E: Display>(result: &Result<CommandReport, E>) -> Self {
        match result {
            Ok(report) => Self {
                success: true,
                affected_count: report.affected,
                reason: None,
            },
            Err(e) => Self {
                success: false,
                affected_count: 0,
                reason: Some(e.to_string()),
            },
        }
    }
}

pub struct Engine {
    store: DocumentStore,
    history: History,
    classifier: ChangeClassifier,
    options: EngineOptions,
}

impl Engine {
    pub fn new(document: Document, options: EngineOptions) -> Self {
        Self {
            store: DocumentStore::new(document),
            history: History::with_max_levels(options.max_history_levels),
            classifier: ChangeClassifier::new(),
            options,
        }
    }

    pub fn document(&self) -> &Document {
        self.store.get()
    }

    pub fn blocks(&self) -> &[Block] {
        self.store.blocks()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.store.snapshot()
    }

    pub fn version(&self) -> u64 {
        self.store.version()
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Record what the save path last wrote
    pub fn mark_persisted(&mut self, snapshot: Snapshot) {
        self.store.mark_persisted(snapshot);
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.store.has_unsaved_changes()
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.store.set_title(title);
    }

    /// Raw content update from the editing surface.
    ///
    /// The blocks are normalized first; an update equal to the current
    /// content is ignored.
    pub fn content_changed(&mut self, blocks: Vec<Block>) -> ChangeKind {
        let blocks = normalize(blocks, &self.document().metadata.title);
        if DocumentStore::equals(self.store.blocks(), &blocks) {
            return ChangeKind::None;
        }

        let kind = self.commit(blocks);
        debug!(
            document_id = %self.document().id,
            version = self.version(),
            kind = ?kind,
            "Content changed"
        );
        kind
    }

    /// Close the open history window, recording it if a major change happened
    pub fn settle(&mut self) -> bool {
        let recorded = self.classifier.settle(&mut self.history);
        if recorded {
            debug!(
                document_id = %self.document().id,
                undo_levels = self.history.undo_levels(),
                "Recorded history entry"
            );
        }
        recorded
    }

    /// Whether a major change is waiting to be recorded
    pub fn has_pending_change(&self) -> bool {
        self.classifier.is_pending()
    }

    /// Apply a structured command atomically.
    ///
    /// Linked-document creation needs storage and is handled by the workspace
    /// session, which calls [`Engine::append_link`] once the child exists.
    pub fn execute(&mut self, command: &Command) -> Result<CommandReport, EditorError> {
        self.settle();

        match command {
            Command::Undo => return Ok(self.undo()),
            Command::Redo => return Ok(self.redo()),
            _ => {}
        }

        let transform_options = TransformOptions {
            default_heading_level: self.options.default_heading_level,
        };

        let transformed = match commands::transform(command, self.store.blocks(), transform_options) {
            Ok(transformed) => transformed,
            Err(e) => {
                debug!(
                    document_id = %self.document().id,
                    action = command.action(),
                    error = %e,
                    "Command rejected"
                );
                return Err(e);
            }
        };

        Ok(self.apply_transformed(command.action(), transformed))
    }

    /// Append a link block for a freshly created child document
    pub fn append_link(&mut self, link: Block) -> Result<CommandReport, EditorError> {
        self.settle();
        let transformed = commands::append(self.store.blocks(), link)?;
        Ok(self.apply_transformed("CREATE_LINKED_DOCUMENT", transformed))
    }

    fn apply_transformed(&mut self, action: &'static str, transformed: Transformed) -> CommandReport {
        let Transformed { blocks, affected } = transformed;

        if !DocumentStore::equals(self.store.blocks(), &blocks) {
            self.commit(blocks);
            self.settle();
        }

        info!(
            document_id = %self.document().id,
            action,
            affected = affected.len(),
            version = self.version(),
            "Command applied"
        );

        CommandReport {
            action,
            affected: affected.len(),
            block_ids: affected,
            version: self.version(),
        }
    }

    /// Step back one history entry. A no-op report when there is nothing to undo.
    pub fn undo(&mut self) -> CommandReport {
        self.settle();
        let restored = self.history.undo(self.store.snapshot());
        self.replay("UNDO", restored)
    }

    /// Step forward one history entry
    pub fn redo(&mut self) -> CommandReport {
        self.settle();
        let restored = self.history.redo(self.store.snapshot());
        self.replay("REDO", restored)
    }

    fn replay(&mut self, action: &'static str, restored: Option<Snapshot>) -> CommandReport {
        let affected = match restored {
            Some(snapshot) => {
                let count = snapshot.len();
                let previous = self.store.restore(snapshot);
                self.classifier
                    .observe(&previous, self.store.blocks(), &mut self.history);
                info!(
                    document_id = %self.document().id,
                    action,
                    undo_levels = self.history.undo_levels(),
                    redo_levels = self.history.redo_levels(),
                    "History replayed"
                );
                count
            }
            None => 0,
        };

        CommandReport {
            action,
            affected,
            block_ids: Vec::new(),
            version: self.version(),
        }
    }

    fn commit(&mut self, blocks: Vec<Block>) -> ChangeKind {
        let previous = self.store.replace(blocks);
        self.classifier
            .observe(&previous, self.store.blocks(), &mut self.history)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo() || self.classifier.is_pending()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn persisted_history(&self) -> PersistedHistory {
        self.history.to_persisted()
    }

    pub fn restore_history(&mut self, persisted: PersistedHistory) {
        self.classifier.reset();
        self.history.restore_persisted(persisted);
    }

    pub fn clear_history(&mut self) {
        self.classifier.reset();
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Target;
    use folio_schema::{BlockType, TextRun};

    fn engine() -> Engine {
        let mut doc = Document::new("doc-1", "Title");
        doc.blocks = std::sync::Arc::new(vec![
            Block::heading("Title", 1).with_id("h"),
            Block::paragraph("body").with_id("p"),
        ]);
        Engine::new(doc, EngineOptions::default())
    }

    #[test]
    fn test_identical_content_is_ignored() {
        let mut engine = engine();
        let same = engine.blocks().to_vec();
        assert_eq!(engine.content_changed(same), ChangeKind::None);
        assert_eq!(engine.version(), 0);
    }

    #[test]
    fn test_command_records_history_immediately() {
        let mut engine = engine();
        engine
            .execute(&Command::DeleteBlocks {
                target: Target::ids(["p"]),
            })
            .unwrap();

        assert_eq!(engine.history().undo_levels(), 1);
        assert!(!engine.has_pending_change());

        engine.undo();
        assert_eq!(engine.blocks().len(), 2);
        assert!(engine.can_redo());
    }

    #[test]
    fn test_undo_settles_pending_window() {
        let mut engine = engine();
        let mut next = engine.blocks().to_vec();
        next.push(Block::paragraph("new").with_id("n"));
        assert_eq!(engine.content_changed(next), ChangeKind::Major);
        assert!(engine.can_undo());

        let report = engine.undo();
        assert_eq!(report.affected, 2);
        assert_eq!(engine.blocks().len(), 2);
    }

    #[test]
    fn test_minor_edits_are_not_undoable() {
        let mut engine = engine();
        let mut next = engine.blocks().to_vec();
        next[1].content = vec![TextRun::plain("body text")];
        assert_eq!(engine.content_changed(next), ChangeKind::Minor);
        engine.settle();
        assert!(!engine.can_undo());
    }

    #[test]
    fn test_rejected_command_keeps_state() {
        let mut engine = engine();
        let result = engine.execute(&Command::ModifyBlockType {
            target: Target::ids(["p"]),
            new_type: BlockType::Link,
            level: None,
            checked: None,
        });

        assert!(matches!(result, Err(EditorError::Validation(_))));
        assert_eq!(engine.version(), 0);
        assert_eq!(engine.blocks()[1].block_type, BlockType::Paragraph);

        let outcome = CommandOutcome::from_result(&result);
        assert!(!outcome.success);
        assert!(outcome.reason.is_some());
    }

    #[test]
    fn test_linked_document_requires_session() {
        let mut engine = engine();
        let result = engine.execute(&Command::CreateLinkedDocument {
            title: "Child".to_string(),
            icon: None,
        });
        assert!(matches!(result, Err(EditorError::RequiresStorage { .. })));
    }
}
