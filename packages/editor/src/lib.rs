//! # Folio Editor
//!
//! Core document editing engine for Folio.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ schema: Block model, validator, sanitizer   │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: in-memory document lifecycle        │
//! │  - Copy-on-write document store             │
//! │  - Atomic structured commands               │
//! │  - Minor/major change classification        │
//! │  - Snapshot undo/redo history               │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ workspace: storage, debounced saves,        │
//! │            per-document session actor       │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Blocks are the source of truth**: ids are stable join keys
//! 2. **Validate before commit**: a command either fully applies or leaves
//!    the document untouched
//! 3. **Snapshots are immutable**: history and save state share `Arc`s
//! 4. **Structure, not keystrokes**: only structural changes are undoable
//!
//! ## Usage
//!
//! ```rust,ignore
//! use folio_editor::{Command, Document, Engine, EngineOptions, Target};
//!
//! let mut engine = Engine::new(Document::new("doc-1", "Groceries"), EngineOptions::default());
//!
//! engine.execute(&Command::insert_text("Buy milk"))?;
//! engine.execute(&Command::DeleteBlocks { target: Target::ids(["b1"]) })?;
//!
//! engine.undo();
//! ```

mod classifier;
mod commands;
mod document;
mod engine;
mod errors;
mod history;

pub use classifier::{classify, ChangeClassifier, ChangeKind, Signature};
pub use commands::{
    append, transform, Command, FormatStyle, InsertPayload, Interpretation, Position, Target,
    TransformOptions, Transformed,
};
pub use document::{Document, DocumentMetadata, DocumentStore, Snapshot};
pub use engine::{CommandOutcome, CommandReport, Engine, EngineOptions};
pub use errors::EditorError;
pub use history::{History, PersistedHistory};
