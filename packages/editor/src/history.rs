//! # Undo/Redo History
//!
//! Snapshot-based history of committed document states.
//!
//! ## Design
//!
//! - Each entry is a whole-document [`Snapshot`] taken before a change
//! - Undo pushes the current state onto the redo stack and returns the top
//!   undo entry; redo is the mirror image
//! - Recording a new entry clears the redo stack
//! - Restoring a snapshot raises a one-shot replay flag so the commit of the
//!   restored state is not itself recorded as a new change
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut history = History::new();
//! history.record(store.snapshot());
//! let previous = store.replace(next_blocks);
//!
//! if let Some(snapshot) = history.undo(store.snapshot()) {
//!     store.restore(snapshot);
//! }
//! ```

use crate::document::Snapshot;
use folio_schema::Block;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Undo/redo stacks of document snapshots
#[derive(Debug, Default)]
pub struct History {
    /// Most recent last
    undo_stack: Vec<Snapshot>,

    /// Most recent last
    redo_stack: Vec<Snapshot>,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,

    /// Set while an undo/redo result is being committed
    replaying: bool,
}

impl History {
    /// Unbounded history
    pub fn new() -> Self {
        Self::with_max_levels(0)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
            replaying: false,
        }
    }

    /// Record the state that preceded a change
    pub fn record(&mut self, previous: Snapshot) {
        self.undo_stack.push(previous);

        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            let excess = self.undo_stack.len() - self.max_levels;
            self.undo_stack.drain(..excess);
        }

        self.redo_stack.clear();
    }

    /// Step back. `current` goes onto the redo stack.
    pub fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let snapshot = self.undo_stack.pop()?;
        self.redo_stack.push(current);
        self.replaying = true;
        Some(snapshot)
    }

    /// Step forward. `current` goes back onto the undo stack.
    pub fn redo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let snapshot = self.redo_stack.pop()?;
        self.undo_stack.push(current);
        self.replaying = true;
        Some(snapshot)
    }

    /// Consume the replay flag
    pub fn take_replaying(&mut self) -> bool {
        std::mem::take(&mut self.replaying)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.replaying = false;
    }

    /// Serializable copy of both stacks
    pub fn to_persisted(&self) -> PersistedHistory {
        PersistedHistory {
            undo: self.undo_stack.iter().map(|s| s.as_ref().clone()).collect(),
            redo: self.redo_stack.iter().map(|s| s.as_ref().clone()).collect(),
        }
    }

    /// Rebuild from a persisted copy, honoring this history's level limit
    pub fn restore_persisted(&mut self, persisted: PersistedHistory) {
        self.clear();
        self.undo_stack = persisted.undo.into_iter().map(Arc::new).collect();
        self.redo_stack = persisted.redo.into_iter().map(Arc::new).collect();

        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            let excess = self.undo_stack.len() - self.max_levels;
            self.undo_stack.drain(..excess);
        }
    }
}

/// On-disk form of a document's history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedHistory {
    #[serde(default)]
    pub undo: Vec<Vec<Block>>,
    #[serde(default)]
    pub redo: Vec<Vec<Block>>,
}

impl PersistedHistory {
    pub fn is_empty(&self) -> bool {
        self.undo.is_empty() && self.redo.is_empty()
    }
}
