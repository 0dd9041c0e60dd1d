//! # Change Classifier
//!
//! Decides which edits are undo-worthy.
//!
//! Typing inside a block is a **minor** change: it is saved but never gets its
//! own history entry. Adding, removing, retyping or restyling blocks is a
//! **major** change. The first major change of a burst opens a window holding
//! the pre-burst snapshot; when the window settles that snapshot becomes one
//! undo entry, however many changes the burst contained.
//!
//! ```text
//! change ─► classify ─► major? ─► open window (baseline = previous)
//!                          │
//!                          └─► minor: nothing to record
//!
//! quiet period / command / undo ─► settle ─► history.record(baseline)
//! ```

use crate::document::Snapshot;
use crate::history::History;
use folio_schema::{Block, BlockType, PROP_BACKGROUND_COLOR, PROP_TEXT_ALIGNMENT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    None,
    Minor,
    Major,
}

/// Structural fingerprint of one top-level block
#[derive(Debug, Clone, PartialEq, Eq)]
struct BlockSignature {
    block_type: BlockType,
    children: usize,
    level: Option<u64>,
    alignment: Option<String>,
    background: Option<String>,
}

/// Structural fingerprint of a block sequence. Text is deliberately absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    blocks: Vec<BlockSignature>,
}

impl Signature {
    pub fn of(blocks: &[Block]) -> Self {
        Self {
            blocks: blocks
                .iter()
                .map(|block| BlockSignature {
                    block_type: block.block_type,
                    children: block.children.len(),
                    level: block.heading_level(),
                    alignment: block.prop_str(PROP_TEXT_ALIGNMENT).map(str::to_string),
                    background: block.prop_str(PROP_BACKGROUND_COLOR).map(str::to_string),
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Classify the change from `previous` to `next`
pub fn classify(previous: &[Block], next: &[Block]) -> ChangeKind {
    if previous == next {
        ChangeKind::None
    } else if Signature::of(previous) != Signature::of(next) {
        ChangeKind::Major
    } else {
        ChangeKind::Minor
    }
}

/// Debounce window over major changes
#[derive(Debug, Default)]
pub struct ChangeClassifier {
    /// Snapshot preceding the first major change of the open window
    baseline: Option<Snapshot>,
}

impl ChangeClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe a committed change.
    ///
    /// A commit produced by undo/redo consumes the history's replay flag and
    /// never opens a window.
    pub fn observe(&mut self, previous: &Snapshot, next: &[Block], history: &mut History) -> ChangeKind {
        let kind = classify(previous, next);

        if history.take_replaying() {
            self.baseline = None;
            return kind;
        }

        if kind == ChangeKind::Major && self.baseline.is_none() {
            self.baseline = Some(previous.clone());
        }

        kind
    }

    /// Close the window, recording its baseline. Returns whether an entry was
    /// recorded.
    pub fn settle(&mut self, history: &mut History) -> bool {
        match self.baseline.take() {
            Some(baseline) => {
                history.record(baseline);
                true
            }
            None => false,
        }
    }

    /// Whether a major change is waiting for its window to settle
    pub fn is_pending(&self) -> bool {
        self.baseline.is_some()
    }

    /// Drop an open window without recording it
    pub fn reset(&mut self) {
        self.baseline = None;
    }
}
