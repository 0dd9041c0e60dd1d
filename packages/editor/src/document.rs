//! # Document Store
//!
//! Holds the authoritative in-memory document for one editing session.
//!
//! Block sequences are shared as immutable [`Snapshot`]s. `replace` swaps in a
//! new snapshot and never touches the previous one, so history entries and
//! save snapshots can keep their `Arc` without copying.
//!
//! ## Lifecycle
//!
//! ```text
//! Load → Sanitize → Edit (commands, raw updates) → Flush → Discard
//!   ↓        ↓               ↓                       ↓
//! Raw     Blocks        New snapshots            RawDocument
//! ```

use chrono::{DateTime, Utc};
use folio_schema::{encode_blocks, structurally_equal, trim_trailing_blank, Block, RawDocument};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Immutable, shareable block sequence
pub type Snapshot = Arc<Vec<Block>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub title: String,
    pub icon: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// A document: its blocks plus metadata
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub parent_id: Option<String>,
    pub blocks: Snapshot,
    pub metadata: DocumentMetadata,
}

impl Document {
    /// A fresh document holding a single title heading
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            id: id.into(),
            parent_id: None,
            blocks: Arc::new(vec![Block::heading(title.as_str(), 1)]),
            metadata: DocumentMetadata {
                title,
                icon: None,
                updated_at: Utc::now(),
            },
        }
    }

    /// Decode a stored document, sanitizing its blocks
    pub fn from_raw(raw: &RawDocument, untitled: &str) -> Self {
        let title = if raw.title.trim().is_empty() {
            untitled.to_string()
        } else {
            raw.title.clone()
        };

        Self {
            id: raw.id.clone(),
            parent_id: raw.parent_id.clone(),
            blocks: Arc::new(raw.decode_blocks(untitled)),
            metadata: DocumentMetadata {
                title,
                icon: raw.icon.clone(),
                updated_at: raw.updated_at,
            },
        }
    }

    /// Encode with this document's own blocks
    pub fn to_raw(&self) -> Result<RawDocument, serde_json::Error> {
        self.to_raw_with(&self.blocks)
    }

    /// Encode metadata with an explicit block sequence (e.g. a trimmed copy)
    pub fn to_raw_with(&self, blocks: &[Block]) -> Result<RawDocument, serde_json::Error> {
        Ok(RawDocument {
            id: self.id.clone(),
            title: self.metadata.title.clone(),
            icon: self.metadata.icon.clone(),
            blocks_json: encode_blocks(blocks)?,
            parent_id: self.parent_id.clone(),
            updated_at: self.metadata.updated_at,
        })
    }
}

/// Owner of the current document and the last persisted snapshot
#[derive(Debug)]
pub struct DocumentStore {
    document: Document,

    /// Incremented on every committed replace
    version: u64,

    /// What the storage backend holds, as reported by the save path
    last_persisted: Option<Snapshot>,
}

impl DocumentStore {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            version: 0,
            last_persisted: None,
        }
    }

    pub fn get(&self) -> &Document {
        &self.document
    }

    pub fn blocks(&self) -> &[Block] {
        &self.document.blocks
    }

    pub fn snapshot(&self) -> Snapshot {
        self.document.blocks.clone()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Commit a new block sequence, returning the previous snapshot
    pub fn replace(&mut self, blocks: Vec<Block>) -> Snapshot {
        self.restore(Arc::new(blocks))
    }

    /// Commit an existing snapshot (history replay) without copying it
    pub fn restore(&mut self, snapshot: Snapshot) -> Snapshot {
        self.version += 1;
        self.document.metadata.updated_at = Utc::now();
        std::mem::replace(&mut self.document.blocks, snapshot)
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.document.metadata.title = title.into();
        self.document.metadata.updated_at = Utc::now();
    }

    /// Deep structural equality
    pub fn equals(a: &[Block], b: &[Block]) -> bool {
        structurally_equal(a, b)
    }

    /// Record a snapshot storage now holds (already trimmed)
    pub fn mark_persisted(&mut self, snapshot: Snapshot) {
        self.last_persisted = Some(snapshot);
    }

    pub fn last_persisted(&self) -> Option<&Snapshot> {
        self.last_persisted.as_ref()
    }

    /// Whether storage is behind the current blocks. Trailing blank blocks
    /// never reach storage, so they don't count.
    pub fn has_unsaved_changes(&self) -> bool {
        match &self.last_persisted {
            Some(persisted) => {
                !Self::equals(persisted, trim_trailing_blank(&self.document.blocks))
            }
            None => true,
        }
    }
}
