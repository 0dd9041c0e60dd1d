//! Durable wire format shared with the storage backend.

use crate::block::Block;
use crate::sanitizer::sanitize;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A document as the storage backend sees it. `blocks_json` is a serialized
/// array of [`Block`]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDocument {
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub icon: Option<String>,

    #[serde(rename = "blocksJSON", default)]
    pub blocks_json: String,

    #[serde(default)]
    pub parent_id: Option<String>,

    pub updated_at: DateTime<Utc>,
}

impl RawDocument {
    /// Decode and sanitize the stored blocks. Unparseable JSON is treated like
    /// an empty document.
    pub fn decode_blocks(&self, untitled: &str) -> Vec<Block> {
        let raw: Value = serde_json::from_str(&self.blocks_json).unwrap_or(Value::Null);
        let title = if self.title.trim().is_empty() {
            untitled
        } else {
            self.title.as_str()
        };
        sanitize(&raw, title)
    }
}

/// Serialize blocks into the `blocksJSON` wire format
pub fn encode_blocks(blocks: &[Block]) -> Result<String, serde_json::Error> {
    serde_json::to_string(blocks)
}

/// Drop trailing blank blocks, always keeping the first block.
///
/// This is the block sequence storage actually receives.
pub fn trim_trailing_blank(blocks: &[Block]) -> &[Block] {
    let mut end = blocks.len();
    while end > 1 && blocks[end - 1].is_blank() {
        end -= 1;
    }
    &blocks[..end]
}

/// Canonical serialization used for structural comparison.
///
/// Props are sorted maps, so equal documents always serialize identically.
pub fn canonical_json(blocks: &[Block]) -> Result<String, serde_json::Error> {
    serde_json::to_string(blocks)
}

/// Deep structural equality by canonical serialization.
///
/// Blocks that fail to serialize never compare equal, so a save is not
/// skipped on their account.
pub fn structurally_equal(a: &[Block], b: &[Block]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    match (canonical_json(a), canonical_json(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockType;

    fn raw(blocks_json: &str) -> RawDocument {
        RawDocument {
            id: "doc-1".to_string(),
            title: "Groceries".to_string(),
            icon: None,
            blocks_json: blocks_json.to_string(),
            parent_id: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_wire_field_names() {
        let json = serde_json::to_value(raw("[]")).unwrap();
        assert!(json.get("blocksJSON").is_some());
        assert!(json.get("parentId").is_some());
        assert!(json.get("updatedAt").is_some());
    }

    #[test]
    fn test_garbage_json_decodes_to_title_heading() {
        let blocks = raw("{not json").decode_blocks("Untitled");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].block_type, BlockType::Heading);
        assert_eq!(blocks[0].plain_text(), "Groceries");
    }

    #[test]
    fn test_sanitized_blocks_round_trip_exactly() {
        let doc = raw(r#"[{"type":"checkListItem","id":"c1","content":["milk"]}]"#);
        let blocks = doc.decode_blocks("Untitled");
        let encoded = encode_blocks(&blocks).unwrap();
        let reloaded = raw(&encoded).decode_blocks("Untitled");
        assert_eq!(blocks, reloaded);
        assert_eq!(encode_blocks(&reloaded).unwrap(), encoded);
    }

    #[test]
    fn test_structural_equality_ignores_identity() {
        let a = vec![Block::paragraph("x").with_id("p1")];
        let b = vec![Block::paragraph("x").with_id("p1")];
        let c = vec![Block::paragraph("y").with_id("p1")];
        assert!(structurally_equal(&a, &b));
        assert!(!structurally_equal(&a, &c));
    }

    #[test]
    fn test_trim_keeps_first_block() {
        let blocks = vec![Block::empty_paragraph(), Block::empty_paragraph()];
        assert_eq!(trim_trailing_blank(&blocks).len(), 1);

        let blocks = vec![
            Block::paragraph("x"),
            Block::empty_paragraph(),
            Block::empty_paragraph(),
        ];
        assert_eq!(trim_trailing_blank(&blocks).len(), 1);
    }

    #[test]
    fn test_canonical_json_ignores_prop_insertion_order() {
        let a = vec![Block::paragraph("x")
            .with_id("p1")
            .with_prop("zeta", 1)
            .with_prop("alpha", 2)];
        let b = vec![Block::paragraph("x")
            .with_id("p1")
            .with_prop("alpha", 2)
            .with_prop("zeta", 1)];
        assert_eq!(canonical_json(&a).unwrap(), canonical_json(&b).unwrap());
    }
}
