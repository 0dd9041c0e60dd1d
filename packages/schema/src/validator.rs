//! # Block Validator
//!
//! Structural checks for blocks and documents. Validation is pure and total:
//! every entry point returns the first violated rule instead of panicking.
//!
//! Two representations are checked:
//! - **Untrusted JSON** (`check_value`, `check_document_value`): shape rules
//!   such as missing fields, unknown types and wrong JSON kinds, followed by
//!   the typed rules.
//! - **Typed blocks** (`validate`, `validate_document`): type-specific
//!   required props, link content rules, id uniqueness.

use crate::block::{Block, BlockType, PROP_CHECKED, PROP_LEVEL, PROP_TARGET_ID};
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

/// First rule a block or document violates
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Violation {
    #[error("Expected a JSON object for block at index {index}")]
    NotAnObject { index: usize },

    #[error("Expected a JSON array of blocks")]
    NotAnArray,

    #[error("Block {id:?} is missing required field `{field}`")]
    MissingField { id: String, field: &'static str },

    #[error("Block {id:?} has field `{field}` of the wrong kind")]
    WrongKind { id: String, field: &'static str },

    #[error("Block {id:?} has unknown type `{name}`")]
    UnknownType { id: String, name: String },

    #[error("Block has an empty id")]
    EmptyId,

    #[error("Duplicate block id {0:?}")]
    DuplicateId(String),

    #[error("Link block {0:?} must not carry inline content")]
    LinkHasContent(String),

    #[error("Link block {0:?} must not have children")]
    LinkHasChildren(String),

    #[error("Link block {0:?} has no targetId")]
    MissingLinkTarget(String),

    #[error("Heading {0:?} must define level 1, 2 or 3")]
    InvalidHeadingLevel(String),

    #[error("Checklist item {0:?} must define a boolean `checked`")]
    InvalidChecked(String),

    #[error("Block {0:?} has no content runs")]
    EmptyContent(String),

    #[error("Document has no blocks")]
    EmptyDocument,

    #[error("Block {id:?} could not be decoded: {reason}")]
    Malformed { id: String, reason: String },
}

/// Validate a single typed block and its descendants
pub fn validate(block: &Block) -> Result<(), Violation> {
    if block.id.is_empty() {
        return Err(Violation::EmptyId);
    }

    match block.block_type {
        BlockType::Link => {
            if !block.content.is_empty() {
                return Err(Violation::LinkHasContent(block.id.clone()));
            }
            if !block.children.is_empty() {
                return Err(Violation::LinkHasChildren(block.id.clone()));
            }
            let has_target = block
                .prop_str(PROP_TARGET_ID)
                .map(|t| !t.is_empty())
                .unwrap_or(false);
            if !has_target {
                return Err(Violation::MissingLinkTarget(block.id.clone()));
            }
        }
        _ => {
            if block.content.is_empty() {
                return Err(Violation::EmptyContent(block.id.clone()));
            }
        }
    }

    match block.block_type {
        BlockType::Heading => {
            let level_ok = block
                .props
                .get(PROP_LEVEL)
                .and_then(Value::as_u64)
                .map(|level| (1..=3).contains(&level))
                .unwrap_or(false);
            if !level_ok {
                return Err(Violation::InvalidHeadingLevel(block.id.clone()));
            }
        }
        BlockType::CheckListItem => {
            if !matches!(block.props.get(PROP_CHECKED), Some(Value::Bool(_))) {
                return Err(Violation::InvalidChecked(block.id.clone()));
            }
        }
        _ => {}
    }

    block.children.iter().try_for_each(validate)
}

/// Validate a whole document: at least one block, every block valid, ids
/// unique across the tree
pub fn validate_document(blocks: &[Block]) -> Result<(), Violation> {
    if blocks.is_empty() {
        return Err(Violation::EmptyDocument);
    }

    blocks.iter().try_for_each(validate)?;

    match first_duplicate(blocks, &mut HashSet::new()) {
        Some(id) => Err(Violation::DuplicateId(id.to_string())),
        None => Ok(()),
    }
}

fn first_duplicate<'a>(blocks: &'a [Block], seen: &mut HashSet<&'a str>) -> Option<&'a str> {
    for block in blocks {
        if !seen.insert(block.id.as_str()) {
            return Some(&block.id);
        }
        if let Some(id) = first_duplicate(&block.children, seen) {
            return Some(id);
        }
    }
    None
}

/// Boolean form of [`validate`]
pub fn is_valid(block: &Block) -> bool {
    validate(block).is_ok()
}

/// Boolean form of [`validate_document`]
pub fn is_valid_document(blocks: &[Block]) -> bool {
    validate_document(blocks).is_ok()
}

/// Check an untrusted JSON block: shape first, then typed rules
pub fn check_value(value: &Value) -> Result<Block, Violation> {
    check_shape(value, 0)?;
    let block: Block = serde_json::from_value(value.clone()).map_err(|e| Violation::Malformed {
        id: value_id(value),
        reason: e.to_string(),
    })?;
    validate(&block)?;
    Ok(block)
}

/// Check an untrusted JSON document (array of blocks)
pub fn check_document_value(value: &Value) -> Result<Vec<Block>, Violation> {
    let items = value.as_array().ok_or(Violation::NotAnArray)?;
    for (index, item) in items.iter().enumerate() {
        check_shape(item, index)?;
    }

    let blocks: Vec<Block> =
        serde_json::from_value(value.clone()).map_err(|e| Violation::Malformed {
            id: String::new(),
            reason: e.to_string(),
        })?;
    validate_document(&blocks)?;
    Ok(blocks)
}

fn value_id(value: &Value) -> String {
    value
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn check_shape(value: &Value, index: usize) -> Result<(), Violation> {
    let object = value.as_object().ok_or(Violation::NotAnObject { index })?;
    let id = value_id(value);

    match object.get("id") {
        None => return Err(Violation::MissingField { id, field: "id" }),
        Some(Value::String(_)) => {}
        Some(_) => return Err(Violation::WrongKind { id, field: "id" }),
    }

    let block_type = match object.get("type") {
        None => return Err(Violation::MissingField { id, field: "type" }),
        Some(Value::String(name)) => BlockType::from_name(name).ok_or_else(|| {
            Violation::UnknownType {
                id: id.clone(),
                name: name.clone(),
            }
        })?,
        Some(_) => return Err(Violation::WrongKind { id, field: "type" }),
    };

    match object.get("props") {
        None => return Err(Violation::MissingField { id, field: "props" }),
        Some(Value::Object(_)) => {}
        Some(_) => return Err(Violation::WrongKind { id, field: "props" }),
    }

    let children = match object.get("children") {
        None => return Err(Violation::MissingField { id, field: "children" }),
        Some(Value::Array(children)) => children,
        Some(_) => return Err(Violation::WrongKind { id, field: "children" }),
    };

    match object.get("content") {
        None if block_type != BlockType::Link => {
            return Err(Violation::MissingField { id, field: "content" })
        }
        None | Some(Value::Array(_)) => {}
        Some(_) => return Err(Violation::WrongKind { id, field: "content" }),
    }

    for (child_index, child) in children.iter().enumerate() {
        check_shape(child, child_index)?;
    }

    Ok(())
}
