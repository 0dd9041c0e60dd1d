//! # Document Commands
//!
//! The closed vocabulary of structured edits, shared by direct user actions
//! and the external command interpreter.
//!
//! ## Design Principles
//!
//! 1. **Intent-preserving**: each command names one semantic operation
//! 2. **Addressed**: targets resolve by explicit ids, by block type, or by
//!    position (`first`/`last`, optionally filtered by type)
//! 3. **Atomic**: transforms run on a copy and the candidate is validated
//!    before anything is committed
//!
//! ## Wire shape
//!
//! ```json
//! {"action": "DELETE_BLOCKS", "target": {"blockIds": ["b1"]}}
//! {"action": "MODIFY_BLOCK_TYPE", "target": {"blockType": "bulletListItem"}, "newType": "checkListItem"}
//! {"action": "APPLY_FORMATTING", "target": {"position": {"at": "last"}}, "style": "bold"}
//! {"action": "INSERT_CONTENT", "content": "Buy milk"}
//! ```

use crate::errors::EditorError;
use folio_schema::{
    check_value, new_block_id, validate_document, visit_blocks, visit_blocks_mut, Block,
    BlockType, Styles, PROP_CHECKED, PROP_LEVEL,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Structured mutation intents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    /// Append blocks, or a plain string wrapped in a paragraph
    InsertContent { content: InsertPayload },

    /// Remove every targeted block (and its descendants)
    DeleteBlocks { target: Target },

    /// Retype targets, backfilling the new type's required prop
    ModifyBlockType {
        target: Target,
        #[serde(rename = "newType")]
        new_type: BlockType,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        level: Option<u8>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        checked: Option<bool>,
    },

    /// Set or clear a style on every run of every target
    ApplyFormatting {
        target: Target,
        style: FormatStyle,
        #[serde(default = "enabled_by_default")]
        enabled: bool,
    },

    /// Create a child document and append a link to it
    CreateLinkedDocument {
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        icon: Option<String>,
    },

    Undo,
    Redo,
}

fn enabled_by_default() -> bool {
    true
}

impl Command {
    /// Wire name of the command
    pub fn action(&self) -> &'static str {
        match self {
            Command::InsertContent { .. } => "INSERT_CONTENT",
            Command::DeleteBlocks { .. } => "DELETE_BLOCKS",
            Command::ModifyBlockType { .. } => "MODIFY_BLOCK_TYPE",
            Command::ApplyFormatting { .. } => "APPLY_FORMATTING",
            Command::CreateLinkedDocument { .. } => "CREATE_LINKED_DOCUMENT",
            Command::Undo => "UNDO",
            Command::Redo => "REDO",
        }
    }

    pub fn insert_text(text: impl Into<String>) -> Self {
        Command::InsertContent {
            content: InsertPayload::Text(text.into()),
        }
    }
}

/// Content to insert: untrusted block JSON or unstructured text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InsertPayload {
    Text(String),
    Blocks(Vec<Value>),
}

/// How a command addresses its blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Target {
    BlockIds(Vec<String>),
    BlockType(BlockType),
    Position {
        at: Position,
        #[serde(default, rename = "blockType", skip_serializing_if = "Option::is_none")]
        block_type: Option<BlockType>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    First,
    Last,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FormatStyle {
    Bold,
    Italic,
    Underline,
    #[serde(alias = "clearAll")]
    Clear,
}

impl Target {
    pub fn ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Target::BlockIds(ids.into_iter().map(Into::into).collect())
    }

    /// Resolve to block ids in document order.
    ///
    /// Ids and types match anywhere in the tree; positions address top-level
    /// blocks only.
    pub fn resolve(&self, blocks: &[Block]) -> Vec<String> {
        let mut resolved = Vec::new();

        match self {
            Target::BlockIds(ids) => {
                let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
                visit_blocks(blocks, &mut |block: &Block| {
                    if wanted.contains(block.id.as_str()) {
                        resolved.push(block.id.clone());
                    }
                });
            }
            Target::BlockType(block_type) => {
                visit_blocks(blocks, &mut |block: &Block| {
                    if block.block_type == *block_type {
                        resolved.push(block.id.clone());
                    }
                });
            }
            Target::Position { at, block_type } => {
                let mut candidates = blocks
                    .iter()
                    .filter(|block| block_type.map_or(true, |t| block.block_type == t));
                let found = match at {
                    Position::First => candidates.next(),
                    Position::Last => candidates.last(),
                };
                resolved.extend(found.map(|block| block.id.clone()));
            }
        }

        resolved
    }
}

/// Knobs for the pure transforms
#[derive(Debug, Clone, Copy)]
pub struct TransformOptions {
    /// Heading level used when converting to a heading without one
    pub default_heading_level: u8,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            default_heading_level: 2,
        }
    }
}

/// A validated candidate document produced by a command
#[derive(Debug, Clone)]
pub struct Transformed {
    pub blocks: Vec<Block>,
    /// Ids of the blocks the command touched (or created)
    pub affected: Vec<String>,
}

/// Resolve → transform a copy → validate. Nothing is committed here.
///
/// History and linking commands are not pure transforms and are rejected;
/// the engine and the document session handle them.
pub fn transform(
    command: &Command,
    blocks: &[Block],
    options: TransformOptions,
) -> Result<Transformed, EditorError> {
    let mut candidate = blocks.to_vec();

    let affected = match command {
        Command::InsertContent { content } => {
            let inserted = decode_insert(content)?;
            let ids = inserted.iter().map(|b| b.id.clone()).collect();
            candidate.extend(inserted);
            ids
        }

        Command::DeleteBlocks { target } => {
            let ids = target.resolve(blocks);
            if ids.is_empty() {
                return Err(EditorError::NoTarget { action: "delete" });
            }
            let doomed: HashSet<&str> = ids.iter().map(String::as_str).collect();
            remove_blocks(&mut candidate, &doomed);
            if candidate.is_empty() {
                candidate.push(Block::empty_paragraph());
            }
            ids
        }

        Command::ModifyBlockType {
            target,
            new_type,
            level,
            checked,
        } => {
            let ids = target.resolve(blocks);
            if ids.is_empty() {
                return Err(EditorError::NoTarget { action: "convert" });
            }
            let chosen: HashSet<&str> = ids.iter().map(String::as_str).collect();
            visit_blocks_mut(&mut candidate, &mut |block: &mut Block| {
                if chosen.contains(block.id.as_str()) {
                    retype(block, *new_type, *level, *checked, options);
                }
            });
            ids
        }

        Command::ApplyFormatting {
            target,
            style,
            enabled,
        } => {
            let ids = target.resolve(blocks);
            let chosen: HashSet<&str> = ids.iter().map(String::as_str).collect();
            visit_blocks_mut(&mut candidate, &mut |block: &mut Block| {
                if chosen.contains(block.id.as_str()) {
                    for run in &mut block.content {
                        apply_style(&mut run.styles, *style, *enabled);
                    }
                }
            });
            ids
        }

        Command::CreateLinkedDocument { .. } | Command::Undo | Command::Redo => {
            return Err(EditorError::RequiresStorage {
                action: command.action(),
            })
        }
    };

    validate_document(&candidate)?;

    Ok(Transformed {
        blocks: candidate,
        affected,
    })
}

/// Append an already-built block (e.g. a synthesized link) and validate
pub fn append(blocks: &[Block], block: Block) -> Result<Transformed, EditorError> {
    let affected = vec![block.id.clone()];
    let mut candidate = blocks.to_vec();
    candidate.push(block);
    validate_document(&candidate)?;
    Ok(Transformed {
        blocks: candidate,
        affected,
    })
}

/// Inserted content is new content: blocks without an id get a fresh one,
/// then each block must pass validation as-is
fn decode_insert(content: &InsertPayload) -> Result<Vec<Block>, EditorError> {
    match content {
        InsertPayload::Text(text) => Ok(vec![Block::paragraph(text.as_str())]),
        InsertPayload::Blocks(values) => values
            .iter()
            .map(|value| {
                let mut value = value.clone();
                assign_missing_ids(&mut value);
                check_value(&value).map_err(EditorError::from)
            })
            .collect(),
    }
}

fn assign_missing_ids(value: &mut Value) {
    if let Value::Object(map) = value {
        let has_id = map
            .get("id")
            .and_then(Value::as_str)
            .map(|id| !id.is_empty())
            .unwrap_or(false);
        if !has_id {
            map.insert("id".to_string(), Value::from(new_block_id()));
        }
        if let Some(Value::Array(children)) = map.get_mut("children") {
            children.iter_mut().for_each(assign_missing_ids);
        }
    }
}

fn remove_blocks(blocks: &mut Vec<Block>, doomed: &HashSet<&str>) {
    blocks.retain(|block| !doomed.contains(block.id.as_str()));
    for block in blocks.iter_mut() {
        remove_blocks(&mut block.children, doomed);
    }
}

fn retype(
    block: &mut Block,
    new_type: BlockType,
    level: Option<u8>,
    checked: Option<bool>,
    options: TransformOptions,
) {
    block.block_type = new_type;

    match new_type {
        BlockType::Heading => {
            let existing = block
                .heading_level()
                .filter(|level| (1..=3).contains(level));
            let level = match (level, existing) {
                (Some(level), _) => u64::from(level),
                (None, Some(existing)) => existing,
                (None, None) => u64::from(options.default_heading_level),
            };
            block.props.insert(PROP_LEVEL.to_string(), Value::from(level));
        }
        BlockType::CheckListItem => {
            let existing = block.props.get(PROP_CHECKED).and_then(Value::as_bool);
            let checked = checked.or(existing).unwrap_or(false);
            block.props.insert(PROP_CHECKED.to_string(), Value::Bool(checked));
        }
        _ => {}
    }
}

fn apply_style(styles: &mut Styles, style: FormatStyle, enabled: bool) {
    match style {
        FormatStyle::Bold => styles.bold = enabled,
        FormatStyle::Italic => styles.italic = enabled,
        FormatStyle::Underline => styles.underline = enabled,
        FormatStyle::Clear => *styles = Styles::default(),
    }
}

/// What the external interpreter asked for
#[derive(Debug, Clone, PartialEq)]
pub enum Interpretation {
    Command(Command),
    Clarification { message: String },
}

impl Interpretation {
    /// Decode untrusted interpreter JSON
    pub fn from_value(value: &Value) -> Result<Self, EditorError> {
        if value.get("action").and_then(Value::as_str) == Some("CLARIFICATION") {
            let message = value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            return Ok(Interpretation::Clarification { message });
        }

        serde_json::from_value(value.clone())
            .map(Interpretation::Command)
            .map_err(|e| EditorError::Decode(e.to_string()))
    }
}
