//! # Sanitizer
//!
//! Repairs possibly-malformed documents (loaded from storage after a schema
//! change, emitted by the editing surface, or empty) into block sequences that
//! pass [`validate_document`](crate::validate_document).
//!
//! Sanitizing is idempotent: `sanitize(sanitize(x)) == sanitize(x)`.

use crate::block::{
    Block, BlockType, Props, Styles, TextRun, PROP_CHECKED, PROP_LEVEL, PROP_TARGET_ICON,
    PROP_TARGET_ID, PROP_TARGET_TITLE, STANDARD_PROPS,
};
use crate::ids::{new_block_id, placeholder_target_id};
use serde_json::{Map, Value};
use std::collections::HashSet;

pub const DEFAULT_LINK_TITLE: &str = "Untitled";
pub const DEFAULT_LINK_ICON: &str = "📄";

/// Legacy link prop names and the keys they migrate to
const LEGACY_LINK_PROPS: [(&str, &str); 3] = [
    ("pageId", PROP_TARGET_ID),
    ("pageTitle", PROP_TARGET_TITLE),
    ("pageIcon", PROP_TARGET_ICON),
];

/// Sanitize an untrusted JSON document.
///
/// Anything that is not an array, or an array with no usable blocks, becomes a
/// single level-1 heading titled `fallback_title`.
pub fn sanitize(raw: &Value, fallback_title: &str) -> Vec<Block> {
    let mut ids = HashSet::new();
    let blocks = match raw {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| decode_block(item))
            .map(|block| normalize_block(block, &mut ids))
            .collect(),
        _ => Vec::new(),
    };

    or_title_heading(blocks, fallback_title)
}

/// Apply the same repairs to typed blocks (e.g. from the editing surface)
pub fn normalize(blocks: Vec<Block>, fallback_title: &str) -> Vec<Block> {
    let mut ids = HashSet::new();
    let blocks = blocks
        .into_iter()
        .map(|block| normalize_block(block, &mut ids))
        .collect();

    or_title_heading(blocks, fallback_title)
}

fn or_title_heading(blocks: Vec<Block>, fallback_title: &str) -> Vec<Block> {
    if blocks.is_empty() {
        vec![Block::heading(fallback_title, 1)]
    } else {
        blocks
    }
}

/// Leniently decode one JSON entry. Bare strings become paragraphs; other
/// non-object entries cannot be repaired and are dropped.
fn decode_block(value: &Value) -> Option<Block> {
    match value {
        Value::String(text) => Some(Block::paragraph(text.as_str()).with_id("")),
        Value::Object(map) => Some(decode_object(map)),
        _ => None,
    }
}

fn decode_object(map: &Map<String, Value>) -> Block {
    let block_type = map
        .get("type")
        .and_then(Value::as_str)
        .and_then(BlockType::from_name)
        .unwrap_or(BlockType::Paragraph);

    let id = map
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let props = map
        .get("props")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let content = match map.get("content") {
        Some(Value::Array(runs)) => runs.iter().map(decode_run).collect(),
        Some(Value::String(text)) => vec![TextRun::plain(text.as_str())],
        _ => Vec::new(),
    };

    let children = match map.get("children") {
        Some(Value::Array(children)) => children.iter().filter_map(decode_block).collect(),
        _ => Vec::new(),
    };

    Block {
        id,
        block_type,
        props,
        content,
        children,
    }
}

/// Decode a content run; runs are coerced, never dropped
fn decode_run(value: &Value) -> TextRun {
    match value {
        Value::String(text) => TextRun::plain(text.as_str()),
        Value::Object(run) => {
            let text = run
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let flag = |name: &str| {
                run.get("styles")
                    .and_then(|styles| styles.get(name))
                    .and_then(Value::as_bool)
                    .unwrap_or(false)
            };
            TextRun {
                text,
                styles: Styles {
                    bold: flag("bold"),
                    italic: flag("italic"),
                    underline: flag("underline"),
                },
            }
        }
        _ => TextRun::default(),
    }
}

fn normalize_block(mut block: Block, ids: &mut HashSet<String>) -> Block {
    if block.id.is_empty() || ids.contains(&block.id) {
        block.id = new_block_id();
    }
    ids.insert(block.id.clone());

    if block.block_type == BlockType::Link {
        block.content.clear();
        block.children.clear();
        normalize_link_props(&mut block.props);
        return block;
    }

    for (key, default) in STANDARD_PROPS {
        if !block.props.contains_key(key) {
            block.props.insert(key.to_string(), Value::from(default));
        }
    }

    if block.content.is_empty() {
        block.content.push(TextRun::default());
    }

    match block.block_type {
        BlockType::Heading => {
            let level = normalize_level(block.props.get(PROP_LEVEL));
            block.props.insert(PROP_LEVEL.to_string(), Value::from(level));
        }
        BlockType::CheckListItem => {
            if !matches!(block.props.get(PROP_CHECKED), Some(Value::Bool(_))) {
                block.props.insert(PROP_CHECKED.to_string(), Value::Bool(false));
            }
        }
        _ => {}
    }

    block.children = std::mem::take(&mut block.children)
        .into_iter()
        .map(|child| normalize_block(child, ids))
        .collect();

    block
}

/// Numeric levels are clamped into 1..=3; anything else becomes 1
fn normalize_level(level: Option<&Value>) -> u64 {
    level
        .and_then(Value::as_f64)
        .map(|level| level.round().clamp(1.0, 3.0) as u64)
        .unwrap_or(1)
}

fn normalize_link_props(props: &mut Props) {
    for (legacy, current) in LEGACY_LINK_PROPS {
        if let Some(value) = props.remove(legacy) {
            props.entry(current.to_string()).or_insert(value);
        }
    }

    let target_id = match props.get(PROP_TARGET_ID) {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => placeholder_target_id(),
    };
    props.insert(PROP_TARGET_ID.to_string(), Value::from(target_id));

    for (key, default) in [
        (PROP_TARGET_TITLE, DEFAULT_LINK_TITLE),
        (PROP_TARGET_ICON, DEFAULT_LINK_ICON),
    ] {
        if !matches!(props.get(key), Some(Value::String(_))) {
            props.insert(key.to_string(), Value::from(default));
        }
    }
}
