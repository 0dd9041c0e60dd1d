use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::ids::new_block_id;

/// Type-dependent attribute map carried by every block.
///
/// Backed by `serde_json::Map`, which keeps keys sorted so serialization is
/// canonical.
pub type Props = Map<String, Value>;

pub const PROP_LEVEL: &str = "level";
pub const PROP_CHECKED: &str = "checked";
pub const PROP_TARGET_ID: &str = "targetId";
pub const PROP_TARGET_TITLE: &str = "targetTitle";
pub const PROP_TARGET_ICON: &str = "targetIcon";
pub const PROP_TEXT_COLOR: &str = "textColor";
pub const PROP_BACKGROUND_COLOR: &str = "backgroundColor";
pub const PROP_TEXT_ALIGNMENT: &str = "textAlignment";

/// Standard props every non-link block carries, with their defaults
pub const STANDARD_PROPS: [(&str, &str); 3] = [
    (PROP_TEXT_COLOR, "default"),
    (PROP_BACKGROUND_COLOR, "default"),
    (PROP_TEXT_ALIGNMENT, "left"),
];

/// Closed set of block kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockType {
    Paragraph,
    Heading,
    BulletListItem,
    NumberedListItem,
    CheckListItem,
    Quote,
    Code,
    Link,
}

impl BlockType {
    pub const ALL: [BlockType; 8] = [
        BlockType::Paragraph,
        BlockType::Heading,
        BlockType::BulletListItem,
        BlockType::NumberedListItem,
        BlockType::CheckListItem,
        BlockType::Quote,
        BlockType::Code,
        BlockType::Link,
    ];

    /// Wire name, as stored in `blocksJSON`
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Paragraph => "paragraph",
            BlockType::Heading => "heading",
            BlockType::BulletListItem => "bulletListItem",
            BlockType::NumberedListItem => "numberedListItem",
            BlockType::CheckListItem => "checkListItem",
            BlockType::Quote => "quote",
            BlockType::Code => "code",
            BlockType::Link => "link",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == name)
    }

    /// The prop this type cannot exist without, if any
    pub fn required_prop(&self) -> Option<&'static str> {
        match self {
            BlockType::Heading => Some(PROP_LEVEL),
            BlockType::CheckListItem => Some(PROP_CHECKED),
            BlockType::Link => Some(PROP_TARGET_ID),
            _ => None,
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inline style flags of a text run. Only set flags are serialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Styles {
    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub underline: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Styles {
    pub fn is_plain(&self) -> bool {
        !self.bold && !self.italic && !self.underline
    }
}

/// A run of inline text sharing one set of styles
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    #[serde(default, deserialize_with = "nullable_text")]
    pub text: String,
    #[serde(default)]
    pub styles: Styles,
}

/// Undefined or null run text becomes an empty string instead of failing.
fn nullable_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl TextRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            styles: Styles::default(),
        }
    }
}

/// The atomic unit of document content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,

    #[serde(rename = "type")]
    pub block_type: BlockType,

    #[serde(default)]
    pub props: Props,

    #[serde(default)]
    pub content: Vec<TextRun>,

    #[serde(default)]
    pub children: Vec<Block>,
}

impl Block {
    /// Create a block with a fresh id and the standard props filled in
    pub fn new(block_type: BlockType, content: Vec<TextRun>) -> Self {
        let mut props = Props::new();
        if block_type != BlockType::Link {
            for (key, default) in STANDARD_PROPS {
                props.insert(key.to_string(), Value::from(default));
            }
        }

        Self {
            id: new_block_id(),
            block_type,
            props,
            content,
            children: Vec::new(),
        }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::new(BlockType::Paragraph, vec![TextRun::plain(text)])
    }

    /// An empty paragraph: one empty text run
    pub fn empty_paragraph() -> Self {
        Self::new(BlockType::Paragraph, vec![TextRun::default()])
    }

    pub fn heading(text: impl Into<String>, level: u8) -> Self {
        let mut block = Self::new(BlockType::Heading, vec![TextRun::plain(text)]);
        block
            .props
            .insert(PROP_LEVEL.to_string(), Value::from(level.clamp(1, 3)));
        block
    }

    /// A link block pointing at another document
    pub fn link(
        target_id: impl Into<String>,
        target_title: impl Into<String>,
        target_icon: impl Into<String>,
    ) -> Self {
        let mut block = Self::new(BlockType::Link, Vec::new());
        block
            .props
            .insert(PROP_TARGET_ID.to_string(), Value::from(target_id.into()));
        block
            .props
            .insert(PROP_TARGET_TITLE.to_string(), Value::from(target_title.into()));
        block
            .props
            .insert(PROP_TARGET_ICON.to_string(), Value::from(target_icon.into()));
        block
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_prop(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.props.insert(key.to_string(), value.into());
        self
    }

    pub fn with_children(mut self, children: Vec<Block>) -> Self {
        self.children = children;
        self
    }

    pub fn is_link(&self) -> bool {
        self.block_type == BlockType::Link
    }

    pub fn prop_str(&self, key: &str) -> Option<&str> {
        self.props.get(key).and_then(Value::as_str)
    }

    pub fn heading_level(&self) -> Option<u64> {
        self.props.get(PROP_LEVEL).and_then(Value::as_u64)
    }

    /// A block whose sole content is a single empty text run
    pub fn is_blank(&self) -> bool {
        !self.is_link()
            && self.children.is_empty()
            && self.content.len() == 1
            && self.content[0].text.is_empty()
    }

    /// Concatenated text of this block's own runs
    pub fn plain_text(&self) -> String {
        self.content.iter().map(|run| run.text.as_str()).collect()
    }
}

/// Visit every block in the tree, depth first, parents before children
pub fn visit_blocks<'a>(blocks: &'a [Block], f: &mut impl FnMut(&'a Block)) {
    for block in blocks {
        f(block);
        visit_blocks(&block.children, f);
    }
}

/// Mutable counterpart of [`visit_blocks`]
pub fn visit_blocks_mut(blocks: &mut [Block], f: &mut impl FnMut(&mut Block)) {
    for block in blocks.iter_mut() {
        f(block);
        visit_blocks_mut(&mut block.children, f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_type_names_round_trip() {
        for block_type in BlockType::ALL {
            assert_eq!(BlockType::from_name(block_type.as_str()), Some(block_type));
            let json = serde_json::to_string(&block_type).unwrap();
            assert_eq!(json, format!("\"{}\"", block_type.as_str()));
        }
        assert_eq!(BlockType::from_name("table"), None);
    }

    #[test]
    fn test_null_text_becomes_empty() {
        let run: TextRun = serde_json::from_str(r#"{"text": null}"#).unwrap();
        assert_eq!(run.text, "");
        let run: TextRun = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(run.text, "");
    }

    #[test]
    fn test_styles_skip_unset_flags() {
        let run = TextRun {
            text: "hi".to_string(),
            styles: Styles {
                bold: true,
                ..Styles::default()
            },
        };
        let json = serde_json::to_string(&run).unwrap();
        assert_eq!(json, r#"{"text":"hi","styles":{"bold":true}}"#);
    }

    #[test]
    fn test_blank_detection() {
        assert!(Block::empty_paragraph().is_blank());
        assert!(!Block::paragraph("x").is_blank());
        assert!(!Block::link("p2", "Roadmap", "📄").is_blank());
    }

    #[test]
    fn test_visit_reaches_nested_blocks() {
        let tree = vec![Block::paragraph("a")
            .with_id("a")
            .with_children(vec![Block::paragraph("b").with_id("b")])];

        let mut seen = Vec::new();
        visit_blocks(&tree, &mut |b| seen.push(b.id.clone()));
        assert_eq!(seen, vec!["a", "b"]);
    }
}
