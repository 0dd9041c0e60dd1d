//! # Folio Schema
//!
//! The block data model shared by every Folio crate.
//!
//! - [`Block`]: typed content unit (paragraph, heading, list items, quote,
//!   code, cross-document link)
//! - Validator: pure structural checks that report the first violated rule
//! - Sanitizer: idempotent repair of malformed input into valid documents
//! - [`RawDocument`]: the durable wire format (`blocksJSON`)

pub mod block;
pub mod ids;
pub mod raw;
pub mod sanitizer;
pub mod validator;

pub use block::{
    visit_blocks, visit_blocks_mut, Block, BlockType, Props, Styles, TextRun, PROP_BACKGROUND_COLOR,
    PROP_CHECKED, PROP_LEVEL, PROP_TARGET_ICON, PROP_TARGET_ID, PROP_TARGET_TITLE,
    PROP_TEXT_ALIGNMENT, PROP_TEXT_COLOR, STANDARD_PROPS,
};
pub use ids::{new_block_id, new_document_id};
pub use raw::{
    canonical_json, encode_blocks, structurally_equal, trim_trailing_blank, RawDocument,
};
pub use sanitizer::{normalize, sanitize, DEFAULT_LINK_ICON, DEFAULT_LINK_TITLE};
pub use validator::{
    check_document_value, check_value, is_valid, is_valid_document, validate, validate_document,
    Violation,
};
