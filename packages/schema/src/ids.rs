use uuid::Uuid;

/// Prefix marking link targets synthesized by the sanitizer
pub const PLACEHOLDER_TARGET_PREFIX: &str = "missing-";

/// Generate a fresh block id
pub fn new_block_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generate a fresh document id
pub fn new_document_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Placeholder target for a link block that lost its `targetId`
pub fn placeholder_target_id() -> String {
    format!("{}{}", PLACEHOLDER_TARGET_PREFIX, Uuid::new_v4().simple())
}

pub fn is_placeholder_target(id: &str) -> bool {
    id.starts_with(PLACEHOLDER_TARGET_PREFIX)
}
