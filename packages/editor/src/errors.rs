//! Error types for the editor

use folio_schema::Violation;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditorError {
    /// The candidate document failed validation and was discarded
    #[error("Validation error: {0}")]
    Validation(#[from] Violation),

    /// Target resolution found no blocks
    #[error("Could not determine which blocks to {action}")]
    NoTarget { action: &'static str },

    /// The command needs a collaborator the synchronous engine does not own
    #[error("{action} must be executed through a document session")]
    RequiresStorage { action: &'static str },

    #[error("Could not decode command: {0}")]
    Decode(String),
}
