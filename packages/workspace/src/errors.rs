//! Error types for storage, interpretation and sessions

use folio_editor::EditorError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Invalid document id: {0:?}")]
    InvalidId(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterpreterError {
    #[error("Interpreter unavailable: {0}")]
    Unavailable(String),

    #[error("Interpreter returned unusable output: {0}")]
    InvalidOutput(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkspaceError {
    #[error("Persistence error: {0}")]
    Persistence(#[from] StorageError),

    #[error("Interpreter error: {0}")]
    Interpreter(#[from] InterpreterError),

    #[error(transparent)]
    Editor(#[from] EditorError),

    #[error("Document session is closed")]
    SessionClosed,
}

pub type WorkspaceResult<T> = Result<T, WorkspaceError>;
