//! # Folio Workspace
//!
//! Async plumbing around the editor engine: storage backends, debounced
//! persistence and the per-document session actor.
//!
//! ```rust,ignore
//! let storage = Arc::new(FsStorage::new("./pages"));
//! let sessions = DocumentSession::new(storage.clone(), storage, EngineConfig::default());
//!
//! let session = sessions.open("groceries").await?;
//! session.execute(Command::insert_text("Buy milk")).await?;
//! session.close().await?;
//! ```

pub mod config;
pub mod errors;
pub mod interpreter;
pub mod scheduler;
pub mod session;
pub mod storage;
pub mod surface;

pub use config::{ConfigError, EngineConfig, DEFAULT_CONFIG_NAME};
pub use errors::{InterpreterError, StorageError, WorkspaceError, WorkspaceResult};
pub use interpreter::{resolve_interpretation, CommandInterpreter, FixedInterpreter};
pub use scheduler::SchedulerHandle;
pub use session::{DocumentSession, SessionHandle, SessionStatus, UtteranceOutcome};
pub use storage::{FsStorage, HistoryStore, MemoryStorage, Storage};
pub use surface::{BufferSurface, EditorSurface};
