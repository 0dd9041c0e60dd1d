pub mod check;
pub mod edit;
pub mod init;
pub mod show;

pub use check::{sanitize, validate, SanitizeArgs, ValidateArgs};
pub use edit::{apply, delete, history, link, ApplyArgs, DeleteArgs, HistoryArgs, HistoryStep, LinkArgs};
pub use init::{init, InitArgs};
pub use show::{children, show, ChildrenArgs, ShowArgs};

use anyhow::{anyhow, Result};
use folio_schema::RawDocument;
use folio_workspace::{DocumentSession, EngineConfig, FsStorage, Storage};
use std::path::PathBuf;
use std::sync::Arc;

/// Store root, loaded config and the storage backend shared by commands
pub struct Context {
    pub root: PathBuf,
    pub config: EngineConfig,
    storage: Arc<FsStorage>,
}

impl Context {
    pub fn new(root: PathBuf, config: EngineConfig) -> Self {
        let storage = Arc::new(FsStorage::new(root.clone()));
        Self {
            root,
            config,
            storage,
        }
    }

    pub fn storage(&self) -> &FsStorage {
        &self.storage
    }

    pub fn sessions(&self) -> DocumentSession {
        DocumentSession::new(
            self.storage.clone(),
            self.storage.clone(),
            self.config.clone(),
        )
    }

    /// Load a stored document, failing when it does not exist
    pub async fn load(&self, id: &str) -> Result<RawDocument> {
        self.storage
            .load(id)
            .await?
            .ok_or_else(|| anyhow!("No document with id {id} in {}", self.root.display()))
    }
}
