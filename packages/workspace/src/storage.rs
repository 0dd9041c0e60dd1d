//! # Storage Backends
//!
//! Durable homes for documents and their undo history.
//!
//! - [`MemoryStorage`]: in-process maps. Can delay and fail writes, and
//!   records how many saves per document overlapped, which is what the
//!   scheduler tests assert on.
//! - [`FsStorage`]: one `<id>.json` per document plus `<id>.history.json`
//!   under a root directory. Writes go through a temp file and a rename.

use crate::errors::StorageError;
use async_trait::async_trait;
use folio_editor::PersistedHistory;
use folio_schema::RawDocument;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

/// Document persistence
#[async_trait]
pub trait Storage: Send + Sync {
    async fn load(&self, id: &str) -> Result<Option<RawDocument>, StorageError>;

    /// Persist a document. Saving identical input twice is harmless.
    async fn save(&self, document: RawDocument) -> Result<RawDocument, StorageError>;

    /// Returns whether the document existed
    async fn delete(&self, id: &str) -> Result<bool, StorageError>;

    async fn list_children(&self, parent_id: &str) -> Result<Vec<RawDocument>, StorageError>;
}

/// Undo/redo stacks keyed by document id
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Empty history when nothing was stored
    async fn load_history(&self, id: &str) -> Result<PersistedHistory, StorageError>;

    async fn save_history(&self, id: &str, history: &PersistedHistory) -> Result<(), StorageError>;

    async fn clear_history(&self, id: &str) -> Result<(), StorageError>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct WriteStats {
    in_flight: HashMap<String, usize>,
    max_overlap: HashMap<String, usize>,
    saves: HashMap<String, usize>,
}

/// In-process storage for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryStorage {
    documents: Mutex<HashMap<String, RawDocument>>,
    histories: Mutex<HashMap<String, PersistedHistory>>,
    stats: Mutex<WriteStats>,
    write_delay: Option<Duration>,
    failures_remaining: AtomicUsize,
    offline: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every save sleeps this long before completing
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    /// Make the next `count` saves fail
    pub fn fail_next_saves(&self, count: usize) {
        self.failures_remaining.store(count, Ordering::SeqCst);
    }

    /// Make every operation fail until switched back
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn insert(&self, document: RawDocument) {
        lock(&self.documents).insert(document.id.clone(), document);
    }

    pub fn get(&self, id: &str) -> Option<RawDocument> {
        lock(&self.documents).get(id).cloned()
    }

    pub fn history(&self, id: &str) -> Option<PersistedHistory> {
        lock(&self.histories).get(id).cloned()
    }

    /// Completed saves for a document
    pub fn save_count(&self, id: &str) -> usize {
        lock(&self.stats).saves.get(id).copied().unwrap_or(0)
    }

    /// Largest number of saves for one document that were running at once
    pub fn max_concurrent_saves(&self, id: &str) -> usize {
        lock(&self.stats).max_overlap.get(id).copied().unwrap_or(0)
    }

    fn check_online(&self) -> Result<(), StorageError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StorageError::Unavailable("memory storage is offline".to_string()))
        } else {
            Ok(())
        }
    }

    fn take_failure(&self) -> bool {
        self.failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn load(&self, id: &str) -> Result<Option<RawDocument>, StorageError> {
        self.check_online()?;
        Ok(self.get(id))
    }

    async fn save(&self, document: RawDocument) -> Result<RawDocument, StorageError> {
        let id = document.id.clone();
        {
            let mut stats = lock(&self.stats);
            let running = stats.in_flight.entry(id.clone()).or_default();
            *running += 1;
            let running = *running;
            let max = stats.max_overlap.entry(id.clone()).or_default();
            *max = (*max).max(running);
        }

        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }

        let result = if let Err(e) = self.check_online() {
            Err(e)
        } else if self.take_failure() {
            Err(StorageError::Unavailable(format!("injected failure saving {id}")))
        } else {
            self.insert(document.clone());
            Ok(document)
        };

        let mut stats = lock(&self.stats);
        if let Some(running) = stats.in_flight.get_mut(&id) {
            *running = running.saturating_sub(1);
        }
        if result.is_ok() {
            *stats.saves.entry(id).or_default() += 1;
        }
        result
    }

    async fn delete(&self, id: &str) -> Result<bool, StorageError> {
        self.check_online()?;
        Ok(lock(&self.documents).remove(id).is_some())
    }

    async fn list_children(&self, parent_id: &str) -> Result<Vec<RawDocument>, StorageError> {
        self.check_online()?;
        let mut children: Vec<RawDocument> = lock(&self.documents)
            .values()
            .filter(|doc| doc.parent_id.as_deref() == Some(parent_id))
            .cloned()
            .collect();
        children.sort_by(|a, b| a.updated_at.cmp(&b.updated_at).then(a.id.cmp(&b.id)));
        Ok(children)
    }
}

#[async_trait]
impl HistoryStore for MemoryStorage {
    async fn load_history(&self, id: &str) -> Result<PersistedHistory, StorageError> {
        self.check_online()?;
        Ok(self.history(id).unwrap_or_default())
    }

    async fn save_history(&self, id: &str, history: &PersistedHistory) -> Result<(), StorageError> {
        self.check_online()?;
        lock(&self.histories).insert(id.to_string(), history.clone());
        Ok(())
    }

    async fn clear_history(&self, id: &str) -> Result<(), StorageError> {
        self.check_online()?;
        lock(&self.histories).remove(id);
        Ok(())
    }
}

const DOCUMENT_EXTENSION: &str = ".json";
const HISTORY_EXTENSION: &str = ".history.json";

/// File-system storage rooted at one directory
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_path(&self, id: &str) -> Result<PathBuf, StorageError> {
        check_id(id)?;
        Ok(self.root.join(format!("{id}{DOCUMENT_EXTENSION}")))
    }

    fn history_path(&self, id: &str) -> Result<PathBuf, StorageError> {
        check_id(id)?;
        Ok(self.root.join(format!("{id}{HISTORY_EXTENSION}")))
    }

    /// Every document under the root
    pub async fn list_all(&self) -> Result<Vec<RawDocument>, StorageError> {
        let mut documents = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(documents),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(id) = name.strip_suffix(DOCUMENT_EXTENSION) else {
                continue;
            };
            if name.ends_with(HISTORY_EXTENSION) || check_id(id).is_err() {
                continue;
            }

            let content = tokio::fs::read_to_string(entry.path()).await?;
            match serde_json::from_str::<RawDocument>(&content) {
                Ok(document) => documents.push(document),
                Err(e) => warn!(file = %name, error = %e, "Skipping unreadable document"),
            }
        }

        documents.sort_by(|a, b| a.updated_at.cmp(&b.updated_at).then(a.id.cmp(&b.id)));
        Ok(documents)
    }
}

/// Ids become file names, so they must not reach outside the root
fn check_id(id: &str) -> Result<(), StorageError> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidId(id.to_string()))
    }
}

async fn write_atomic(path: &Path, content: &str) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, content).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

async fn read_optional(path: &Path) -> Result<Option<String>, StorageError> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn remove_optional(path: &Path) -> Result<bool, StorageError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl Storage for FsStorage {
    async fn load(&self, id: &str) -> Result<Option<RawDocument>, StorageError> {
        let path = self.document_path(id)?;
        match read_optional(&path).await? {
            Some(content) => Ok(Some(serde_json::from_str(&content)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, document: RawDocument) -> Result<RawDocument, StorageError> {
        let path = self.document_path(&document.id)?;
        let content = serde_json::to_string_pretty(&document)?;
        write_atomic(&path, &content).await?;
        debug!(document_id = %document.id, path = %path.display(), "Saved document");
        Ok(document)
    }

    async fn delete(&self, id: &str) -> Result<bool, StorageError> {
        remove_optional(&self.document_path(id)?).await
    }

    async fn list_children(&self, parent_id: &str) -> Result<Vec<RawDocument>, StorageError> {
        Ok(self
            .list_all()
            .await?
            .into_iter()
            .filter(|doc| doc.parent_id.as_deref() == Some(parent_id))
            .collect())
    }
}

#[async_trait]
impl HistoryStore for FsStorage {
    async fn load_history(&self, id: &str) -> Result<PersistedHistory, StorageError> {
        let path = self.history_path(id)?;
        match read_optional(&path).await? {
            Some(content) => Ok(serde_json::from_str(&content)?),
            None => Ok(PersistedHistory::default()),
        }
    }

    async fn save_history(&self, id: &str, history: &PersistedHistory) -> Result<(), StorageError> {
        let path = self.history_path(id)?;
        write_atomic(&path, &serde_json::to_string(history)?).await
    }

    async fn clear_history(&self, id: &str) -> Result<(), StorageError> {
        remove_optional(&self.history_path(id)?).await?;
        Ok(())
    }
}
