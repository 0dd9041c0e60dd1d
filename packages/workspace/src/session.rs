//! # Document Sessions
//!
//! One tokio task per open document owns its [`Engine`]. Every entry point is
//! a message on the task's channel, so edits, commands, undo/redo and flushes
//! are applied strictly in arrival order by a single writer.
//!
//! ```text
//! SessionHandle ──msg──► SessionTask ─┬─► Engine (store, classifier, history)
//!                                     ├─► SchedulerHandle ─► Storage::save
//!                                     └─► HistoryStore
//! ```
//!
//! Structural changes made through raw editor updates are grouped into one
//! undo entry after a quiet period (`historyDebounceMs`). Structured commands
//! settle immediately.
//!
//! Interpreter calls happen on the caller's side: the handle reads the
//! current blocks, awaits the interpreter, and only then sends the resulting
//! command, so a slow interpreter never blocks the session.

use crate::config::EngineConfig;
use crate::errors::{StorageError, WorkspaceError, WorkspaceResult};
use crate::interpreter::{resolve_interpretation, CommandInterpreter};
use crate::scheduler::SchedulerHandle;
use crate::storage::{HistoryStore, Storage};
use crate::surface::EditorSurface;
use folio_editor::{ChangeKind, Command, CommandReport, Document, Engine, Interpretation, Snapshot};
use folio_schema::{new_document_id, trim_trailing_blank, Block, RawDocument, DEFAULT_LINK_ICON};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// UI-facing summary of a session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub document_id: String,
    pub version: u64,
    pub can_undo: bool,
    pub can_redo: bool,
    pub undo_levels: usize,
    pub redo_levels: usize,
    /// A structural change is waiting for the history window to close
    pub history_pending: bool,
    /// Storage is behind the current blocks
    pub unsaved_changes: bool,
}

/// What happened to an utterance
#[derive(Debug, Clone, PartialEq)]
pub enum UtteranceOutcome {
    Applied(CommandReport),
    Clarification(String),
}

type Reply<T> = oneshot::Sender<WorkspaceResult<T>>;

enum SessionMessage {
    ContentChanged(Vec<Block>),
    Execute {
        command: Command,
        reply: Reply<CommandReport>,
    },
    Snapshot {
        reply: oneshot::Sender<Document>,
    },
    Status {
        reply: oneshot::Sender<SessionStatus>,
    },
    Flush {
        reply: Reply<Option<RawDocument>>,
    },
    Close {
        reply: Reply<Option<RawDocument>>,
    },
    Delete {
        reply: Reply<bool>,
    },
}

/// Opens sessions against a pair of storage backends
#[derive(Clone)]
pub struct DocumentSession {
    storage: Arc<dyn Storage>,
    history_store: Arc<dyn HistoryStore>,
    config: EngineConfig,
}

impl DocumentSession {
    pub fn new(
        storage: Arc<dyn Storage>,
        history_store: Arc<dyn HistoryStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            storage,
            history_store,
            config,
        }
    }

    /// Open `id`, or start a fresh untitled document when storage has none
    pub async fn open(&self, id: &str) -> WorkspaceResult<SessionHandle> {
        let options = self.config.engine_options();

        let (engine, last_saved) = match self.storage.load(id).await? {
            Some(raw) => {
                let document = Document::from_raw(&raw, &options.untitled_title);
                let saved = Arc::new(trim_trailing_blank(&document.blocks).to_vec());
                (Engine::new(document, options), Some(saved))
            }
            None => {
                let document = Document::new(id, options.untitled_title.as_str());
                (Engine::new(document, options), None)
            }
        };

        self.start(engine, last_saved).await
    }

    /// Create and persist a new document, then open it
    pub async fn create(
        &self,
        title: &str,
        parent_id: Option<String>,
    ) -> WorkspaceResult<SessionHandle> {
        let raw = self.create_document(title, parent_id).await?;
        self.open(&raw.id).await
    }

    async fn create_document(
        &self,
        title: &str,
        parent_id: Option<String>,
    ) -> WorkspaceResult<RawDocument> {
        let title = if title.trim().is_empty() {
            self.config.untitled_title.as_str()
        } else {
            title
        };

        let mut document = Document::new(new_document_id(), title);
        document.parent_id = parent_id;
        let raw = document
            .to_raw()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        Ok(self.storage.save(raw).await?)
    }

    async fn start(
        &self,
        mut engine: Engine,
        last_saved: Option<Snapshot>,
    ) -> WorkspaceResult<SessionHandle> {
        let id = engine.document().id.clone();

        match self.history_store.load_history(&id).await {
            Ok(history) => engine.restore_history(history),
            Err(e) => warn!(document_id = %id, error = %e, "Could not load history, starting empty"),
        }

        if let Some(saved) = &last_saved {
            engine.mark_persisted(Arc::clone(saved));
        }

        let scheduler = SchedulerHandle::spawn(
            Arc::clone(&self.storage),
            self.config.save_debounce(),
            last_saved,
        );
        let saved = scheduler.subscribe();

        let (tx, rx) = mpsc::unbounded_channel();
        let task = SessionTask {
            engine,
            session: self.clone(),
            scheduler,
            saved,
            history_debounce: self.config.history_debounce(),
            history_deadline: None,
        };

        info!(
            document_id = %id,
            undo_levels = task.engine.history().undo_levels(),
            "Session opened"
        );
        tokio::spawn(task.run(rx));

        Ok(SessionHandle { id, tx })
    }
}

/// Cloneable entry point to a running session
#[derive(Clone)]
pub struct SessionHandle {
    id: String,
    tx: mpsc::UnboundedSender<SessionMessage>,
}

impl SessionHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    fn send(&self, message: SessionMessage) -> WorkspaceResult<()> {
        self.tx.send(message).map_err(|_| WorkspaceError::SessionClosed)
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> SessionMessage,
    ) -> WorkspaceResult<T> {
        let (reply, rx) = oneshot::channel();
        self.send(make(reply))?;
        rx.await.map_err(|_| WorkspaceError::SessionClosed)
    }

    /// Raw content update from the editing surface
    pub fn content_changed(&self, blocks: Vec<Block>) -> WorkspaceResult<()> {
        self.send(SessionMessage::ContentChanged(blocks))
    }

    /// Push what the surface currently shows into the session
    pub fn sync_from_surface(&self, surface: &dyn EditorSurface) -> WorkspaceResult<()> {
        self.content_changed(surface.content())
    }

    /// Show the session's current blocks on the surface
    pub async fn render_to(&self, surface: &mut dyn EditorSurface) -> WorkspaceResult<()> {
        let document = self.snapshot().await?;
        surface.set_content(&document.blocks);
        Ok(())
    }

    pub async fn execute(&self, command: Command) -> WorkspaceResult<CommandReport> {
        self.request(|reply| SessionMessage::Execute { command, reply })
            .await?
    }

    pub async fn undo(&self) -> WorkspaceResult<CommandReport> {
        self.execute(Command::Undo).await
    }

    pub async fn redo(&self) -> WorkspaceResult<CommandReport> {
        self.execute(Command::Redo).await
    }

    /// Interpret an utterance and apply the result.
    ///
    /// Interpreter failures never surface: the utterance is inserted as text
    /// instead.
    pub async fn submit_utterance(
        &self,
        interpreter: &dyn CommandInterpreter,
        utterance: &str,
    ) -> WorkspaceResult<UtteranceOutcome> {
        let document = self.snapshot().await?;
        let output = interpreter.interpret(utterance, &document.blocks).await;

        match resolve_interpretation(utterance, output) {
            Interpretation::Clarification { message } => {
                Ok(UtteranceOutcome::Clarification(message))
            }
            Interpretation::Command(command) => {
                debug!(document_id = %self.id, action = command.action(), "Applying interpreted command");
                self.execute(command).await.map(UtteranceOutcome::Applied)
            }
        }
    }

    pub async fn snapshot(&self) -> WorkspaceResult<Document> {
        self.request(|reply| SessionMessage::Snapshot { reply }).await
    }

    pub async fn status(&self) -> WorkspaceResult<SessionStatus> {
        self.request(|reply| SessionMessage::Status { reply }).await
    }

    /// Settle history and save now. `None` when storage was already current.
    pub async fn flush(&self) -> WorkspaceResult<Option<RawDocument>> {
        self.request(|reply| SessionMessage::Flush { reply }).await?
    }

    /// Final flush, then stop the session.
    ///
    /// When the flush fails the session keeps running with its content still
    /// pending, so the caller can retry.
    pub async fn close(&self) -> WorkspaceResult<Option<RawDocument>> {
        self.request(|reply| SessionMessage::Close { reply }).await?
    }

    /// Cancel pending saves, delete the document and its history, then stop.
    /// The session keeps running if storage refuses the delete.
    pub async fn delete_document(&self) -> WorkspaceResult<bool> {
        self.request(|reply| SessionMessage::Delete { reply }).await?
    }
}

struct SessionTask {
    engine: Engine,
    session: DocumentSession,
    scheduler: SchedulerHandle,
    saved: watch::Receiver<Option<Snapshot>>,
    history_debounce: Duration,

    /// When the open history window settles
    history_deadline: Option<Instant>,
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

impl SessionTask {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<SessionMessage>) {
        loop {
            let deadline = self.history_deadline;

            tokio::select! {
                message = rx.recv() => match message {
                    Some(message) => {
                        if !self.handle(message).await {
                            break;
                        }
                    }
                    None => {
                        if let Err(e) = self.flush().await {
                            warn!(document_id = %self.id(), error = %e, "Final flush failed");
                        }
                        break;
                    }
                },
                _ = wait_until(deadline) => {
                    self.history_deadline = None;
                    self.settle_history().await;
                }
            }
        }

        info!(document_id = %self.id(), "Session closed");
    }

    fn id(&self) -> &str {
        &self.engine.document().id
    }

    /// Returns false when the session should stop
    async fn handle(&mut self, message: SessionMessage) -> bool {
        self.sync_persisted();

        match message {
            SessionMessage::ContentChanged(blocks) => {
                self.content_changed(blocks);
            }
            SessionMessage::Execute { command, reply } => {
                let result = self.execute(command).await;
                let _ = reply.send(result);
            }
            SessionMessage::Snapshot { reply } => {
                let _ = reply.send(self.engine.document().clone());
            }
            SessionMessage::Status { reply } => {
                let _ = reply.send(self.status());
            }
            SessionMessage::Flush { reply } => {
                let result = self.flush().await;
                let _ = reply.send(result);
            }
            SessionMessage::Close { reply } => {
                let result = self.flush().await;
                if let Err(e) = &result {
                    warn!(document_id = %self.id(), error = %e, "Close failed, session stays open");
                }
                let stop = result.is_ok();
                let _ = reply.send(result);
                return !stop;
            }
            SessionMessage::Delete { reply } => {
                let result = self.delete().await;
                let stop = result.is_ok();
                let _ = reply.send(result);
                return !stop;
            }
        }
        true
    }

    /// Pick up saves the scheduler finished since the last message
    fn sync_persisted(&mut self) {
        if !self.saved.has_changed().unwrap_or(false) {
            return;
        }
        let saved = self.saved.borrow_and_update().clone();
        if let Some(snapshot) = saved {
            self.engine.mark_persisted(snapshot);
        }
    }

    fn content_changed(&mut self, blocks: Vec<Block>) {
        if self.engine.content_changed(blocks) == ChangeKind::None {
            return;
        }

        self.schedule_save();
        if self.engine.has_pending_change() {
            self.history_deadline = Some(Instant::now() + self.history_debounce);
        }
    }

    async fn execute(&mut self, command: Command) -> WorkspaceResult<CommandReport> {
        // the open window is recorded whether or not the command succeeds
        self.history_deadline = None;
        self.settle_history().await;

        let version = self.engine.version();

        let report = match command {
            Command::CreateLinkedDocument { title, icon } => {
                self.create_linked(&title, icon).await?
            }
            command => self.engine.execute(&command)?,
        };

        if self.engine.version() != version {
            self.schedule_save();
            self.persist_history().await;
        }

        Ok(report)
    }

    async fn create_linked(
        &mut self,
        title: &str,
        icon: Option<String>,
    ) -> WorkspaceResult<CommandReport> {
        let parent_id = self.id().to_string();
        let child = self
            .session
            .create_document(title, Some(parent_id.clone()))
            .await?;

        info!(document_id = %parent_id, child_id = %child.id, "Created linked document");

        let link = Block::link(
            child.id.as_str(),
            child.title.as_str(),
            icon.unwrap_or_else(|| DEFAULT_LINK_ICON.to_string()),
        );
        Ok(self.engine.append_link(link)?)
    }

    fn schedule_save(&self) {
        if let Err(e) = self.scheduler.schedule_save(self.engine.document().clone()) {
            warn!(document_id = %self.id(), error = %e, "Could not schedule save");
        }
    }

    async fn settle_history(&mut self) {
        if self.engine.settle() {
            self.persist_history().await;
        }
    }

    async fn persist_history(&self) {
        let history = self.engine.persisted_history();
        if let Err(e) = self.session.history_store.save_history(self.id(), &history).await {
            warn!(document_id = %self.id(), error = %e, "Could not persist history");
        }
    }

    async fn flush(&mut self) -> WorkspaceResult<Option<RawDocument>> {
        self.history_deadline = None;
        self.settle_history().await;

        self.scheduler.flush_now(self.engine.document().clone()).await
    }

    async fn delete(&mut self) -> WorkspaceResult<bool> {
        self.scheduler.cancel().await?;
        self.history_deadline = None;

        let id = self.id().to_string();
        let existed = match self.session.storage.delete(&id).await {
            Ok(existed) => existed,
            Err(e) => {
                // the session stays open, so its content goes back in the queue
                self.schedule_save();
                return Err(e.into());
            }
        };
        self.session.history_store.clear_history(&id).await?;
        self.engine.clear_history();

        info!(document_id = %id, existed, "Document deleted");
        Ok(existed)
    }

    fn status(&self) -> SessionStatus {
        let history = self.engine.history();
        SessionStatus {
            document_id: self.id().to_string(),
            version: self.engine.version(),
            can_undo: self.engine.can_undo(),
            can_redo: self.engine.can_redo(),
            undo_levels: history.undo_levels(),
            redo_levels: history.redo_levels(),
            history_pending: self.engine.has_pending_change(),
            unsaved_changes: self.engine.has_unsaved_changes(),
        }
    }
}
