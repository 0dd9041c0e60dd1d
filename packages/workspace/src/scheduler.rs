//! # Persistence Scheduler
//!
//! Debounced, idempotent saves for one document.
//!
//! The scheduler runs as its own task and is driven through a cloneable
//! [`SchedulerHandle`]:
//!
//! ```text
//! schedule_save ─► pending + timer ─┐
//!                                   ├─► try_start ─► spawned storage.save
//! flush_now ─────► pending, no timer┘        ▲                │
//!                                            └── completion ◄─┘
//! ```
//!
//! At most one save is in flight. A request that arrives meanwhile stays
//! pending and is re-evaluated when the in-flight save resolves. Before
//! writing, trailing blank blocks are trimmed (never the last block) and the
//! candidate is compared with the last saved snapshot; identical content is
//! not written again. A failed save keeps its content pending and re-arms the
//! timer. `cancel` resolves only once no save is in flight, so nothing the
//! scheduler started can reach storage after it returns.

use crate::errors::{StorageError, WorkspaceError, WorkspaceResult};
use crate::storage::Storage;
use folio_editor::{Document, Snapshot};
use folio_schema::{structurally_equal, trim_trailing_blank, RawDocument};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

type FlushReply = oneshot::Sender<Result<Option<RawDocument>, StorageError>>;

enum SchedulerMessage {
    Schedule(Document),
    Flush { document: Document, reply: FlushReply },
    Cancel { reply: oneshot::Sender<()> },
}

struct SaveCompletion {
    document: Document,
    snapshot: Snapshot,
    result: Result<RawDocument, StorageError>,
}

/// Cloneable handle to a running scheduler task
#[derive(Clone)]
pub struct SchedulerHandle {
    tx: mpsc::UnboundedSender<SchedulerMessage>,
    last_saved: watch::Receiver<Option<Snapshot>>,
}

impl SchedulerHandle {
    /// Start a scheduler. `last_saved` is what storage already holds, if
    /// anything.
    pub fn spawn(
        storage: Arc<dyn Storage>,
        debounce: Duration,
        last_saved: Option<Snapshot>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (saved_tx, saved_rx) = watch::channel(last_saved);

        let task = SchedulerTask {
            storage,
            debounce,
            pending: None,
            deadline: None,
            in_flight: false,
            flush_waiters: Vec::new(),
            in_flight_waiters: Vec::new(),
            cancel_waiters: Vec::new(),
            last_saved: saved_tx,
        };
        tokio::spawn(task.run(rx));

        Self {
            tx,
            last_saved: saved_rx,
        }
    }

    /// Queue a debounced save of `document`
    pub fn schedule_save(&self, document: Document) -> WorkspaceResult<()> {
        self.tx
            .send(SchedulerMessage::Schedule(document))
            .map_err(|_| WorkspaceError::SessionClosed)
    }

    /// Cancel the timer and save now. `None` when there was nothing to write.
    pub async fn flush_now(&self, document: Document) -> WorkspaceResult<Option<RawDocument>> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SchedulerMessage::Flush { document, reply })
            .map_err(|_| WorkspaceError::SessionClosed)?;
        let saved = rx.await.map_err(|_| WorkspaceError::SessionClosed)??;
        Ok(saved)
    }

    /// Drop any pending save and wait for an in-flight one to finish
    pub async fn cancel(&self) -> WorkspaceResult<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SchedulerMessage::Cancel { reply })
            .map_err(|_| WorkspaceError::SessionClosed)?;
        rx.await.map_err(|_| WorkspaceError::SessionClosed)
    }

    /// Blocks of the most recent successful save
    pub fn last_saved(&self) -> Option<Snapshot> {
        self.last_saved.borrow().clone()
    }

    /// Follow successful saves as they complete
    pub fn subscribe(&self) -> watch::Receiver<Option<Snapshot>> {
        self.last_saved.clone()
    }
}

struct SchedulerTask {
    storage: Arc<dyn Storage>,
    debounce: Duration,

    /// Latest content not yet handed to storage
    pending: Option<Document>,

    /// When the debounce timer fires
    deadline: Option<Instant>,

    in_flight: bool,

    /// Flush callers waiting for the next save to start
    flush_waiters: Vec<FlushReply>,

    /// Flush callers waiting for the running save
    in_flight_waiters: Vec<FlushReply>,

    /// Cancel callers waiting for the running save to finish
    cancel_waiters: Vec<oneshot::Sender<()>>,

    last_saved: watch::Sender<Option<Snapshot>>,
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

impl SchedulerTask {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<SchedulerMessage>) {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<SaveCompletion>();

        loop {
            let deadline = self.deadline;

            tokio::select! {
                message = rx.recv() => match message {
                    Some(message) => self.handle(message, &done_tx),
                    None => break,
                },
                Some(done) = done_rx.recv() => self.complete(done, &done_tx),
                _ = wait_until(deadline) => {
                    self.deadline = None;
                    self.try_start(&done_tx);
                }
            }
        }

        if let Some(document) = &self.pending {
            warn!(document_id = %document.id, "Scheduler stopped with unsaved content");
        }
    }

    fn handle(&mut self, message: SchedulerMessage, done_tx: &mpsc::UnboundedSender<SaveCompletion>) {
        match message {
            SchedulerMessage::Schedule(document) => {
                self.pending = Some(document);
                self.deadline = Some(Instant::now() + self.debounce);
            }
            SchedulerMessage::Flush { document, reply } => {
                self.pending = Some(document);
                self.deadline = None;
                self.flush_waiters.push(reply);
                self.try_start(done_tx);
            }
            SchedulerMessage::Cancel { reply } => {
                if let Some(document) = self.pending.take() {
                    debug!(document_id = %document.id, "Cancelled pending save");
                }
                self.deadline = None;
                resolve(&mut self.flush_waiters, Ok(None));

                if self.in_flight {
                    self.cancel_waiters.push(reply);
                } else {
                    let _ = reply.send(());
                }
            }
        }
    }

    fn try_start(&mut self, done_tx: &mpsc::UnboundedSender<SaveCompletion>) {
        if self.in_flight {
            return;
        }

        let Some(document) = self.pending.take() else {
            resolve(&mut self.flush_waiters, Ok(None));
            return;
        };

        let trimmed = trim_trailing_blank(&document.blocks);

        let unchanged = self
            .last_saved
            .borrow()
            .as_ref()
            .map(|saved| structurally_equal(saved, trimmed))
            .unwrap_or(false);
        if unchanged {
            debug!(document_id = %document.id, "Skipping save of unchanged content");
            resolve(&mut self.flush_waiters, Ok(None));
            return;
        }

        let raw = match document.to_raw_with(trimmed) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(document_id = %document.id, error = %e, "Could not encode document");
                resolve(
                    &mut self.flush_waiters,
                    Err(StorageError::Serialization(e.to_string())),
                );
                return;
            }
        };
        let snapshot: Snapshot = Arc::new(trimmed.to_vec());

        self.in_flight = true;
        self.in_flight_waiters = std::mem::take(&mut self.flush_waiters);

        debug!(document_id = %document.id, blocks = snapshot.len(), "Starting save");

        let storage = Arc::clone(&self.storage);
        let done_tx = done_tx.clone();
        tokio::spawn(async move {
            let result = storage.save(raw).await;
            let _ = done_tx.send(SaveCompletion {
                document,
                snapshot,
                result,
            });
        });
    }

    fn complete(&mut self, done: SaveCompletion, done_tx: &mpsc::UnboundedSender<SaveCompletion>) {
        self.in_flight = false;
        let mut waiters = std::mem::take(&mut self.in_flight_waiters);

        match done.result {
            Ok(raw) => {
                info!(document_id = %raw.id, blocks = done.snapshot.len(), "Document saved");
                self.last_saved.send_replace(Some(done.snapshot));
                resolve(&mut waiters, Ok(Some(raw)));
            }
            Err(e) if !self.cancel_waiters.is_empty() => {
                warn!(document_id = %done.document.id, error = %e, "Save failed after cancel, dropping it");
                resolve(&mut waiters, Err(e));
            }
            Err(e) => {
                warn!(document_id = %done.document.id, error = %e, "Save failed, will retry");
                if self.pending.is_none() {
                    self.pending = Some(done.document);
                }
                self.deadline = Some(Instant::now() + self.debounce);
                resolve(&mut waiters, Err(e));
            }
        }

        for waiter in self.cancel_waiters.drain(..) {
            let _ = waiter.send(());
        }

        let timer_elapsed = self.deadline.is_none();
        if self.pending.is_some() && (timer_elapsed || !self.flush_waiters.is_empty()) {
            self.try_start(done_tx);
        }
    }
}

fn resolve(waiters: &mut Vec<FlushReply>, result: Result<Option<RawDocument>, StorageError>) {
    for waiter in waiters.drain(..) {
        let _ = waiter.send(result.clone());
    }
}
