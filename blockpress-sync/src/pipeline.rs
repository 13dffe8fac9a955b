//! Debounced save pipeline.
//!
//! A single worker task owns all save state and receives [`Command`]s over an
//! unbounded channel, so commands apply strictly in the order they were sent
//! and no locks are needed. Edits to the active document are coalesced into
//! one [`DocumentPatch`]; when the debounce deadline passes the patch is sent
//! through the store in a spawned task that reports back tagged with the
//! document id and a request id.
//!
//! Invariants:
//! - at most one store call is in flight;
//! - edits for a document that is not active are dropped;
//! - a completion for a document that is no longer active changes nothing
//!   (no cache invalidation, no notice);
//! - local edits are never rolled back on failure.

use std::sync::Arc;
use std::time::Duration;

use blockpress_core::{Document, DocumentPatch};
use blockpress_types::DocId;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::cache::DocumentCache;
use crate::config::SyncConfig;
use crate::error::StoreError;
use crate::notify::{Notifier, SaveNotice};
use crate::store::DocumentStore;

#[derive(Debug)]
enum Command {
    SetActive(Option<DocId>),
    Edit { doc_id: DocId, patch: DocumentPatch },
    SaveNow,
    Idle(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

#[derive(Debug)]
struct Completion {
    doc_id: DocId,
    request_id: u64,
    patch: DocumentPatch,
    result: Result<Document, StoreError>,
}

/// Handle to the save worker. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SavePipeline {
    tx: mpsc::UnboundedSender<Command>,
    saving: watch::Receiver<bool>,
    notifier: Notifier,
}

impl SavePipeline {
    /// Start the worker on the current tokio runtime.
    pub fn spawn(store: Arc<dyn DocumentStore>, cache: DocumentCache, config: &SyncConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (saving_tx, saving) = watch::channel(false);
        let notifier = Notifier::new(config.notice_capacity);

        let worker = Worker::new(store, cache, config.debounce(), saving_tx, notifier.clone());
        tokio::spawn(worker.run(rx));

        Self {
            tx,
            saving,
            notifier,
        }
    }

    fn send(&self, command: Command) {
        if self.tx.send(command).is_err() {
            warn!("save pipeline is shut down; command dropped");
        }
    }

    /// Key subsequent edits to `doc_id`, dropping anything pending for the
    /// previous document.
    pub fn set_active(&self, doc_id: Option<DocId>) {
        self.send(Command::SetActive(doc_id));
    }

    /// Record an edit and restart the debounce.
    pub fn edit(&self, doc_id: DocId, patch: DocumentPatch) {
        if patch.is_empty() {
            return;
        }
        self.send(Command::Edit { doc_id, patch });
    }

    /// Skip the rest of the debounce and save what is pending.
    pub fn save_now(&self) {
        self.send(Command::SaveNow);
    }

    /// True while a store call is in flight.
    pub fn is_saving(&self) -> bool {
        *self.saving.borrow()
    }

    pub fn saving(&self) -> watch::Receiver<bool> {
        self.saving.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SaveNotice> {
        self.notifier.subscribe()
    }

    /// Wait until no debounce is armed and nothing is in flight.
    ///
    /// Edits kept after a transient failure are not re-armed; they go out
    /// with the next edit, [`save_now`](Self::save_now) or
    /// [`shutdown`](Self::shutdown), so they can still be unsaved when this
    /// returns.
    pub async fn idle(&self) {
        let (reply, done) = oneshot::channel();
        self.send(Command::Idle(reply));
        let _ = done.await;
    }

    /// Flush the pending save, wait for it, and stop the worker.
    pub async fn shutdown(&self) {
        let (reply, done) = oneshot::channel();
        self.send(Command::Shutdown(reply));
        let _ = done.await;
    }
}

#[derive(Debug)]
struct InFlight {
    doc_id: DocId,
    request_id: u64,
}

struct Worker {
    store: Arc<dyn DocumentStore>,
    cache: DocumentCache,
    debounce: Duration,
    saving: watch::Sender<bool>,
    notifier: Notifier,

    active: Option<DocId>,
    pending: Option<DocumentPatch>,
    deadline: Option<Instant>,
    /// Pending patch should go out as soon as the current call resolves
    flush_after: bool,
    in_flight: Option<InFlight>,
    next_request: u64,

    done_tx: mpsc::UnboundedSender<Completion>,
    idle_waiters: Vec<oneshot::Sender<()>>,
    stopping: bool,
    shutdown_waiters: Vec<oneshot::Sender<()>>,
}

impl Worker {
    fn new(
        store: Arc<dyn DocumentStore>,
        cache: DocumentCache,
        debounce: Duration,
        saving: watch::Sender<bool>,
        notifier: Notifier,
    ) -> Self {
        let (done_tx, _) = mpsc::unbounded_channel();
        Self {
            store,
            cache,
            debounce,
            saving,
            notifier,
            active: None,
            pending: None,
            deadline: None,
            flush_after: false,
            in_flight: None,
            next_request: 0,
            done_tx,
            idle_waiters: Vec::new(),
            stopping: false,
            shutdown_waiters: Vec::new(),
        }
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let (done_tx, mut completions) = mpsc::unbounded_channel();
        self.done_tx = done_tx;
        let mut commands_open = true;

        loop {
            let deadline = self.deadline;
            tokio::select! {
                command = commands.recv(), if commands_open => match command {
                    Some(command) => self.on_command(command),
                    None => {
                        debug!("all pipeline handles dropped");
                        commands_open = false;
                        self.begin_shutdown(None);
                    }
                },
                Some(done) = completions.recv() => self.on_completion(done),
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.on_deadline();
                }
            }

            if self.is_idle() {
                for waiter in self.idle_waiters.drain(..) {
                    let _ = waiter.send(());
                }
            }
            if self.stopping && self.in_flight.is_none() {
                break;
            }
        }

        for waiter in self.shutdown_waiters.drain(..) {
            let _ = waiter.send(());
        }
        for waiter in self.idle_waiters.drain(..) {
            let _ = waiter.send(());
        }
        info!("save pipeline stopped");
    }

    fn is_idle(&self) -> bool {
        self.deadline.is_none() && self.in_flight.is_none()
    }

    fn on_command(&mut self, command: Command) {
        match command {
            Command::SetActive(doc_id) => {
                if self.active == doc_id {
                    return;
                }
                if self.pending.take().is_some() {
                    debug!(from = ?self.active, to = ?doc_id, "dropping unsaved edits on switch");
                }
                self.deadline = None;
                self.flush_after = false;
                self.active = doc_id;
            }
            Command::Edit { doc_id, patch } => {
                if self.active.as_ref() != Some(&doc_id) {
                    debug!(%doc_id, "edit for inactive document dropped");
                    return;
                }
                match self.pending.as_mut() {
                    Some(pending) => pending.merge(patch),
                    None => self.pending = Some(patch),
                }
                self.deadline = Some(Instant::now() + self.debounce);
            }
            Command::SaveNow => {
                if self.pending.is_none() {
                    return;
                }
                self.deadline = None;
                self.flush_or_defer();
            }
            Command::Idle(reply) => {
                if self.is_idle() {
                    let _ = reply.send(());
                } else {
                    self.idle_waiters.push(reply);
                }
            }
            Command::Shutdown(reply) => self.begin_shutdown(Some(reply)),
        }
    }

    fn begin_shutdown(&mut self, reply: Option<oneshot::Sender<()>>) {
        self.stopping = true;
        self.shutdown_waiters.extend(reply);
        if self.pending.is_some() {
            self.deadline = None;
            self.flush_or_defer();
        }
    }

    fn on_deadline(&mut self) {
        self.deadline = None;
        self.flush_or_defer();
    }

    fn flush_or_defer(&mut self) {
        if self.in_flight.is_some() {
            self.flush_after = true;
        } else {
            self.issue();
        }
    }

    fn issue(&mut self) {
        self.flush_after = false;
        let (Some(doc_id), Some(patch)) = (self.active.clone(), self.pending.take()) else {
            return;
        };

        self.next_request += 1;
        let request_id = self.next_request;
        self.in_flight = Some(InFlight {
            doc_id: doc_id.clone(),
            request_id,
        });
        self.saving.send_replace(true);
        debug!(%doc_id, request_id, "issuing save");

        let store = self.store.clone();
        let done = self.done_tx.clone();
        tokio::spawn(async move {
            let result = store.update_document(&doc_id, patch.clone()).await;
            let _ = done.send(Completion {
                doc_id,
                request_id,
                patch,
                result,
            });
        });
    }

    fn on_completion(&mut self, done: Completion) {
        let Completion {
            doc_id,
            request_id,
            patch,
            result,
        } = done;

        if self
            .in_flight
            .as_ref()
            .is_some_and(|f| f.request_id == request_id && f.doc_id == doc_id)
        {
            self.in_flight = None;
            self.saving.send_replace(false);
        }

        if self.active.as_ref() != Some(&doc_id) {
            debug!(%doc_id, request_id, "discarding completion for inactive document");
        } else {
            match result {
                Ok(_) => {
                    self.cache.invalidate(&doc_id);
                    debug!(%doc_id, request_id, "save complete");
                }
                Err(err) => {
                    warn!(%doc_id, request_id, error = %err, "save failed");
                    if err.is_transient() {
                        // Keep the failed fields so the next save carries them.
                        let mut restored = patch;
                        if let Some(newer) = self.pending.take() {
                            restored.merge(newer);
                        }
                        self.pending = Some(restored);
                    }
                    self.notifier.send(SaveNotice::from_error(doc_id, &err));
                }
            }
        }

        if self.flush_after && self.in_flight.is_none() {
            self.issue();
        }
    }
}
