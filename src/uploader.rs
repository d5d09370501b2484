//! # Single-Flight Uploader
//!
//! Every sheet instance owns one uploader task. The task owns the pending
//! queue outright; the sheet handle only ever sends it messages, so the
//! queue has exactly one writer and needs no lock.
//!
//! ```text
//!   AtomicSheet (sync)                 uploader task
//!  ┌──────────────────┐  Enqueue(op) ┌──────────────────────────────────┐
//!  │ validate + apply │ ───────────► │ queue: [Load] op1 op2 op3 ...    │
//!  │ to SheetCache    │  Flush       │                                  │
//!  └──────────────────┘ ───────────► │ in flight: at most one drain     │
//!           ▲            Status      │                                  │
//!           │           ───────────► │  Load  → load_sheet(title)       │
//!           │            Shutdown    │  ops   → batch_update(snapshot)  │
//!           │           ───────────► └───────────────┬──────────────────┘
//!           │                                        │
//!           └─────── watch<LoadedSheet> ─────────────┘
//! ```
//!
//! ## Drain Cycle
//!
//! 1. If idle, armed, and the queue is non-empty, start a drain:
//!    - a `Load` marker at the front is drained alone (find-or-create the
//!      sheet, learn its ID);
//!    - otherwise the *whole* queue is snapshotted, bound to the sheet ID,
//!      and sent as one batch-update call.
//! 2. On success, remove exactly the drained prefix. Operations that arrived
//!    during the call stay queued and start the next cycle immediately.
//! 3. On failure, keep the queue, disarm, and report the error to flush
//!    waiters. Nothing retries on its own; the next enqueue or flush re-arms.
//!
//! ## Rust Pattern: select! over Requests and One Boxed Future
//!
//! The in-flight drain is an owned `'static` future kept in an `Option`.
//! `tokio::select!` polls it alongside the request channel, so requests keep
//! flowing (and queueing) while a batch is on the wire, and the single
//! `Option` slot is what makes the upload single-flight.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::client::{LoadedSheet, SheetsClient};
use crate::error::{Error, Result};
use crate::operation::{Operation, Operations};
use crate::types::SheetId;

// =============================================================================
// Request Types
// =============================================================================

/// A message to the uploader task.
pub enum UploadRequest {
    /// Queue one operation and trigger a drain.
    Enqueue(Operation),

    /// Resolve once the queue is empty, or with the error of the next failed
    /// drain. Re-arms the uploader.
    Flush { response: oneshot::Sender<Result<()>> },

    /// Report the current upload state.
    Status { response: oneshot::Sender<UploadStatus> },

    /// Make a final drain attempt, then stop.
    Shutdown { response: oneshot::Sender<Result<()>> },
}

/// Snapshot of the uploader's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UploadStatus {
    /// A drain is in flight.
    pub uploading: bool,
    /// The initial load hasn't completed yet.
    pub load_pending: bool,
    /// Operations not yet confirmed uploaded (including any in flight).
    pub pending: usize,
    /// Successful batch-update calls so far.
    pub batches_uploaded: u64,
}

/// An entry of the pending queue.
#[derive(Debug, Clone, PartialEq)]
enum Pending {
    /// Resolve the sheet before anything else is sent.
    Load,
    Op(Operation),
}

type DrainFuture = Pin<Box<dyn Future<Output = Drained> + Send>>;

/// Result of one drain cycle.
enum Drained {
    Loaded(Result<LoadedSheet>),
    Uploaded { count: usize, result: Result<()> },
}

// =============================================================================
// Uploader State
// =============================================================================

struct Uploader {
    client: Arc<SheetsClient>,
    title: String,
    queue: VecDeque<Pending>,
    sheet_id: SheetId,
    batches_uploaded: u64,
    /// Whether the next idle moment should start a drain.
    armed: bool,
    flush_waiters: Vec<oneshot::Sender<Result<()>>>,
    loaded: watch::Sender<Option<Arc<LoadedSheet>>>,
}

impl Uploader {
    fn status(&self, uploading: bool) -> UploadStatus {
        UploadStatus {
            uploading,
            load_pending: self.load_pending(),
            pending: self
                .queue
                .iter()
                .filter(|p| matches!(p, Pending::Op(_)))
                .count(),
            batches_uploaded: self.batches_uploaded,
        }
    }

    fn load_pending(&self) -> bool {
        matches!(self.queue.front(), Some(Pending::Load))
    }

    /// Starts a drain of the current queue front.
    fn start_drain(&self) -> DrainFuture {
        let client = Arc::clone(&self.client);

        if self.load_pending() {
            let title = self.title.clone();
            debug!(title = %title, "drain: loading sheet");
            return Box::pin(async move { Drained::Loaded(client.load_sheet(&title).await) });
        }

        let snapshot: Vec<Operation> = self
            .queue
            .iter()
            .filter_map(|p| match p {
                Pending::Op(op) => Some(op.bind_sheet(self.sheet_id)),
                Pending::Load => None,
            })
            .collect();
        let count = snapshot.len();
        debug!(batch = count, "drain: uploading batch");

        Box::pin(async move {
            let result = client
                .batch_update(Operations::new(snapshot))
                .await
                .map(|_| ());
            Drained::Uploaded { count, result }
        })
    }

    fn finish_drain(&mut self, drained: Drained) {
        let outcome = match drained {
            Drained::Loaded(Ok(sheet)) => {
                self.queue.pop_front();
                self.sheet_id = sheet.sheet_id;
                info!(title = %self.title, sheet_id = %sheet.sheet_id, "sheet ready");
                self.loaded.send_replace(Some(Arc::new(sheet)));
                Ok(())
            }
            Drained::Loaded(Err(e)) => Err(e),
            Drained::Uploaded { count, result: Ok(()) } => {
                self.queue.drain(..count);
                self.batches_uploaded += 1;
                debug!(uploaded = count, remaining = self.queue.len(), "drain: batch uploaded");
                Ok(())
            }
            Drained::Uploaded { result: Err(e), .. } => Err(e),
        };

        match outcome {
            // Re-check for operations that arrived mid-flight.
            Ok(()) => self.armed = true,
            Err(e) => {
                warn!(error = %e, pending = self.queue.len(), "drain failed, queue retained");
                self.armed = false;
                let message = e.to_string();
                for waiter in self.flush_waiters.drain(..) {
                    let _ = waiter.send(Err(Error::Upload(message.clone())));
                }
            }
        }
    }

    /// Resolves flush waiters once nothing is left to upload.
    fn settle_if_idle(&mut self) {
        if self.queue.is_empty() {
            for waiter in self.flush_waiters.drain(..) {
                let _ = waiter.send(Ok(()));
            }
        }
    }
}

// =============================================================================
// Uploader Loop
// =============================================================================

/// Runs the uploader until shutdown or until every handle is dropped.
///
/// Dropping all senders acts like a shutdown without a waiter: one final
/// drain attempt is made before the task exits.
async fn run_uploader(mut uploader: Uploader, mut rx: mpsc::UnboundedReceiver<UploadRequest>) {
    let mut in_flight: Option<DrainFuture> = None;
    let mut closing: Option<Option<oneshot::Sender<Result<()>>>> = None;
    let mut last_error: Option<String> = None;

    let shutdown_waiter = loop {
        if in_flight.is_none() {
            if uploader.armed && !uploader.queue.is_empty() {
                in_flight = Some(uploader.start_drain());
            } else {
                uploader.armed = false;
                uploader.settle_if_idle();
                if let Some(waiter) = closing.take() {
                    break waiter;
                }
            }
        }

        tokio::select! {
            request = rx.recv(), if closing.is_none() => match request {
                Some(UploadRequest::Enqueue(op)) => {
                    uploader.queue.push_back(Pending::Op(op));
                    uploader.armed = true;
                }
                Some(UploadRequest::Flush { response }) => {
                    if uploader.queue.is_empty() && in_flight.is_none() {
                        let _ = response.send(Ok(()));
                    } else {
                        uploader.flush_waiters.push(response);
                        uploader.armed = true;
                    }
                }
                Some(UploadRequest::Status { response }) => {
                    let _ = response.send(uploader.status(in_flight.is_some()));
                }
                Some(UploadRequest::Shutdown { response }) => {
                    closing = Some(Some(response));
                    uploader.armed = true;
                    last_error = None;
                }
                None => {
                    closing = Some(None);
                    uploader.armed = true;
                    last_error = None;
                }
            },
            drained = drive(&mut in_flight), if in_flight.is_some() => {
                in_flight = None;
                if let Drained::Loaded(Err(e)) | Drained::Uploaded { result: Err(e), .. } = &drained {
                    last_error = Some(e.to_string());
                }
                uploader.finish_drain(drained);
            }
        }
    };

    // Stop accepting requests before anyone learns the outcome.
    drop(rx);

    let result = if uploader.queue.is_empty() {
        Ok(())
    } else {
        let message = last_error.unwrap_or_else(|| "queue not drained".to_string());
        warn!(error = %message, pending = uploader.queue.len(), "uploader stopping with pending operations");
        Err(Error::Upload(message))
    };
    for flush in uploader.flush_waiters.drain(..) {
        let _ = flush.send(Err(Error::UploaderClosed));
    }
    if let Some(waiter) = shutdown_waiter {
        let _ = waiter.send(result);
    }

    debug!(title = %uploader.title, "uploader stopped");
}

/// Polls the in-flight drain; pending forever when there is none.
async fn drive(in_flight: &mut Option<DrainFuture>) -> Drained {
    match in_flight {
        Some(drain) => drain.await,
        None => std::future::pending().await,
    }
}

// =============================================================================
// Handle
// =============================================================================

/// Sending side of an uploader task.
#[derive(Clone)]
pub struct UploaderHandle {
    tx: mpsc::UnboundedSender<UploadRequest>,
}

impl UploaderHandle {
    /// True once the uploader task has stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Queues an operation. Never blocks.
    pub fn enqueue(&self, op: Operation) -> Result<()> {
        self.tx
            .send(UploadRequest::Enqueue(op))
            .map_err(|_| Error::UploaderClosed)
    }

    /// Waits until every queued operation is uploaded.
    pub async fn flush(&self) -> Result<()> {
        let (response, rx) = oneshot::channel();
        self.tx
            .send(UploadRequest::Flush { response })
            .map_err(|_| Error::UploaderClosed)?;
        rx.await.map_err(|_| Error::UploaderClosed)?
    }

    pub async fn status(&self) -> Result<UploadStatus> {
        let (response, rx) = oneshot::channel();
        self.tx
            .send(UploadRequest::Status { response })
            .map_err(|_| Error::UploaderClosed)?;
        rx.await.map_err(|_| Error::UploaderClosed)
    }

    /// Makes a final drain attempt and stops the task.
    pub async fn shutdown(&self) -> Result<()> {
        let (response, rx) = oneshot::channel();
        self.tx
            .send(UploadRequest::Shutdown { response })
            .map_err(|_| Error::UploaderClosed)?;
        rx.await.map_err(|_| Error::UploaderClosed)?
    }
}

/// Spawns the uploader for the sheet titled `title`.
///
/// The queue starts with a load marker, so the first drain (started right
/// away) resolves the sheet before any operation is sent. The returned
/// receiver yields the loaded sheet once that drain succeeds.
///
/// Must be called from within a tokio runtime.
pub fn spawn_uploader(
    client: Arc<SheetsClient>,
    title: impl Into<String>,
) -> (UploaderHandle, watch::Receiver<Option<Arc<LoadedSheet>>>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let (loaded_tx, loaded_rx) = watch::channel(None);

    let uploader = Uploader {
        client,
        title: title.into(),
        queue: VecDeque::from([Pending::Load]),
        sheet_id: SheetId::UNRESOLVED,
        batches_uploaded: 0,
        armed: true,
        flush_waiters: Vec::new(),
        loaded: loaded_tx,
    };

    tokio::spawn(run_uploader(uploader, rx));

    (UploaderHandle { tx }, loaded_rx)
}

// =============================================================================
// Tests
// =============================================================================
