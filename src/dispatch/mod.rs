//! Per-transport serial dispatch queues.
//!
//! Each [`DispatchQueue`] owns a bounded channel and a single worker thread
//! that calls [`Transport::record`](crate::transport::Transport::record) for
//! every submitted event in FIFO order. Producers only ever perform a
//! non-blocking (or bounded) send, so a slow or hung sink stalls its own
//! queue and nothing else.
//!
//! # Teardown
//!
//! [`DispatchQueue::close`] stops accepting work immediately and then applies
//! the transport's [`DrainPolicy`]: queued events are either recorded until
//! the drain deadline or discarded. A worker that fails to acknowledge in
//! time (for example because its sink is hung) is detached with a warning
//! rather than joined.

use std::{
    fmt, io,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    thread::JoinHandle,
    time::{Duration, Instant},
};

use crossbeam_channel::{SendTimeoutError, Sender, TrySendError, bounded};
use log::warn;
use parking_lot::Mutex;
use thiserror::Error;

use crate::{
    event::Event,
    rate_limited_warner::RateLimitedWarner,
    transport::{DrainPolicy, OverflowPolicy, Transport},
};

mod worker;

use worker::{QueueCommand, Shutdown, WorkerParts, spawn_worker};

/// Extra time granted to a worker to acknowledge shutdown after its drain
/// deadline, covering the event it may be recording at that moment.
const SHUTDOWN_ACK_GRACE: Duration = Duration::from_millis(100);

/// Errors returned when an event cannot be enqueued.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The queue is at capacity; the event was dropped.
    #[error("transport queue is full")]
    QueueFull,
    /// The queue has been closed; the event was dropped.
    #[error("transport queue is closed")]
    Closed,
    /// No space became available within the overflow timeout.
    #[error("timed out after {0:?} waiting for queue space")]
    Timeout(Duration),
    /// The worker thread could not be started.
    #[error("failed to spawn dispatch thread: {0}")]
    Spawn(#[from] io::Error),
}

/// What happened to an event once it reached the worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// `record` returned `true`.
    Delivered,
    /// `record` returned `false` (or panicked).
    Rejected,
    /// The transport was disabled when the event reached the front of the
    /// queue, so `record` was not called.
    Skipped,
    /// Discarded during teardown without being recorded.
    Discarded,
}

/// Counters shared between a queue handle and its worker.
#[derive(Debug, Default)]
pub struct DeliveryStats {
    enqueued: AtomicU64,
    dropped: AtomicU64,
    delivered: AtomicU64,
    rejected: AtomicU64,
    skipped: AtomicU64,
    discarded: AtomicU64,
}

impl DeliveryStats {
    pub(crate) fn count(&self, outcome: Outcome) {
        let counter = match outcome {
            Outcome::Delivered => &self.delivered,
            Outcome::Rejected => &self.rejected,
            Outcome::Skipped => &self.skipped,
            Outcome::Discarded => &self.discarded,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DeliverySnapshot {
        DeliverySnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`DeliveryStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeliverySnapshot {
    pub enqueued: u64,
    pub dropped: u64,
    pub delivered: u64,
    pub rejected: u64,
    pub skipped: u64,
    pub discarded: u64,
}

/// Serial execution context for a single transport.
///
/// Every method takes `&self`, so a queue can be shared behind an `Arc` and
/// closed while other threads are still submitting to it.
pub struct DispatchQueue {
    transport: Arc<dyn Transport>,
    tx: Mutex<Option<Sender<QueueCommand>>>,
    shutdown_tx: Sender<Shutdown>,
    handle: Mutex<Option<JoinHandle<()>>>,
    stats: Arc<DeliveryStats>,
    warner: RateLimitedWarner,
}

impl DispatchQueue {
    /// Start the worker thread for `transport` using its queue settings.
    pub fn spawn(transport: Arc<dyn Transport>) -> Result<Self, DispatchError> {
        let stats = Arc::new(DeliveryStats::default());
        let warner = RateLimitedWarner::new(transport.config().queue.warn_interval);
        let WorkerParts {
            tx,
            shutdown_tx,
            handle,
        } = spawn_worker(Arc::clone(&transport), Arc::clone(&stats))?;
        Ok(Self {
            transport,
            tx: Mutex::new(Some(tx)),
            shutdown_tx,
            handle: Mutex::new(Some(handle)),
            stats,
            warner,
        })
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn name(&self) -> &str {
        self.transport.name()
    }

    pub fn stats(&self) -> DeliverySnapshot {
        self.stats.snapshot()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.lock().is_none()
    }

    fn sender(&self) -> Option<Sender<QueueCommand>> {
        self.tx.lock().clone()
    }

    /// Enqueue `event` for recording on the worker thread.
    ///
    /// Never blocks longer than the configured overflow timeout, and never
    /// while holding a lock another caller needs. The
    /// accept gate is not evaluated here; callers route only accepted
    /// events (the worker still skips events if the transport has been
    /// disabled meanwhile).
    pub fn submit(&self, event: Arc<Event>) -> Result<(), DispatchError> {
        let Some(tx) = self.sender() else {
            self.note_drop("closed");
            return Err(DispatchError::Closed);
        };
        let result = match self.transport.config().queue.overflow_policy {
            OverflowPolicy::Drop => match tx.try_send(QueueCommand::Record(event)) {
                Ok(()) => Ok(()),
                Err(TrySendError::Full(_)) => Err(DispatchError::QueueFull),
                Err(TrySendError::Disconnected(_)) => Err(DispatchError::Closed),
            },
            OverflowPolicy::Timeout(dur) => {
                match tx.send_timeout(QueueCommand::Record(event), dur) {
                    Ok(()) => Ok(()),
                    Err(SendTimeoutError::Timeout(_)) => Err(DispatchError::Timeout(dur)),
                    Err(SendTimeoutError::Disconnected(_)) => Err(DispatchError::Closed),
                }
            }
        };
        match &result {
            Ok(()) => {
                self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
            }
            Err(DispatchError::QueueFull) | Err(DispatchError::Timeout(_)) => {
                self.note_drop("queue full")
            }
            Err(_) => self.note_drop("closed"),
        }
        result
    }

    fn note_drop(&self, reason: &str) {
        self.stats.dropped.fetch_add(1, Ordering::Relaxed);
        self.warner.record_drop();
        self.warner.warn_if_due(|count| {
            warn!(
                "femtotransport: transport '{}' {reason}; dropped {count} events",
                self.transport.name()
            );
        });
    }

    /// Wait until every event submitted before this call has been processed
    /// and the transport has flushed.
    ///
    /// Returns `false` when the queue is closed, the flush cannot be
    /// delivered, the transport reports a failed flush, or no
    /// acknowledgement arrives within the configured flush timeout.
    pub fn flush(&self) -> bool {
        let Some(tx) = self.sender() else {
            return false;
        };
        self.warner.flush(|count| {
            warn!(
                "femtotransport: transport '{}' dropped {count} events in the last interval",
                self.transport.name()
            );
        });
        let timeout = self.transport.config().queue.flush_timeout;
        let deadline = Instant::now() + timeout;
        let (ack_tx, ack_rx) = bounded(1);
        if tx.send_timeout(QueueCommand::Flush(ack_tx), timeout).is_err() {
            return false;
        }
        ack_rx.recv_deadline(deadline).unwrap_or(false)
    }

    /// Stop accepting events and tear down using the configured drain policy.
    pub fn close(&self) {
        let policy = self.transport.config().queue.drain_policy;
        self.close_with(policy);
    }

    /// Stop accepting events and tear down using `policy`.
    pub fn close_with(&self, policy: DrainPolicy) {
        // Dropped only after the worker acknowledges so it never mistakes a
        // closed queue for a disconnected one mid-drain.
        let Some(tx) = self.tx.lock().take() else {
            return;
        };
        let Some(handle) = self.handle.lock().take() else {
            return;
        };
        let wait = match policy {
            DrainPolicy::Drain { timeout } => timeout,
            DrainPolicy::Discard => self.transport.config().queue.flush_timeout,
        };
        let deadline = Instant::now() + wait;
        let (ack_tx, ack_rx) = bounded(1);
        let request = Shutdown {
            policy,
            deadline,
            ack: ack_tx,
        };
        if self.shutdown_tx.try_send(request).is_ok()
            && ack_rx.recv_deadline(deadline + SHUTDOWN_ACK_GRACE).is_err()
        {
            warn!(
                "femtotransport: worker for transport '{}' did not shut down within {wait:?}; detaching",
                self.transport.name()
            );
            return;
        }
        drop(tx);
        if handle.join().is_err() {
            warn!(
                "femtotransport: worker for transport '{}' panicked",
                self.transport.name()
            );
        }
    }
}

impl Drop for DispatchQueue {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for DispatchQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchQueue")
            .field("transport", &self.transport.name())
            .field("closed", &self.is_closed())
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}
