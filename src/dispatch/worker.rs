//! Worker thread driving a single transport.
//!
//! The worker owns the consumer end of the transport's queue and is the only
//! thread that ever calls [`Transport::record`] or [`Transport::flush`] for
//! that transport, which is what gives each sink FIFO ordering. Shutdown
//! requests arrive on a separate control channel so they are seen even when
//! the record queue is full.

use std::{
    io,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    thread::{self, JoinHandle},
    time::Instant,
};

use crossbeam_channel::{Receiver, Sender, TryRecvError, bounded, select};
use log::{error, warn};

use super::{DeliveryStats, Outcome};
use crate::{
    event::Event,
    rate_limited_warner::RateLimitedWarner,
    transport::{DrainPolicy, OutcomeCallback, Transport},
};

/// Commands processed in order with the queued events.
pub(crate) enum QueueCommand {
    Record(Arc<Event>),
    Flush(Sender<bool>),
}

/// Teardown request sent on the control channel.
pub(crate) struct Shutdown {
    pub(crate) policy: DrainPolicy,
    /// Events still queued after this instant are discarded.
    pub(crate) deadline: Instant,
    pub(crate) ack: Sender<()>,
}

/// Handle to the worker thread and its communication channels.
pub(crate) struct WorkerParts {
    pub(crate) tx: Sender<QueueCommand>,
    pub(crate) shutdown_tx: Sender<Shutdown>,
    pub(crate) handle: JoinHandle<()>,
}

/// Spawn the worker thread for `transport`.
///
/// The thread is named after the transport so stalled sinks are easy to
/// spot in thread dumps.
pub(crate) fn spawn_worker(
    transport: Arc<dyn Transport>,
    stats: Arc<DeliveryStats>,
) -> io::Result<WorkerParts> {
    let queue = transport.config().queue;
    let (tx, rx) = bounded(queue.capacity);
    let (shutdown_tx, shutdown_rx) = bounded(1);
    let worker = Worker {
        callback: transport.config().on_outcome.clone(),
        warner: RateLimitedWarner::new(queue.warn_interval),
        transport,
        stats,
    };
    let handle = thread::Builder::new()
        .name(format!("femtotransport-{}", worker.transport.name()))
        .spawn(move || worker.run(rx, shutdown_rx))?;
    Ok(WorkerParts {
        tx,
        shutdown_tx,
        handle,
    })
}

struct Worker {
    transport: Arc<dyn Transport>,
    stats: Arc<DeliveryStats>,
    callback: Option<OutcomeCallback>,
    warner: RateLimitedWarner,
}

impl Worker {
    fn run(self, rx: Receiver<QueueCommand>, shutdown_rx: Receiver<Shutdown>) {
        loop {
            // A pending shutdown wins over queued records so the drain
            // policy applies to everything still in the queue.
            if let Ok(req) = shutdown_rx.try_recv() {
                self.shutdown(&rx, req);
                break;
            }
            select! {
                recv(rx) -> cmd => match cmd {
                    Ok(cmd) => self.handle_command(cmd),
                    Err(_) => break,
                },
                recv(shutdown_rx) -> req => {
                    if let Ok(req) = req {
                        self.shutdown(&rx, req);
                    }
                    break;
                }
            }
        }
        self.warner.flush(|count| {
            warn!(
                "femtotransport: transport '{}' rejected {count} events",
                self.transport.name()
            );
        });
    }

    fn shutdown(&self, rx: &Receiver<QueueCommand>, req: Shutdown) {
        self.drain_pending(rx, req.policy, req.deadline);
        self.flush_transport();
        let _ = req.ack.send(());
    }

    fn handle_command(&self, cmd: QueueCommand) {
        match cmd {
            QueueCommand::Record(event) => self.process(&event),
            QueueCommand::Flush(ack) => {
                let flushed = self.flush_transport();
                let _ = ack.send(flushed);
            }
        }
    }

    /// Record one event, honouring the enabled flag at execution time.
    fn process(&self, event: &Event) {
        let outcome = if !self.transport.is_enabled() {
            Outcome::Skipped
        } else {
            match panic::catch_unwind(AssertUnwindSafe(|| self.transport.record(event))) {
                Ok(true) => Outcome::Delivered,
                Ok(false) => {
                    self.warner.record_drop();
                    self.warner.warn_if_due(|count| {
                        warn!(
                            "femtotransport: transport '{}' rejected {count} events",
                            self.transport.name()
                        );
                    });
                    Outcome::Rejected
                }
                Err(_) => {
                    error!(
                        "femtotransport: transport '{}' panicked while recording; event treated as rejected",
                        self.transport.name()
                    );
                    Outcome::Rejected
                }
            }
        };
        self.finish(event, outcome);
    }

    fn discard(&self, event: &Event) {
        self.finish(event, Outcome::Discarded);
    }

    fn finish(&self, event: &Event, outcome: Outcome) {
        self.stats.count(outcome);
        let Some(callback) = &self.callback else {
            return;
        };
        if panic::catch_unwind(AssertUnwindSafe(|| callback(event, outcome))).is_err() {
            error!(
                "femtotransport: outcome callback for transport '{}' panicked",
                self.transport.name()
            );
        }
    }

    fn flush_transport(&self) -> bool {
        panic::catch_unwind(AssertUnwindSafe(|| self.transport.flush())).unwrap_or_else(|_| {
            error!(
                "femtotransport: transport '{}' panicked while flushing",
                self.transport.name()
            );
            false
        })
    }

    /// Empty the queue according to `policy`.
    ///
    /// With [`DrainPolicy::Drain`] events are recorded until `deadline`;
    /// anything still queued afterwards is discarded.
    fn drain_pending(&self, rx: &Receiver<QueueCommand>, policy: DrainPolicy, deadline: Instant) {
        let mut discarded = 0_u64;
        loop {
            match rx.try_recv() {
                Ok(QueueCommand::Record(event)) => {
                    let draining = matches!(policy, DrainPolicy::Drain { .. });
                    if draining && Instant::now() < deadline {
                        self.process(&event);
                    } else {
                        discarded += 1;
                        self.discard(&event);
                    }
                }
                Ok(QueueCommand::Flush(ack)) => {
                    let _ = ack.send(false);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        if discarded > 0 {
            warn!(
                "femtotransport: transport '{}' discarded {discarded} queued events during shutdown",
                self.transport.name()
            );
        }
    }
}
