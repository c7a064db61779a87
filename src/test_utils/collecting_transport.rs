//! In-memory transports for test assertions.

use std::{any::Any, sync::Arc, time::Duration};

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use parking_lot::Mutex;

use crate::{
    event::Event,
    transport::{ConfigError, Transport, TransportConfig, TransportCore},
};

/// A formatted record as seen by [`CollectingTransport`].
#[derive(Clone, Debug)]
pub struct Collected {
    pub logger: String,
    pub level: crate::level::Level,
    pub message: String,
    pub formatted: String,
    /// The event exactly as the worker handed it over.
    pub event: Event,
}

/// Transport that stores every event it records.
pub struct CollectingTransport {
    core: TransportCore,
    records: Mutex<Vec<Collected>>,
    reject: Mutex<bool>,
}

impl CollectingTransport {
    pub fn new(name: &str) -> Self {
        Self::build(name, |cfg| cfg).unwrap_or_else(|err| panic!("{err}"))
    }

    pub fn build<F>(name: &str, transform: F) -> Result<Self, ConfigError>
    where
        F: FnOnce(TransportConfig) -> TransportConfig,
    {
        Ok(Self {
            core: TransportCore::build(name, transform)?,
            records: Mutex::new(Vec::new()),
            reject: Mutex::new(false),
        })
    }

    /// Make subsequent `record` calls return `false` without storing.
    pub fn reject_all(&self, reject: bool) {
        *self.reject.lock() = reject;
    }

    /// Snapshot of everything recorded so far.
    pub fn collected(&self) -> Vec<Collected> {
        self.records.lock().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .map(|r| r.message.clone())
            .collect()
    }

    /// Output of the formatter chain for each recorded event.
    pub fn formatted(&self) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .map(|r| r.formatted.clone())
            .collect()
    }

    pub fn events(&self) -> Vec<Event> {
        self.records.lock().iter().map(|r| r.event.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl Transport for CollectingTransport {
    fn core(&self) -> &TransportCore {
        &self.core
    }

    fn record(&self, event: &Event) -> bool {
        if !self.is_enabled() || *self.reject.lock() {
            return false;
        }
        let formatted = self.core.format(event);
        self.records.lock().push(Collected {
            logger: event.logger().to_owned(),
            level: event.level(),
            message: event.message().to_owned(),
            formatted,
            event: event.clone(),
        });
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// One-shot latch used to hold a [`BlockingTransport`] inside `record`.
#[derive(Clone)]
pub struct Gate {
    release_tx: Sender<()>,
    release_rx: Receiver<()>,
}

impl Gate {
    fn new() -> Self {
        let (release_tx, release_rx) = bounded(1);
        Self {
            release_tx,
            release_rx,
        }
    }

    /// Let the blocked `record` call return.
    pub fn release(&self) {
        let _ = self.release_tx.try_send(());
    }

    /// Release the gate from a helper thread after `delay`.
    pub fn release_after(&self, delay: Duration) -> std::thread::JoinHandle<()> {
        let gate = self.clone();
        std::thread::spawn(move || {
            std::thread::sleep(delay);
            gate.release();
        })
    }
}

/// Transport whose first `record` call blocks until its [`Gate`] opens.
///
/// Every later call records immediately into the wrapped
/// [`CollectingTransport`]. Tests use it to hold events in the queue while
/// they toggle state or tear the queue down.
pub struct BlockingTransport {
    inner: CollectingTransport,
    gate: Gate,
    entered_tx: Sender<()>,
    entered_rx: Receiver<()>,
    blocked_once: Mutex<bool>,
}

impl BlockingTransport {
    pub fn build<F>(name: &str, transform: F) -> Result<Self, ConfigError>
    where
        F: FnOnce(TransportConfig) -> TransportConfig,
    {
        let (entered_tx, entered_rx) = unbounded();
        Ok(Self {
            inner: CollectingTransport::build(name, transform)?,
            gate: Gate::new(),
            entered_tx,
            entered_rx,
            blocked_once: Mutex::new(false),
        })
    }

    pub fn gate(&self) -> Gate {
        self.gate.clone()
    }

    /// Wait until the worker is parked inside the blocking `record` call.
    pub fn wait_until_entered(&self, timeout: Duration) -> bool {
        self.entered_rx.recv_timeout(timeout).is_ok()
    }

    pub fn messages(&self) -> Vec<String> {
        self.inner.messages()
    }

    pub fn events(&self) -> Vec<Event> {
        self.inner.events()
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl Transport for BlockingTransport {
    fn core(&self) -> &TransportCore {
        self.inner.core()
    }

    fn record(&self, event: &Event) -> bool {
        let first = {
            let mut blocked = self.blocked_once.lock();
            !std::mem::replace(&mut *blocked, true)
        };
        if first {
            let _ = self.entered_tx.send(());
            let _ = self.gate.release_rx.recv();
        }
        self.inner.record(event)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
