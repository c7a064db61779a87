//! The owning router that fans events out to registered transports.
//!
//! A [`Pipeline`] holds one [`DispatchQueue`] per registered transport. For
//! every event it evaluates each transport's accept gate on the calling
//! thread and enqueues a shared `Arc<Event>` on the queues that accept it.
//! Producers never wait on a sink: enqueueing is non-blocking (or bounded by
//! the transport's overflow timeout), so one slow transport cannot delay
//! another.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU8, AtomicU64, Ordering},
    },
};

use log::debug;
use parking_lot::RwLock;
use thiserror::Error;

use crate::{
    dispatch::{DeliverySnapshot, DispatchError, DispatchQueue},
    event::Event,
    level::Level,
    transport::{ConfigError, Transport},
};

/// Errors raised while registering transports.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A transport with the same name is already registered.
    #[error("a transport named '{0}' is already registered")]
    DuplicateTransport(String),
    /// The transport's configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The transport's dispatch queue could not be started.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Router holding every transport and its dispatch queue.
pub struct Pipeline {
    name: String,
    level: AtomicU8,
    queues: RwLock<Vec<Arc<DispatchQueue>>>,
    dropped: AtomicU64,
}

impl Pipeline {
    /// Create an empty pipeline that forwards events of every level.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: AtomicU8::new(u8::from(Level::Trace)),
            queues: RwLock::new(Vec::new()),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn builder(name: impl Into<String>) -> PipelineBuilder {
        PipelineBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register `transport` and start its dispatch queue.
    ///
    /// Returns a shared handle so callers can keep toggling the transport
    /// after registration.
    pub fn add_transport<T>(&self, transport: T) -> Result<Arc<T>, PipelineError>
    where
        T: Transport + 'static,
    {
        let transport = Arc::new(transport);
        self.add_shared(Arc::clone(&transport) as Arc<dyn Transport>)?;
        Ok(transport)
    }

    /// Register an already shared transport.
    pub fn add_shared(&self, transport: Arc<dyn Transport>) -> Result<(), PipelineError> {
        let mut queues = self.queues.write();
        if queues.iter().any(|q| q.name() == transport.name()) {
            return Err(PipelineError::DuplicateTransport(
                transport.name().to_owned(),
            ));
        }
        queues.push(Arc::new(DispatchQueue::spawn(transport)?));
        Ok(())
    }

    /// Unregister the transport called `name`, tearing its queue down with
    /// the transport's drain policy.
    ///
    /// Returns `false` if no such transport was registered.
    pub fn remove_transport(&self, name: &str) -> bool {
        let removed = {
            let mut queues = self.queues.write();
            queues
                .iter()
                .position(|q| q.name() == name)
                .map(|idx| queues.remove(idx))
        };
        match removed {
            Some(queue) => {
                queue.close();
                true
            }
            None => false,
        }
    }

    pub fn transport(&self, name: &str) -> Option<Arc<dyn Transport>> {
        self.queues
            .read()
            .iter()
            .find(|q| q.name() == name)
            .map(|q| Arc::clone(q.transport()))
    }

    /// Names of the registered transports in registration order.
    pub fn transport_names(&self) -> Vec<String> {
        self.queues
            .read()
            .iter()
            .map(|q| q.name().to_owned())
            .collect()
    }

    pub fn set_level(&self, level: Level) {
        self.level.store(u8::from(level), Ordering::Relaxed);
    }

    pub fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed)).unwrap_or(Level::Trace)
    }

    /// Whether events at `level` pass the pipeline-wide threshold.
    pub fn is_enabled_for(&self, level: Level) -> bool {
        u8::from(level) >= self.level.load(Ordering::Relaxed)
    }

    /// Route `event` to every accepting transport.
    ///
    /// Returns the number of queues the event was enqueued on.
    pub fn log(&self, event: Event) -> usize {
        self.dispatch(Arc::new(event))
    }

    /// Convenience wrapper logging `message` under the pipeline's name.
    pub fn log_message(&self, level: Level, message: impl Into<String>) -> usize {
        self.log(Event::new(self.name.as_str(), level, message))
    }

    /// Route a shared event to every accepting transport.
    ///
    /// Submits against a snapshot of the registered queues, so a transport
    /// waiting out [`OverflowPolicy::Timeout`](crate::transport::OverflowPolicy::Timeout)
    /// holds up only this call, never registration, removal or other
    /// producers.
    pub fn dispatch(&self, event: Arc<Event>) -> usize {
        if !self.is_enabled_for(event.level()) {
            return 0;
        }
        let queues = self.snapshot();
        let mut enqueued = 0;
        for queue in queues.iter() {
            if !queue.transport().accepts(&event) {
                continue;
            }
            match queue.submit(Arc::clone(&event)) {
                Ok(()) => enqueued += 1,
                Err(err) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        "femtotransport: pipeline '{}' could not enqueue on '{}': {err}",
                        self.name,
                        queue.name()
                    );
                }
            }
        }
        enqueued
    }

    fn snapshot(&self) -> Vec<Arc<DispatchQueue>> {
        self.queues.read().clone()
    }

    /// Flush every transport, returning `true` only if all succeeded.
    pub fn flush(&self) -> bool {
        self.snapshot()
            .iter()
            .fold(true, |ok, queue| queue.flush() && ok)
    }

    /// Remove every transport and tear down their queues.
    pub fn shutdown(&self) {
        let queues = std::mem::take(&mut *self.queues.write());
        for queue in queues {
            queue.close();
        }
    }

    /// Delivery counters for the transport called `name`.
    pub fn stats(&self, name: &str) -> Option<DeliverySnapshot> {
        self.queues
            .read()
            .iter()
            .find(|q| q.name() == name)
            .map(|q| q.stats())
    }

    /// Total events that accepting transports could not enqueue.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("level", &self.level())
            .field("transports", &self.transport_names())
            .field("dropped", &self.dropped())
            .finish()
    }
}

/// Builder assembling a [`Pipeline`] from transports and a threshold.
pub struct PipelineBuilder {
    name: String,
    level: Level,
    transports: Vec<Arc<dyn Transport>>,
}

impl PipelineBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: Level::Trace,
            transports: Vec::new(),
        }
    }

    /// Pipeline-wide threshold applied before any transport gate.
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_transport<T>(mut self, transport: T) -> Self
    where
        T: Transport + 'static,
    {
        self.transports.push(Arc::new(transport));
        self
    }

    pub fn with_shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transports.push(transport);
        self
    }

    /// Start a dispatch queue for each transport.
    ///
    /// Fails on the first duplicate name or queue spawn failure; queues
    /// already started are torn down.
    pub fn build(self) -> Result<Pipeline, PipelineError> {
        let pipeline = Pipeline::new(self.name);
        pipeline.set_level(self.level);
        for transport in self.transports {
            pipeline.add_shared(transport)?;
        }
        Ok(pipeline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        test_utils::{BlockingTransport, CollectingTransport},
        transport::OverflowPolicy,
    };
    use rstest::rstest;
    use std::{
        thread,
        time::{Duration, Instant},
    };

    #[test]
    fn routes_only_to_accepting_transports() {
        let pipeline = Pipeline::new("app");
        let all = pipeline
            .add_transport(CollectingTransport::new("all"))
            .expect("register");
        let errors = pipeline
            .add_transport(
                CollectingTransport::build("errors", |cfg| cfg.with_minimum_level(Level::Error))
                    .expect("config"),
            )
            .expect("register");

        assert_eq!(pipeline.log_message(Level::Info, "hello"), 1);
        assert_eq!(pipeline.log_message(Level::Critical, "boom"), 2);
        assert!(pipeline.flush());

        assert_eq!(all.messages(), vec!["hello", "boom"]);
        assert_eq!(errors.messages(), vec!["boom"]);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let pipeline = Pipeline::new("app");
        pipeline
            .add_transport(CollectingTransport::new("sink"))
            .expect("register");
        let result = pipeline.add_transport(CollectingTransport::new("sink"));
        assert!(matches!(result, Err(PipelineError::DuplicateTransport(name)) if name == "sink"));
        assert_eq!(pipeline.transport_names(), vec!["sink"]);
    }

    #[test]
    fn removed_transport_receives_nothing_further() {
        let pipeline = Pipeline::new("app");
        let sink = pipeline
            .add_transport(CollectingTransport::new("sink"))
            .expect("register");
        pipeline.log_message(Level::Info, "before");
        assert!(pipeline.remove_transport("sink"));
        assert!(!pipeline.remove_transport("sink"));
        assert_eq!(pipeline.log_message(Level::Info, "after"), 0);
        assert_eq!(sink.messages(), vec!["before"]);
    }

    #[rstest]
    #[case(Level::Debug, 0)]
    #[case(Level::Warning, 1)]
    #[case(Level::Emergency, 1)]
    fn pipeline_level_gates_before_transports(#[case] level: Level, #[case] expected: usize) {
        let pipeline = Pipeline::builder("app")
            .with_level(Level::Warning)
            .with_transport(CollectingTransport::new("sink"))
            .build()
            .expect("build");
        assert_eq!(pipeline.log_message(level, "m"), expected);
    }

    #[test]
    fn shutdown_unregisters_everything() {
        let pipeline = Pipeline::new("app");
        let sink = pipeline
            .add_transport(CollectingTransport::new("sink"))
            .expect("register");
        pipeline.log_message(Level::Info, "queued");
        pipeline.shutdown();
        assert!(pipeline.transport_names().is_empty());
        assert_eq!(sink.messages(), vec!["queued"]);
        assert!(pipeline.flush());
    }

    #[test]
    fn stats_are_reported_per_transport() {
        let pipeline = Pipeline::new("app");
        pipeline
            .add_transport(CollectingTransport::new("sink"))
            .expect("register");
        pipeline.log_message(Level::Info, "a");
        pipeline.log_message(Level::Info, "b");
        assert!(pipeline.flush());
        let stats = pipeline.stats("sink").expect("stats");
        assert_eq!(stats.enqueued, 2);
        assert_eq!(stats.delivered, 2);
        assert!(pipeline.stats("missing").is_none());
    }

    #[test]
    fn waiting_producer_does_not_block_registration() {
        let pipeline = Arc::new(Pipeline::new("app"));
        let slow = pipeline
            .add_transport(
                BlockingTransport::build("slow", |cfg| {
                    cfg.with_capacity(1)
                        .with_overflow_policy(OverflowPolicy::Timeout(Duration::from_millis(500)))
                        .with_drain_policy(crate::transport::DrainPolicy::Discard)
                })
                .expect("config"),
            )
            .expect("register");
        pipeline.log_message(Level::Info, "blocker");
        assert!(slow.wait_until_entered(Duration::from_secs(2)));
        pipeline.log_message(Level::Info, "fills the queue");

        let producer = {
            let pipeline = Arc::clone(&pipeline);
            thread::spawn(move || pipeline.log_message(Level::Info, "waits for space"))
        };
        thread::sleep(Duration::from_millis(50));

        let started = Instant::now();
        pipeline
            .add_transport(CollectingTransport::new("late"))
            .expect("register");
        assert!(pipeline.remove_transport("late"));
        assert!(started.elapsed() < Duration::from_millis(250));

        assert_eq!(producer.join().expect("producer"), 0);
        slow.gate().release();
        pipeline.shutdown();
    }
}
