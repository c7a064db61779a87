//! Configuration consumed by transports and their dispatch queues.
//!
//! A [`TransportConfig`] is produced once per transport by applying a pure
//! transform to [`TransportConfig::new`], validated, and then owned by the
//! transport's [`TransportCore`](super::TransportCore). Nothing hands out a
//! mutable reference afterwards.

use std::{fmt, sync::Arc, time::Duration};

use thiserror::Error;

use crate::{
    dispatch::Outcome,
    event::Event,
    filters::{EventFilter, SharedFilter},
    formatter::{EventFormatter, FormatterChain, SharedFormatter},
    level::Level,
    rate_limited_warner::DEFAULT_WARN_INTERVAL,
};

/// Default bounded channel capacity for a transport queue.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
/// Default time allowed for a flush acknowledgement.
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);
/// Default time allowed for draining a queue during teardown.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Errors raised while validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid user supplied configuration.
    #[error("invalid transport configuration: {0}")]
    InvalidConfig(String),
}

/// Determines how a queue reacts when it is full.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Drop the new event immediately.
    #[default]
    Drop,
    /// Wait up to the given duration for space before dropping.
    ///
    /// The wait happens on the producing thread, so a full transport delays
    /// that producer's delivery to transports registered after it.
    Timeout(Duration),
}

/// What happens to queued events when a transport is torn down.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrainPolicy {
    /// Record queued events until the queue is empty or `timeout` elapses.
    Drain { timeout: Duration },
    /// Discard queued events without recording them.
    Discard,
}

impl Default for DrainPolicy {
    fn default() -> Self {
        Self::Drain {
            timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }
}

/// Settings for a transport's private dispatch queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueConfig {
    /// Bounded queue size for events waiting to be recorded.
    pub capacity: usize,
    pub overflow_policy: OverflowPolicy,
    pub drain_policy: DrainPolicy,
    /// How long `flush` waits for the worker to acknowledge.
    pub flush_timeout: Duration,
    /// Interval between rate-limited drop and rejection warnings.
    pub warn_interval: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CHANNEL_CAPACITY,
            overflow_policy: OverflowPolicy::default(),
            drain_policy: DrainPolicy::default(),
            flush_timeout: DEFAULT_FLUSH_TIMEOUT,
            warn_interval: DEFAULT_WARN_INTERVAL,
        }
    }
}

/// Callback told about the result of every event a queue processes.
pub type OutcomeCallback = Arc<dyn Fn(&Event, Outcome) + Send + Sync>;

/// Configuration owned by a single transport.
#[derive(Clone)]
pub struct TransportConfig {
    /// Identity of the transport within its pipeline.
    pub name: String,
    /// Formatters applied left to right to produce the outgoing message.
    pub formatters: FormatterChain,
    /// Extra acceptance predicates evaluated by the pipeline.
    pub filters: Vec<SharedFilter>,
    /// Initial minimum accepted level (`None` accepts every level).
    pub minimum_level: Option<Level>,
    /// Initial value of the enabled flag.
    pub enabled: bool,
    /// Logger name stamped on outgoing records; defaults to the event's.
    pub logger_name: Option<String>,
    /// Deployment environment tag (for example `production`).
    pub environment: Option<String>,
    pub queue: QueueConfig,
    pub on_outcome: Option<OutcomeCallback>,
}

impl TransportConfig {
    /// Default configuration for a transport called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            formatters: FormatterChain::new(),
            filters: Vec::new(),
            minimum_level: None,
            enabled: true,
            logger_name: None,
            environment: None,
            queue: QueueConfig::default(),
            on_outcome: None,
        }
    }

    /// Apply `transform` to the defaults for `name` and validate the result.
    pub fn build<F>(name: impl Into<String>, transform: F) -> Result<Self, ConfigError>
    where
        F: FnOnce(Self) -> Self,
    {
        let config = transform(Self::new(name));
        config.validate()?;
        Ok(config)
    }

    pub fn with_formatter<F>(mut self, formatter: F) -> Self
    where
        F: EventFormatter + 'static,
    {
        self.formatters.push(formatter);
        self
    }

    pub fn with_shared_formatter(mut self, formatter: SharedFormatter) -> Self {
        self.formatters.push_shared(formatter);
        self
    }

    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: EventFilter + 'static,
    {
        self.filters.push(Arc::new(filter));
        self
    }

    pub fn with_shared_filter(mut self, filter: SharedFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_minimum_level(mut self, level: Level) -> Self {
        self.minimum_level = Some(level);
        self
    }

    /// Start the transport disabled.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn with_logger_name(mut self, name: impl Into<String>) -> Self {
        self.logger_name = Some(name.into());
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.queue.capacity = capacity;
        self
    }

    pub fn with_overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.queue.overflow_policy = policy;
        self
    }

    pub fn with_drain_policy(mut self, policy: DrainPolicy) -> Self {
        self.queue.drain_policy = policy;
        self
    }

    pub fn with_flush_timeout(mut self, timeout: Duration) -> Self {
        self.queue.flush_timeout = timeout;
        self
    }

    pub fn with_warn_interval(mut self, interval: Duration) -> Self {
        self.queue.warn_interval = interval;
        self
    }

    pub fn with_outcome_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Event, Outcome) + Send + Sync + 'static,
    {
        self.on_outcome = Some(Arc::new(callback));
        self
    }

    /// Check invariants the dispatch queue relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "transport name must not be empty".into(),
            ));
        }
        if self.queue.capacity == 0 {
            return Err(ConfigError::InvalidConfig(
                "capacity must be greater than zero".into(),
            ));
        }
        if self.queue.flush_timeout.is_zero() {
            return Err(ConfigError::InvalidConfig(
                "flush_timeout must be greater than zero".into(),
            ));
        }
        if let OverflowPolicy::Timeout(duration) = self.queue.overflow_policy
            && duration.is_zero()
        {
            return Err(ConfigError::InvalidConfig(
                "overflow timeout must be greater than zero".into(),
            ));
        }
        if let DrainPolicy::Drain { timeout } = self.queue.drain_policy
            && timeout.is_zero()
        {
            return Err(ConfigError::InvalidConfig(
                "drain timeout must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for TransportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportConfig")
            .field("name", &self.name)
            .field("formatters", &self.formatters.len())
            .field("filters", &self.filters.len())
            .field("minimum_level", &self.minimum_level)
            .field("enabled", &self.enabled)
            .field("logger_name", &self.logger_name)
            .field("environment", &self.environment)
            .field("queue", &self.queue)
            .field("on_outcome", &self.on_outcome.is_some())
            .finish()
    }
}
