//! The transport contract implemented by every sink adapter.
//!
//! A [`Transport`] owns a [`TransportCore`]: its immutable
//! [`TransportConfig`] plus the atomic [`TransportState`] toggles. The
//! provided trait methods read and flip those toggles, so adapters only have
//! to implement [`Transport::record`] (and optionally [`Transport::flush`]).
//!
//! Transports are driven by a [`DispatchQueue`](crate::dispatch::DispatchQueue):
//! `record` always runs on the transport's own worker thread, one event at a
//! time, in submission order.

use std::any::Any;

use crate::{event::Event, level::Level};

pub mod config;
mod state;

pub use config::{
    ConfigError, DEFAULT_CHANNEL_CAPACITY, DrainPolicy, OutcomeCallback, OverflowPolicy,
    QueueConfig, TransportConfig,
};
pub use state::{Acceptance, TransportState};

/// Configuration and runtime state shared by every transport.
#[derive(Debug)]
pub struct TransportCore {
    config: TransportConfig,
    state: TransportState,
}

impl TransportCore {
    /// Validate `config` and seed the runtime toggles from it.
    pub fn new(config: TransportConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let state = TransportState::new(config.enabled, config.minimum_level);
        Ok(Self { config, state })
    }

    /// Build the configuration from `name` and `transform`, then wrap it.
    pub fn build<F>(name: impl Into<String>, transform: F) -> Result<Self, ConfigError>
    where
        F: FnOnce(TransportConfig) -> TransportConfig,
    {
        Self::new(TransportConfig::build(name, transform)?)
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn state(&self) -> &TransportState {
        &self.state
    }

    /// Run the configured formatter chain over `event`.
    pub fn format(&self, event: &Event) -> String {
        self.config.formatters.format(event)
    }

    /// Full accept decision: enabled flag, minimum level and filters.
    pub fn accepts(&self, event: &Event) -> bool {
        self.state.accepts(event.level())
            && self.config.filters.iter().all(|filter| filter.should_log(event))
    }
}

/// Trait implemented by all sinks.
///
/// `Transport` is `Send + Sync` because the pipeline evaluates `accepts` on
/// producer threads while `record` runs on the dispatch thread.
pub trait Transport: Send + Sync {
    fn core(&self) -> &TransportCore;

    /// Deliver one event to the sink.
    ///
    /// Returns `true` when the sink accepted the event for delivery and
    /// `false` when it rejected it synchronously. Expected failures (I/O
    /// errors, refused payloads) are reported through the return value and
    /// never by panicking. A disabled transport returns `false` without
    /// touching the sink.
    fn record(&self, event: &Event) -> bool;

    /// Flush buffered output. Defaults to a no-op that reports success.
    fn flush(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        &self.core().config().name
    }

    fn config(&self) -> &TransportConfig {
        self.core().config()
    }

    fn is_enabled(&self) -> bool {
        self.core().state().is_enabled()
    }

    fn set_enabled(&self, enabled: bool) {
        self.core().state().set_enabled(enabled);
    }

    fn minimum_accepted_level(&self) -> Option<Level> {
        self.core().state().minimum_level()
    }

    fn set_minimum_accepted_level(&self, level: Option<Level>) {
        self.core().state().set_minimum_level(level);
    }

    /// Whether the pipeline should dispatch `event` to this transport.
    fn accepts(&self, event: &Event) -> bool {
        self.core().accepts(event)
    }

    /// Allow callers to downcast a shared transport to its concrete type.
    fn as_any(&self) -> &dyn Any;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::NameFilterBuilder;
    use crate::filters::FilterBuilderTrait;

    struct Noop {
        core: TransportCore,
    }

    impl Transport for Noop {
        fn core(&self) -> &TransportCore {
            &self.core
        }

        fn record(&self, _event: &Event) -> bool {
            self.is_enabled()
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn noop(transform: impl FnOnce(TransportConfig) -> TransportConfig) -> Noop {
        Noop {
            core: TransportCore::build("noop", transform).expect("valid config"),
        }
    }

    #[test]
    fn provided_methods_read_core_state() {
        let transport = noop(|cfg| cfg.with_minimum_level(Level::Warning));
        assert_eq!(transport.name(), "noop");
        assert_eq!(transport.minimum_accepted_level(), Some(Level::Warning));
        assert!(!transport.accepts(&Event::new("core", Level::Info, "m")));
        assert!(transport.accepts(&Event::new("core", Level::Error, "m")));

        transport.set_minimum_accepted_level(None);
        assert!(transport.accepts(&Event::new("core", Level::Info, "m")));
    }

    #[test]
    fn filters_participate_in_acceptance() {
        let filter = NameFilterBuilder::new()
            .with_prefix("db")
            .build()
            .expect("filter");
        let transport = noop(|cfg| cfg.with_shared_filter(filter));
        assert!(transport.accepts(&Event::new("db.pool", Level::Info, "m")));
        assert!(!transport.accepts(&Event::new("api", Level::Info, "m")));
    }

    #[test]
    fn disabled_config_starts_disabled() {
        let transport = noop(TransportConfig::disabled);
        assert!(!transport.is_enabled());
        assert!(!transport.accepts(&Event::new("core", Level::Emergency, "m")));
        transport.set_enabled(true);
        assert!(transport.is_enabled());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let result = TransportCore::build("noop", |cfg| cfg.with_capacity(0));
        assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));
    }
}
