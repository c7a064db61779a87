//! Transport forwarding events to an error-tracking service.
//!
//! The service itself sits behind [`ErrorTrackerClient`] so the transport
//! stays independent of any particular SDK. Each recorded event is formatted
//! with the transport's chain, mapped onto a [`TrackedEvent`] (environment,
//! logger name, user, tags and non-nil extras) and handed to
//! [`ErrorTrackerClient::capture`].
//!
//! When [`ErrorTrackerConfig::client_options`] is set the constructor
//! initialises the SDK. A failed initialisation is logged once, kept in
//! [`ErrorTrackerTransport::init_error`], and leaves the transport
//! permanently disabled.

use std::{any::Any, sync::Arc};

use log::error;

use crate::{
    event::Event,
    transport::{ConfigError, Transport, TransportConfig, TransportCore},
};

mod client;
mod payload;

pub use client::{ClientError, ClientOptions, ErrorTrackerClient, SdkInit};
pub use payload::{TrackedEvent, TrackedLevel, TrackedUser};

/// Configuration for [`ErrorTrackerTransport`].
#[derive(Clone, Debug)]
pub struct ErrorTrackerConfig {
    pub transport: TransportConfig,
    /// SDK options; `None` when the SDK is initialised elsewhere.
    pub client_options: Option<ClientOptions>,
}

impl ErrorTrackerConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            transport: TransportConfig::new(name),
            client_options: None,
        }
    }

    pub fn with_client_options(mut self, options: ClientOptions) -> Self {
        self.client_options = Some(options);
        self
    }

    /// Customise the shared transport settings.
    pub fn with_transport<F>(mut self, transform: F) -> Self
    where
        F: FnOnce(TransportConfig) -> TransportConfig,
    {
        self.transport = transform(self.transport);
        self
    }
}

/// Transport delivering events through an [`ErrorTrackerClient`].
pub struct ErrorTrackerTransport<C: ErrorTrackerClient> {
    core: TransportCore,
    client: Arc<C>,
    init_error: Option<ClientError>,
}

impl<C: ErrorTrackerClient> ErrorTrackerTransport<C> {
    /// Create a transport called `name` using `client`.
    ///
    /// Only configuration errors are returned; SDK initialisation failures
    /// disable the transport instead.
    pub fn new<F>(name: impl Into<String>, client: Arc<C>, transform: F) -> Result<Self, ConfigError>
    where
        F: FnOnce(ErrorTrackerConfig) -> ErrorTrackerConfig,
    {
        let config = transform(ErrorTrackerConfig::new(name));
        let core = TransportCore::new(config.transport)?;
        let init_error = config
            .client_options
            .as_ref()
            .and_then(|options| client.initialize(options).err());
        if let Some(err) = &init_error {
            error!(
                "femtotransport: error tracker transport '{}' disabled: {err}",
                core.config().name
            );
            core.state().disable_permanently();
        }
        Ok(Self {
            core,
            client,
            init_error,
        })
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    /// The SDK initialisation failure that disabled this transport, if any.
    pub fn init_error(&self) -> Option<&ClientError> {
        self.init_error.as_ref()
    }
}

impl<C: ErrorTrackerClient + 'static> Transport for ErrorTrackerTransport<C> {
    fn core(&self) -> &TransportCore {
        &self.core
    }

    fn record(&self, event: &Event) -> bool {
        if !self.is_enabled() {
            return false;
        }
        let message = self.core.format(event);
        let tracked = TrackedEvent::from_event(event, message, self.config());
        match self.client.capture(tracked) {
            Ok(()) => true,
            Err(err) => {
                log::debug!(
                    "femtotransport: error tracker transport '{}' capture failed: {err}",
                    self.name()
                );
                false
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
