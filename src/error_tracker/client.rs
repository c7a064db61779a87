//! Collaborator interface for error-tracking services.

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::payload::TrackedEvent;

/// Errors reported by an [`ErrorTrackerClient`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ClientError {
    /// The SDK could not be initialised with the supplied options.
    #[error("error tracker initialisation failed: {0}")]
    Init(String),
    /// The SDK refused the event synchronously.
    #[error("error tracker rejected event: {0}")]
    Rejected(String),
}

/// Options used to initialise the SDK.
///
/// Leave unset on the transport when the SDK is initialised elsewhere.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    /// Project endpoint (data source name).
    pub dsn: String,
    pub release: Option<String>,
    /// Enables the SDK's own debug output.
    pub debug: bool,
}

impl ClientOptions {
    pub fn new(dsn: impl Into<String>) -> Self {
        Self {
            dsn: dsn.into(),
            ..Self::default()
        }
    }

    pub fn with_release(mut self, release: impl Into<String>) -> Self {
        self.release = Some(release.into());
        self
    }
}

/// A process-wide error-tracking SDK.
///
/// `capture` hands the event to the SDK, which usually delivers it
/// asynchronously; `Ok` means the SDK took ownership of it.
pub trait ErrorTrackerClient: Send + Sync {
    /// Initialise the SDK. Must be idempotent: several transports may share
    /// one client and each calls this from its constructor.
    fn initialize(&self, options: &ClientOptions) -> Result<(), ClientError>;

    fn capture(&self, event: TrackedEvent) -> Result<(), ClientError>;
}

/// Once-only guard for SDK initialisation.
///
/// The first call runs the initialiser; every later call returns the stored
/// result without running anything.
#[derive(Debug, Default)]
pub struct SdkInit {
    result: OnceCell<Result<(), ClientError>>,
}

impl SdkInit {
    pub const fn new() -> Self {
        Self {
            result: OnceCell::new(),
        }
    }

    pub fn initialize<F>(&self, init: F) -> Result<(), ClientError>
    where
        F: FnOnce() -> Result<(), ClientError>,
    {
        self.result.get_or_init(init).clone()
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.result.get(), Some(Ok(())))
    }
}
