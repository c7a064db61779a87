//! Pluggable logging transports and the dispatch core that drives them.
//!
//! Events built by the host are routed by a [`Pipeline`] to every registered
//! [`Transport`] whose accept gate passes. Each transport gets a private
//! [`DispatchQueue`] with its own worker thread, so sinks record in FIFO
//! order without ever blocking the producer or each other.
//!
//! Two reference transports ship with the crate: [`StreamTransport`] for any
//! `io::Write` and [`ErrorTrackerTransport`] for error-tracking services
//! behind the [`ErrorTrackerClient`] trait.

pub mod dispatch;
pub mod error_tracker;
pub mod event;
pub mod filters;
pub mod formatter;
pub mod level;
#[cfg(feature = "log-compat")]
pub mod log_compat;
pub mod pipeline;
pub mod rate_limited_warner;
pub mod stream_transport;
pub mod transport;

#[cfg(any(test, feature = "test-util"))]
pub mod test_utils;

pub use dispatch::{DeliverySnapshot, DispatchError, DispatchQueue, Outcome};
pub use error_tracker::{
    ClientError, ClientOptions, ErrorTrackerClient, ErrorTrackerConfig, ErrorTrackerTransport,
    SdkInit, TrackedEvent, TrackedLevel, TrackedUser,
};
pub use event::{Event, RecordMetadata, Scope, User};
pub use filters::{
    EventFilter, FilterBuildError, FilterBuilder, FilterBuilderTrait, LevelFilter,
    LevelFilterBuilder, NameFilter, NameFilterBuilder, SharedFilter,
};
pub use formatter::{
    DefaultFormatter, EventFormatter, FnFormatter, FormatterChain, JsonFormatter,
    SharedFormatter, TimestampFormatter,
};
pub use level::{Level, ParseLevelError};
#[cfg(feature = "log-compat")]
pub use log_compat::{PipelineLogAdapter, install_global_logger};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineError};
pub use rate_limited_warner::RateLimitedWarner;
pub use stream_transport::StreamTransport;
pub use transport::{
    Acceptance, ConfigError, DrainPolicy, OutcomeCallback, OverflowPolicy, QueueConfig,
    Transport, TransportConfig, TransportCore, TransportState,
};
