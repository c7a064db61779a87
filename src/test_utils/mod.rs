//! Helpers shared by unit tests and, behind the `test-util` feature, by
//! integration tests.
//!
//! The transports here record into memory so assertions can inspect exactly
//! what reached the sink and in which order.

pub mod collecting_transport;

pub use collecting_transport::{BlockingTransport, CollectingTransport, Gate};
