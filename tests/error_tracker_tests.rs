//! Error tracker transport routed through a pipeline.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use femtotransport::{
    ClientError, ClientOptions, DefaultFormatter, ErrorTrackerClient, ErrorTrackerTransport,
    Event, Level, Pipeline, SdkInit, TrackedEvent, TrackedLevel, Transport, User,
};
use rstest::{fixture, rstest};
use serde_json::json;

#[derive(Default)]
struct MemoryClient {
    init: SdkInit,
    captured: Mutex<Vec<TrackedEvent>>,
}

impl MemoryClient {
    fn captured(&self) -> Vec<TrackedEvent> {
        self.captured.lock().expect("captured poisoned").clone()
    }
}

impl ErrorTrackerClient for MemoryClient {
    fn initialize(&self, options: &ClientOptions) -> Result<(), ClientError> {
        self.init.initialize(|| {
            if options.dsn.starts_with("https://") {
                Ok(())
            } else {
                Err(ClientError::Init(format!("unsupported dsn '{}'", options.dsn)))
            }
        })
    }

    fn capture(&self, event: TrackedEvent) -> Result<(), ClientError> {
        self.captured.lock().expect("captured poisoned").push(event);
        Ok(())
    }
}

#[fixture]
fn client() -> Arc<MemoryClient> {
    Arc::new(MemoryClient::default())
}

#[rstest]
fn warning_tracker_records_errors_with_scope(client: Arc<MemoryClient>) {
    let pipeline = Pipeline::new("shop");
    pipeline
        .add_transport(
            ErrorTrackerTransport::new("tracker", Arc::clone(&client), |cfg| {
                cfg.with_client_options(ClientOptions::new("https://key@example.invalid/7"))
                    .with_transport(|t| {
                        t.with_minimum_level(Level::Warning)
                            .with_formatter(DefaultFormatter)
                            .with_environment("production")
                    })
            })
            .expect("config"),
        )
        .expect("register");

    pipeline.log(Event::new("checkout", Level::Info, "cart viewed"));
    pipeline.log(
        Event::new("checkout", Level::Error, "charge declined")
            .with_tag("psp", "acme")
            .with_extra("amount", json!(19.99))
            .with_extra("voucher", None)
            .with_user(User::with_id("u-7")),
    );
    assert!(pipeline.flush());

    let captured = client.captured();
    assert_eq!(captured.len(), 1);
    let event = &captured[0];
    assert_eq!(event.message, "checkout [ERROR] charge declined");
    assert_eq!(event.level, TrackedLevel::Error);
    assert_eq!(event.environment.as_deref(), Some("production"));
    assert_eq!(
        event.tags,
        BTreeMap::from([("psp".to_owned(), "acme".to_owned())])
    );
    assert_eq!(event.extra, BTreeMap::from([("amount".to_owned(), json!(19.99))]));
    assert_eq!(
        event.user.as_ref().and_then(|u| u.id.as_deref()),
        Some("u-7")
    );
}

#[rstest]
fn failed_initialisation_keeps_transport_silent(client: Arc<MemoryClient>) {
    let pipeline = Pipeline::new("shop");
    let transport = pipeline
        .add_transport(
            ErrorTrackerTransport::new("tracker", Arc::clone(&client), |cfg| {
                cfg.with_client_options(ClientOptions::new("udp://nowhere"))
            })
            .expect("config"),
        )
        .expect("register");

    assert!(transport.init_error().is_some());
    assert_eq!(pipeline.log(Event::new("checkout", Level::Emergency, "x")), 0);
    transport.set_enabled(true);
    assert_eq!(pipeline.log(Event::new("checkout", Level::Emergency, "y")), 0);
    assert!(pipeline.flush());
    assert!(client.captured().is_empty());
}
