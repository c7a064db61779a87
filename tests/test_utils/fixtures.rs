//! rstest fixtures pairing a shared buffer with a registered stream
//! transport.

use std::sync::Arc;

use femtotransport::{DefaultFormatter, Pipeline, StreamTransport};
use rstest::fixture;

use super::shared_buffer::SharedBuf;

/// A pipeline with one stream transport named `stream` writing to a buffer.
#[fixture]
pub fn stream_pipeline() -> (SharedBuf, Pipeline, Arc<StreamTransport<SharedBuf>>) {
    let buffer = SharedBuf::default();
    let pipeline = Pipeline::new("app");
    let transport = StreamTransport::new("stream", buffer.clone(), |cfg| {
        cfg.with_formatter(DefaultFormatter)
    })
    .expect("valid config");
    let transport = pipeline.add_transport(transport).expect("register");
    (buffer, pipeline, transport)
}
