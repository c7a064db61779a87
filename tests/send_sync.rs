//! Send/Sync guarantees for core types.

use femtotransport::{
    DispatchQueue, ErrorTrackerConfig, Event, FormatterChain, LevelFilterBuilder,
    NameFilterBuilder, Pipeline, PipelineBuilder, StreamTransport, Transport, TransportConfig,
    TransportCore,
};
use rstest::rstest;
use static_assertions::{assert_impl_all, assert_obj_safe};

assert_obj_safe!(Transport);

#[rstest]
fn configuration_is_send_sync() {
    assert_impl_all!(TransportConfig: Send, Sync, Clone);
    assert_impl_all!(ErrorTrackerConfig: Send, Sync, Clone);
    assert_impl_all!(FormatterChain: Send, Sync);
    assert_impl_all!(LevelFilterBuilder: Send, Sync);
    assert_impl_all!(NameFilterBuilder: Send, Sync);
}

#[rstest]
fn components_are_send_sync() {
    assert_impl_all!(Event: Send, Sync, Clone);
    assert_impl_all!(TransportCore: Send, Sync);
    assert_impl_all!(StreamTransport<Vec<u8>>: Send, Sync);
    assert_impl_all!(Pipeline: Send, Sync);
    assert_impl_all!(PipelineBuilder: Send);
    assert_impl_all!(DispatchQueue: Send, Sync);
}
