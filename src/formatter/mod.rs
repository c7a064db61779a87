//! Formatter implementations and the chain that composes them.
//!
//! Provides the core [`EventFormatter`] trait alongside [`SharedFormatter`]
//! for dynamically dispatched formatters and [`FormatterChain`], which
//! applies a list of formatters left to right. Each formatter receives the
//! event and the text produced by the previous stage, so a chain of `F1`
//! then `F2` yields `F2(F1(message))`.

use std::{fmt, sync::Arc};

use crate::event::Event;

mod json;
mod timestamp;

pub use json::JsonFormatter;
pub use timestamp::TimestampFormatter;

/// Trait for turning an event into text.
///
/// `message` is the output of the previous formatter in the chain (the raw
/// event message for the first stage). Returning `None` signals that the
/// formatter could not produce output; the chain then keeps `message`.
///
/// Implementors must be thread-safe (`Send + Sync`) because transports run
/// their formatters on their own dispatch threads.
pub trait EventFormatter: Send + Sync {
    fn format(&self, event: &Event, message: &str) -> Option<String>;
}

/// Shared formatter trait object used across transports.
#[derive(Clone)]
pub struct SharedFormatter {
    inner: Arc<dyn EventFormatter>,
}

impl SharedFormatter {
    /// Create a shared formatter from an owned formatter implementation.
    pub fn new<F>(formatter: F) -> Self
    where
        F: EventFormatter + 'static,
    {
        Self {
            inner: Arc::new(formatter),
        }
    }

    /// Wrap an existing shared formatter trait object.
    pub fn from_arc(inner: Arc<dyn EventFormatter>) -> Self {
        Self { inner }
    }

    pub fn format(&self, event: &Event, message: &str) -> Option<String> {
        self.inner.format(event, message)
    }
}

impl fmt::Debug for SharedFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedFormatter(<dyn EventFormatter>)")
    }
}

/// Ordered list of formatters applied left to right.
#[derive(Clone, Debug, Default)]
pub struct FormatterChain {
    formatters: Vec<SharedFormatter>,
}

impl FormatterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `formatter` as the last stage of the chain.
    pub fn push<F>(&mut self, formatter: F)
    where
        F: EventFormatter + 'static,
    {
        self.formatters.push(SharedFormatter::new(formatter));
    }

    pub fn push_shared(&mut self, formatter: SharedFormatter) {
        self.formatters.push(formatter);
    }

    pub fn len(&self) -> usize {
        self.formatters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formatters.is_empty()
    }

    /// Produce the final message for `event`.
    ///
    /// An empty chain yields the raw message. A stage returning `None`
    /// leaves the running text untouched.
    pub fn format(&self, event: &Event) -> String {
        let mut current = event.message().to_owned();
        for (stage, formatter) in self.formatters.iter().enumerate() {
            match formatter.format(event, &current) {
                Some(next) => current = next,
                None => log::debug!(
                    "femtotransport: formatter stage {stage} produced no output for logger '{}'",
                    event.logger()
                ),
            }
        }
        current
    }
}

impl<F> FromIterator<F> for FormatterChain
where
    F: EventFormatter + 'static,
{
    fn from_iter<I: IntoIterator<Item = F>>(iter: I) -> Self {
        Self {
            formatters: iter.into_iter().map(SharedFormatter::new).collect(),
        }
    }
}

/// `"{logger} [{LEVEL}] {message}"`.
#[derive(Copy, Clone, Debug, Default)]
pub struct DefaultFormatter;

impl EventFormatter for DefaultFormatter {
    fn format(&self, event: &Event, message: &str) -> Option<String> {
        Some(format!("{} [{}] {}", event.logger(), event.level(), message))
    }
}

/// Adapter turning a closure into a formatter.
pub struct FnFormatter<F>(pub F);

impl<F> EventFormatter for FnFormatter<F>
where
    F: Fn(&Event, &str) -> String + Send + Sync,
{
    fn format(&self, event: &Event, message: &str) -> Option<String> {
        Some((self.0)(event, message))
    }
}

impl EventFormatter for Arc<dyn EventFormatter> {
    fn format(&self, event: &Event, message: &str) -> Option<String> {
        (**self).format(event, message)
    }
}

impl EventFormatter for Box<dyn EventFormatter> {
    fn format(&self, event: &Event, message: &str) -> Option<String> {
        (**self).format(event, message)
    }
}

#[cfg(test)]
mod tests {
    //! Tests for formatter composition.

    use super::*;
    use crate::level::Level;
    use static_assertions::assert_impl_all;

    struct Failing;

    impl EventFormatter for Failing {
        fn format(&self, _event: &Event, _message: &str) -> Option<String> {
            None
        }
    }

    fn bracket() -> FnFormatter<impl Fn(&Event, &str) -> String + Send + Sync> {
        FnFormatter(|_: &Event, msg: &str| format!("<{msg}>"))
    }

    fn with_len() -> FnFormatter<impl Fn(&Event, &str) -> String + Send + Sync> {
        FnFormatter(|_: &Event, msg: &str| format!("{msg}:{}", msg.len()))
    }

    #[test]
    fn shared_formatter_is_send_sync() {
        assert_impl_all!(SharedFormatter: Send, Sync);
        assert_impl_all!(FormatterChain: Send, Sync);
    }

    #[test]
    fn default_formatter_formats_basic_event() {
        let event = Event::new("test", Level::Info, "hello");
        let output = DefaultFormatter.format(&event, event.message());
        assert_eq!(output.as_deref(), Some("test [INFO] hello"));
    }

    #[test]
    fn empty_chain_yields_raw_message() {
        let event = Event::new("test", Level::Error, "raw text");
        assert_eq!(FormatterChain::new().format(&event), "raw text");
    }

    #[test]
    fn chain_applies_formatters_left_to_right() {
        let event = Event::new("test", Level::Info, "abc");
        let mut chain = FormatterChain::new();
        chain.push(bracket());
        chain.push(with_len());
        assert_eq!(chain.format(&event), "<abc>:5");

        let mut reversed = FormatterChain::new();
        reversed.push(with_len());
        reversed.push(bracket());
        assert_eq!(reversed.format(&event), "<abc:3>");
    }

    #[test]
    fn failing_stage_keeps_previous_output() {
        let event = Event::new("test", Level::Info, "abc");
        let mut chain = FormatterChain::new();
        chain.push(bracket());
        chain.push(Failing);
        assert_eq!(chain.format(&event), "<abc>");
    }

    #[test]
    fn all_failing_stages_fall_back_to_raw_message() {
        let event = Event::new("test", Level::Info, "abc");
        let chain: FormatterChain = [Failing, Failing].into_iter().collect();
        assert_eq!(chain.format(&event), "abc");
    }
}
