//! Timestamp prefix formatter.

use std::fmt::Write;

use chrono::SecondsFormat;

use super::EventFormatter;
use crate::event::Event;

/// Prefixes the running message with the event's creation time.
///
/// Without a pattern the timestamp is rendered as RFC 3339 with millisecond
/// precision. A `strftime` pattern chrono cannot render makes the stage
/// yield no output.
#[derive(Clone, Debug, Default)]
pub struct TimestampFormatter {
    pattern: Option<String>,
}

impl TimestampFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render the timestamp with a chrono `strftime` pattern.
    pub fn with_pattern(pattern: impl Into<String>) -> Self {
        Self {
            pattern: Some(pattern.into()),
        }
    }
}

impl EventFormatter for TimestampFormatter {
    fn format(&self, event: &Event, message: &str) -> Option<String> {
        let time = event.utc_timestamp()?;
        let mut out = String::with_capacity(message.len() + 32);
        match &self.pattern {
            Some(pattern) => write!(out, "{}", time.format(pattern)).ok()?,
            None => out.push_str(&time.to_rfc3339_opts(SecondsFormat::Millis, true)),
        }
        out.push(' ');
        out.push_str(message);
        Some(out)
    }
}
