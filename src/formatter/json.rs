//! JSON line formatter.

use std::collections::BTreeMap;

use chrono::SecondsFormat;
use serde::Serialize;
use serde_json::Value;

use super::EventFormatter;
use crate::event::Event;

/// Renders the event as a single-line JSON object.
///
/// The `message` field carries the text produced by the previous stage of
/// the chain. Extras with nil values are omitted.
#[derive(Copy, Clone, Debug, Default)]
pub struct JsonFormatter;

#[derive(Serialize)]
struct JsonLine<'a> {
    timestamp: String,
    level: &'static str,
    logger: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    tags: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    extra: BTreeMap<String, Value>,
}

impl EventFormatter for JsonFormatter {
    fn format(&self, event: &Event, message: &str) -> Option<String> {
        let timestamp = event
            .utc_timestamp()?
            .to_rfc3339_opts(SecondsFormat::Millis, true);
        let line = JsonLine {
            timestamp,
            level: event.level().as_str(),
            logger: event.logger(),
            message,
            tags: event.tags().clone(),
            extra: event.scope().present_extras(),
        };
        match serde_json::to_string(&line) {
            Ok(json) => Some(json),
            Err(err) => {
                log::debug!("femtotransport: JSON formatting failed: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;
    use serde_json::json;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn renders_fields_and_skips_nil_extras() {
        let event = Event::new("api", Level::Error, "ignored")
            .with_timestamp(UNIX_EPOCH + Duration::from_secs(86_400))
            .with_tag("env", "prod")
            .with_extra("status", json!(503))
            .with_extra("body", None);

        let output = JsonFormatter
            .format(&event, "request failed")
            .expect("json output");
        let parsed: Value = serde_json::from_str(&output).expect("valid json");

        assert_eq!(
            parsed,
            json!({
                "timestamp": "1970-01-02T00:00:00.000Z",
                "level": "ERROR",
                "logger": "api",
                "message": "request failed",
                "tags": {"env": "prod"},
                "extra": {"status": 503},
            })
        );
    }

    #[test]
    fn unrepresentable_timestamp_yields_no_output() {
        let event = Event::new("api", Level::Info, "ok")
            .with_timestamp(UNIX_EPOCH + Duration::from_secs(1 << 50));
        assert_eq!(JsonFormatter.format(&event, "ok"), None);
    }

    #[test]
    fn omits_empty_scope_maps() {
        let event = Event::new("api", Level::Info, "ok");
        let output = JsonFormatter.format(&event, "ok").expect("json output");
        let parsed: Value = serde_json::from_str(&output).expect("valid json");
        assert!(parsed.get("tags").is_none());
        assert!(parsed.get("extra").is_none());
    }
}
