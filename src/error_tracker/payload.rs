//! Mapping from [`Event`] to the shape an error tracker ingests.

use std::collections::BTreeMap;

use chrono::SecondsFormat;
use serde::Serialize;
use serde_json::Value;

use crate::{
    event::{Event, User},
    level::Level,
    transport::TransportConfig,
};

/// Severity scale understood by error trackers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackedLevel {
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

impl From<Level> for TrackedLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::Trace | Level::Debug => Self::Debug,
            Level::Info | Level::Notice => Self::Info,
            Level::Warning => Self::Warning,
            Level::Error => Self::Error,
            Level::Critical | Level::Alert | Level::Emergency => Self::Fatal,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TrackedUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,
}

impl From<&User> for TrackedUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
            ip_address: user.ip_address.clone(),
            data: user.data.clone(),
        }
    }
}

/// One event as handed to [`ErrorTrackerClient::capture`](super::ErrorTrackerClient::capture).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrackedEvent {
    pub message: String,
    pub level: TrackedLevel,
    pub logger: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<TrackedUser>,
    pub tags: BTreeMap<String, String>,
    /// Extras with nil values removed.
    pub extra: BTreeMap<String, Value>,
    /// RFC 3339, UTC, millisecond precision.
    pub timestamp: String,
}

impl TrackedEvent {
    /// Build the payload for `event` using the formatted `message`.
    ///
    /// The configured logger name wins over the event's own.
    pub fn from_event(event: &Event, message: String, config: &TransportConfig) -> Self {
        Self {
            message,
            level: event.level().into(),
            logger: config
                .logger_name
                .clone()
                .unwrap_or_else(|| event.logger().to_owned()),
            environment: config.environment.clone(),
            user: event.user().map(TrackedUser::from),
            tags: event.tags().clone(),
            extra: event.scope().present_extras(),
            timestamp: event
                .utc_timestamp()
                .unwrap_or_default()
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}
