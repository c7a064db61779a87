//! Immutable log events flowing through the pipeline.
//!
//! An [`Event`] is assembled with consuming `with_*` methods and then handed
//! to a [`Pipeline`](crate::pipeline::Pipeline), which wraps it in an `Arc`
//! and shares it read-only with every transport queue. No field is reachable
//! mutably once the event exists, so transports cannot alter what other
//! transports observe.

use std::collections::BTreeMap;
use std::fmt;
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::level::Level;

/// Identity of the user associated with an event.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct User {
    pub id: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub ip_address: Option<String>,
    /// Free-form attributes attached to the user.
    pub data: BTreeMap<String, String>,
}

impl User {
    /// Create a user identified by `id`.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }
}

/// Contextual metadata attached to an event.
///
/// Extras keep `None` values so adapters can see that a key was set but
/// empty; sinks that cannot represent nil should skip such entries
/// (see [`Scope::present_extras`]).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scope {
    pub user: Option<User>,
    pub tags: BTreeMap<String, String>,
    pub extra: BTreeMap<String, Option<Value>>,
}

impl Scope {
    /// Extras with nil values removed.
    pub fn present_extras(&self) -> BTreeMap<String, Value> {
        self.extra
            .iter()
            .filter_map(|(key, value)| value.as_ref().map(|v| (key.clone(), v.clone())))
            .collect()
    }
}

/// Source location and thread details captured with the event.
#[derive(Clone, Debug)]
pub struct RecordMetadata {
    /// Rust module path where the log call originated.
    pub module_path: String,
    /// Source file name for the log call.
    pub filename: String,
    /// Line number in the source file.
    pub line_number: u32,
    /// Name of the thread that created the event (if any).
    pub thread_name: Option<String>,
}

impl Default for RecordMetadata {
    fn default() -> Self {
        Self {
            module_path: String::new(),
            filename: String::new(),
            line_number: 0,
            thread_name: thread::current().name().map(ToString::to_string),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Event {
    logger: String,
    level: Level,
    message: String,
    scope: Scope,
    timestamp: SystemTime,
    metadata: RecordMetadata,
}

impl Event {
    /// Construct an event for logger `logger` stamped with the current time.
    pub fn new(logger: impl Into<String>, level: Level, message: impl Into<String>) -> Self {
        Self {
            logger: logger.into(),
            level,
            message: message.into(),
            scope: Scope::default(),
            timestamp: SystemTime::now(),
            metadata: RecordMetadata::default(),
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.scope.tags.insert(key.into(), value.into());
        self
    }

    /// Attach an extra value; `None` records the key with a nil value.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Option<Value>>) -> Self {
        self.scope.extra.insert(key.into(), value.into());
        self
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.scope.user = Some(user);
        self
    }

    /// Replace the whole scope.
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_metadata(mut self, metadata: RecordMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Override the creation time, mainly for deterministic tests.
    pub fn with_timestamp(mut self, timestamp: SystemTime) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn logger(&self) -> &str {
        &self.logger
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.scope.tags
    }

    pub fn extra(&self) -> &BTreeMap<String, Option<Value>> {
        &self.scope.extra
    }

    pub fn user(&self) -> Option<&User> {
        self.scope.user.as_ref()
    }

    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    /// The creation time as a chrono UTC datetime.
    ///
    /// `None` when the timestamp lies outside chrono's representable range.
    pub fn utc_timestamp(&self) -> Option<DateTime<Utc>> {
        let (secs, nanos) = match self.timestamp.duration_since(UNIX_EPOCH) {
            Ok(after) => (i64::try_from(after.as_secs()).ok()?, after.subsec_nanos()),
            Err(err) => {
                let before = err.duration();
                let secs = i64::try_from(before.as_secs()).ok()?;
                match before.subsec_nanos() {
                    0 => (-secs, 0),
                    n => (-secs - 1, 1_000_000_000 - n),
                }
            }
        };
        DateTime::from_timestamp(secs, nanos)
    }

    pub fn metadata(&self) -> &RecordMetadata {
        &self.metadata
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.level, self.message)
    }
}
