//! Builder and implementation for a logger-name filter.

use crate::{
    event::Event,
    filters::{EventFilter, FilterBuildError, FilterBuilderTrait},
};

/// Accepts events from a logger and its dotted descendants.
///
/// A prefix of `"db"` matches `"db"` and `"db.pool"` but not `"dbx"`.
#[derive(Debug)]
pub struct NameFilter {
    prefix: String,
}

impl EventFilter for NameFilter {
    fn should_log(&self, event: &Event) -> bool {
        match event.logger().strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('.'),
            None => false,
        }
    }
}

/// Builder for [`NameFilter`].
#[derive(Clone, Debug, Default)]
pub struct NameFilterBuilder {
    prefix: Option<String>,
}

impl NameFilterBuilder {
    /// Create a new `NameFilterBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the logger name that accepted events must start with.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
}

impl FilterBuilderTrait for NameFilterBuilder {
    type Filter = NameFilter;

    fn build_inner(&self) -> Result<Self::Filter, FilterBuildError> {
        let prefix = self
            .prefix
            .clone()
            .ok_or_else(|| FilterBuildError::InvalidConfig("prefix is required".into()))?;
        if prefix.is_empty() || prefix.ends_with('.') {
            return Err(FilterBuildError::InvalidConfig(format!(
                "invalid logger prefix '{prefix}'"
            )));
        }
        Ok(NameFilter { prefix })
    }
}
