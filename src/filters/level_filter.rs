//! Builder and implementation for a level-range filter.

use crate::{
    event::Event,
    filters::{EventFilter, FilterBuildError, FilterBuilderTrait},
    level::Level,
};

/// Accepts events whose level lies within an inclusive range.
///
/// A transport's minimum accepted level already handles the lower bound, so
/// this filter is mostly useful for capping verbose sinks (for example a
/// debug stream that should not duplicate errors sent elsewhere).
#[derive(Debug)]
pub struct LevelFilter {
    min_level: Option<Level>,
    max_level: Option<Level>,
}

impl EventFilter for LevelFilter {
    fn should_log(&self, event: &Event) -> bool {
        let level = event.level();
        self.min_level.is_none_or(|min| level >= min)
            && self.max_level.is_none_or(|max| level <= max)
    }
}

/// Builder for [`LevelFilter`].
#[derive(Clone, Debug, Default)]
pub struct LevelFilterBuilder {
    min_level: Option<Level>,
    max_level: Option<Level>,
}

impl LevelFilterBuilder {
    /// Create a new `LevelFilterBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the least severe level allowed.
    pub fn with_min_level(mut self, level: Level) -> Self {
        self.min_level = Some(level);
        self
    }

    /// Set the most severe level allowed.
    pub fn with_max_level(mut self, level: Level) -> Self {
        self.max_level = Some(level);
        self
    }
}

impl FilterBuilderTrait for LevelFilterBuilder {
    type Filter = LevelFilter;

    fn build_inner(&self) -> Result<Self::Filter, FilterBuildError> {
        match (self.min_level, self.max_level) {
            (None, None) => Err(FilterBuildError::InvalidConfig(
                "min_level or max_level is required".into(),
            )),
            (Some(min), Some(max)) if min > max => Err(FilterBuildError::InvalidConfig(format!(
                "min_level {min} is above max_level {max}"
            ))),
            (min_level, max_level) => Ok(LevelFilter {
                min_level,
                max_level,
            }),
        }
    }
}
