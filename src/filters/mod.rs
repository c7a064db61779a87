//! Filtering components for events.
//!
//! Provides the [`EventFilter`] trait along with concrete filter builders.
//! Filters are attached to a transport's configuration and evaluated by the
//! pipeline before an event is enqueued, alongside the transport's enabled
//! flag and minimum level.

use std::sync::Arc;

use thiserror::Error;

use crate::event::Event;

/// Trait implemented by all event filters.
///
/// Filters are `Send + Sync` so they can be shared across threads.
pub trait EventFilter: Send + Sync {
    /// Return `true` if `event` should be processed.
    fn should_log(&self, event: &Event) -> bool;
}

/// Shared filter trait object stored by transport configurations.
pub type SharedFilter = Arc<dyn EventFilter>;

pub mod level_filter;
pub mod name_filter;

pub use level_filter::{LevelFilter, LevelFilterBuilder};
pub use name_filter::{NameFilter, NameFilterBuilder};

/// Errors that may occur while building a filter.
#[derive(Debug, Error)]
pub enum FilterBuildError {
    /// Invalid user supplied configuration.
    #[error("invalid filter configuration: {0}")]
    InvalidConfig(String),
}

/// Trait implemented by all filter builders.
pub trait FilterBuilderTrait: Send + Sync {
    type Filter: EventFilter + 'static;

    fn build_inner(&self) -> Result<Self::Filter, FilterBuildError>;

    fn build(&self) -> Result<SharedFilter, FilterBuildError> {
        Ok(Arc::new(self.build_inner()?))
    }
}

/// Concrete filter builder variants.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum FilterBuilder {
    /// Build a [`LevelFilter`].
    Level(LevelFilterBuilder),
    /// Build a [`NameFilter`].
    Name(NameFilterBuilder),
}

impl FilterBuilder {
    pub fn build(&self) -> Result<SharedFilter, FilterBuildError> {
        match self {
            Self::Level(b) => <LevelFilterBuilder as FilterBuilderTrait>::build(b),
            Self::Name(b) => <NameFilterBuilder as FilterBuilderTrait>::build(b),
        }
    }
}

impl From<LevelFilterBuilder> for FilterBuilder {
    fn from(value: LevelFilterBuilder) -> Self {
        Self::Level(value)
    }
}

impl From<NameFilterBuilder> for FilterBuilder {
    fn from(value: NameFilterBuilder) -> Self {
        Self::Name(value)
    }
}

/// Closures can be used directly as filters.
impl<F> EventFilter for F
where
    F: Fn(&Event) -> bool + Send + Sync,
{
    fn should_log(&self, event: &Event) -> bool {
        self(event)
    }
}
