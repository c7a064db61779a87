//! Compatibility bridge for the Rust `log` crate.
//!
//! [`PipelineLogAdapter`] implements `log::Log` and turns each
//! `log::Record` into an [`Event`] routed through a shared [`Pipeline`].
//! Record targets become logger names with `::` normalised to `.`, so
//! dotted-prefix filters work on Rust module paths.
//!
//! Records targeting `femtotransport` or one of its modules are ignored:
//! they are this crate's own diagnostics and routing them back into the
//! pipeline could loop.

use std::{borrow::Cow, sync::Arc};

use log::{Log, Metadata, Record};

use crate::{
    event::{Event, RecordMetadata},
    level::Level,
    pipeline::Pipeline,
};

const INTERNAL_TARGET: &str = "femtotransport";

/// Adapter implementing the Rust `log::Log` trait on top of a pipeline.
pub struct PipelineLogAdapter {
    pipeline: Arc<Pipeline>,
}

impl PipelineLogAdapter {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }
}

impl From<log::Level> for Level {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Trace => Level::Trace,
            log::Level::Debug => Level::Debug,
            log::Level::Info => Level::Info,
            log::Level::Warn => Level::Warning,
            log::Level::Error => Level::Error,
        }
    }
}

fn normalise_target(target: &str) -> Cow<'_, str> {
    if target.contains("::") {
        Cow::Owned(target.replace("::", "."))
    } else {
        Cow::Borrowed(target)
    }
}

fn is_internal(target: &str) -> bool {
    target
        .strip_prefix(INTERNAL_TARGET)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

impl Log for PipelineLogAdapter {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        !is_internal(metadata.target()) && self.pipeline.is_enabled_for(metadata.level().into())
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let metadata = RecordMetadata {
            module_path: record.module_path().unwrap_or_default().to_string(),
            filename: record.file().unwrap_or_default().to_string(),
            line_number: record.line().unwrap_or(0),
            ..Default::default()
        };
        let event = Event::new(
            normalise_target(record.target()),
            record.level().into(),
            record.args().to_string(),
        )
        .with_metadata(metadata);
        self.pipeline.log(event);
    }

    fn flush(&self) {
        self.pipeline.flush();
    }
}

/// Install a [`PipelineLogAdapter`] for `pipeline` as the global logger.
///
/// Fails when another global logger is already set.
pub fn install_global_logger(pipeline: Arc<Pipeline>) -> Result<(), log::SetLoggerError> {
    log::set_boxed_logger(Box::new(PipelineLogAdapter::new(pipeline)))?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}
