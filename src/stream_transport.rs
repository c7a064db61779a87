//! Transport writing formatted events to an `io::Write` stream.
//!
//! Each recorded event becomes one line produced by the transport's
//! formatter chain. Writes happen on the transport's dispatch thread, so the
//! writer only needs to be `Send`; the mutex exists to satisfy `Sync` and is
//! never contended in practice.

use std::{
    any::Any,
    io::{self, Write},
};

use log::warn;
use parking_lot::Mutex;

use crate::{
    event::Event,
    formatter::DefaultFormatter,
    rate_limited_warner::RateLimitedWarner,
    transport::{ConfigError, Transport, TransportConfig, TransportCore},
};

/// Transport writing one formatted line per event to a stream.
pub struct StreamTransport<W: Write + Send> {
    core: TransportCore,
    writer: Mutex<W>,
    warner: RateLimitedWarner,
}

impl StreamTransport<io::Stdout> {
    /// Write to standard output using [`DefaultFormatter`].
    pub fn stdout() -> Result<Self, ConfigError> {
        Self::new("stdout", io::stdout(), |cfg| cfg.with_formatter(DefaultFormatter))
    }
}

impl StreamTransport<io::Stderr> {
    /// Write to standard error using [`DefaultFormatter`].
    pub fn stderr() -> Result<Self, ConfigError> {
        Self::new("stderr", io::stderr(), |cfg| cfg.with_formatter(DefaultFormatter))
    }
}

impl<W: Write + Send> StreamTransport<W> {
    /// Create a transport called `name` writing to `writer`.
    ///
    /// `transform` customises the default configuration; with no formatters
    /// the raw message is written.
    pub fn new<F>(name: impl Into<String>, writer: W, transform: F) -> Result<Self, ConfigError>
    where
        F: FnOnce(TransportConfig) -> TransportConfig,
    {
        let core = TransportCore::build(name, transform)?;
        let warner = RateLimitedWarner::new(core.config().queue.warn_interval);
        Ok(Self {
            core,
            writer: Mutex::new(writer),
            warner,
        })
    }

    /// Consume the transport and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn warn_io(&self, err: &io::Error) {
        self.warner.record_drop();
        self.warner.warn_if_due(|count| {
            warn!(
                "femtotransport: stream transport '{}' failed to write {count} events: {err}",
                self.core.config().name
            );
        });
    }
}

impl<W: Write + Send + 'static> Transport for StreamTransport<W> {
    fn core(&self) -> &TransportCore {
        &self.core
    }

    fn record(&self, event: &Event) -> bool {
        if !self.is_enabled() {
            return false;
        }
        let line = self.core.format(event);
        let mut writer = self.writer.lock();
        match writeln!(writer, "{line}").and_then(|()| writer.flush()) {
            Ok(()) => true,
            Err(err) => {
                self.warn_io(&err);
                false
            }
        }
    }

    fn flush(&self) -> bool {
        match self.writer.lock().flush() {
            Ok(()) => true,
            Err(err) => {
                self.warn_io(&err);
                false
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{formatter::JsonFormatter, level::Level};
    use std::time::{Duration, UNIX_EPOCH};

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn writes_formatted_line() {
        let transport = StreamTransport::new("buf", Vec::new(), |cfg| {
            cfg.with_formatter(DefaultFormatter)
        })
        .expect("config");
        assert!(transport.record(&Event::new("core", Level::Info, "hello")));
        let output = String::from_utf8(transport.into_inner()).expect("utf8");
        assert_eq!(output, "core [INFO] hello\n");
    }

    #[test]
    fn empty_chain_writes_raw_message() {
        let transport = StreamTransport::new("buf", Vec::new(), |cfg| cfg).expect("config");
        assert!(transport.record(&Event::new("core", Level::Info, "raw")));
        assert_eq!(transport.into_inner(), b"raw\n");
    }

    #[test]
    fn unrepresentable_timestamp_falls_back_to_raw_message() {
        let transport =
            StreamTransport::new("json", Vec::new(), |cfg| cfg.with_formatter(JsonFormatter))
                .expect("config");
        let event = Event::new("core", Level::Info, "raw")
            .with_timestamp(UNIX_EPOCH + Duration::from_secs(1 << 50));
        assert!(transport.record(&event));
        assert_eq!(transport.into_inner(), b"raw\n");
    }

    #[test]
    fn disabled_transport_writes_nothing() {
        let transport =
            StreamTransport::new("buf", Vec::new(), TransportConfig::disabled).expect("config");
        assert!(!transport.record(&Event::new("core", Level::Error, "x")));
        assert!(transport.into_inner().is_empty());
    }

    #[test]
    fn write_errors_are_reported_as_rejection() {
        let transport = StreamTransport::new("broken", FailingWriter, |cfg| cfg).expect("config");
        assert!(!transport.record(&Event::new("core", Level::Error, "lost")));
    }
}
