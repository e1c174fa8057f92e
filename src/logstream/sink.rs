//! Log line consumers.

use std::io::Write;
use std::sync::Arc;

use tracing::Level;

/// Anything that accepts formatted log records.
pub trait LogSink: Send + Sync {
    /// Consume one record; must not fail.
    fn log(&self, level: Level, target: &str, message: &str);
}

impl<S: LogSink + ?Sized> LogSink for Arc<S> {
    fn log(&self, level: Level, target: &str, message: &str) {
        (**self).log(level, target, message);
    }
}

/// Console sink writing `LEVEL target: message` lines to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrSink;

impl LogSink for StderrSink {
    fn log(&self, level: Level, target: &str, message: &str) {
        let mut err = std::io::stderr().lock();
        let _ = writeln!(err, "{level:>5} {target}: {message}");
    }
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl LogSink for NoopSink {
    fn log(&self, _level: Level, _target: &str, _message: &str) {}
}
