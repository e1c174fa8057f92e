//! Minimal `tracing` subscriber feeding a [`LogSink`].
//!
//! Events become a single `message key=value ...` string handed to the sink
//! together with their level and target. Spans are accepted but carry no
//! context into the output.

use std::fmt::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::field::{Field, Visit};
use tracing::level_filters::LevelFilter;
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Metadata, Subscriber};

use super::LogSink;

/// `tracing` subscriber that forwards every enabled event to `S`.
#[derive(Debug)]
pub struct SinkSubscriber<S> {
    sink: S,
    max_level: LevelFilter,
    next_span: AtomicU64,
}

impl<S: LogSink> SinkSubscriber<S> {
    /// Forward events at `max_level` or more severe to `sink`.
    pub const fn new(sink: S, max_level: LevelFilter) -> Self {
        Self {
            sink,
            max_level,
            next_span: AtomicU64::new(1),
        }
    }

    /// The wrapped sink.
    pub const fn sink(&self) -> &S {
        &self.sink
    }
}

impl<S: LogSink + 'static> Subscriber for SinkSubscriber<S> {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        *metadata.level() <= self.max_level
    }

    fn max_level_hint(&self) -> Option<LevelFilter> {
        Some(self.max_level)
    }

    fn new_span(&self, _span: &Attributes<'_>) -> Id {
        Id::from_u64(self.next_span.fetch_add(1, Ordering::Relaxed))
    }

    fn record(&self, _span: &Id, _values: &Record<'_>) {}

    fn record_follows_from(&self, _span: &Id, _follows: &Id) {}

    fn event(&self, event: &Event<'_>) {
        let metadata = event.metadata();
        let mut line = EventLine::default();
        event.record(&mut line);
        self.sink
            .log(*metadata.level(), metadata.target(), &line.finish());
    }

    fn enter(&self, _span: &Id) {}

    fn exit(&self, _span: &Id) {}
}

#[derive(Default)]
struct EventLine {
    message: String,
    fields: String,
}

impl EventLine {
    fn finish(mut self) -> String {
        if self.message.is_empty() {
            return self.fields.trim_start().to_owned();
        }
        self.message.push_str(&self.fields);
        self.message
    }
}

impl Visit for EventLine {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={value}", field.name());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={value:?}", field.name());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tracing::Level;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(Level, String, String)>>);

    impl LogSink for Recorder {
        fn log(&self, level: Level, target: &str, message: &str) {
            self.0
                .lock()
                .unwrap()
                .push((level, target.to_owned(), message.to_owned()));
        }
    }

    #[test]
    fn test_formats_message_and_fields() {
        let recorder = Arc::new(Recorder::default());
        let subscriber = SinkSubscriber::new(Arc::clone(&recorder), LevelFilter::DEBUG);

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "sensor", reading = 42, unit = "ppm", "tds sampled");
            tracing::debug!(target: "sensor", "debug line");
            tracing::trace!(target: "sensor", "filtered out");
        });

        let records = recorder.0.lock().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].0, Level::INFO);
        assert_eq!(records[0].1, "sensor");
        assert_eq!(records[0].2, "tds sampled reading=42 unit=ppm");
        assert_eq!(records[1].2, "debug line");
    }

    #[test]
    fn test_spans_do_not_break_events() {
        let recorder = Arc::new(Recorder::default());
        let subscriber = SinkSubscriber::new(Arc::clone(&recorder), LevelFilter::INFO);

        tracing::subscriber::with_default(subscriber, || {
            let span = tracing::info_span!("outer", node = 7);
            let _entered = span.enter();
            tracing::warn!(target: "mesh", "inside");
        });

        let records = recorder.0.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].2, "inside");
    }

    #[test]
    fn test_fields_only_event() {
        let recorder = Arc::new(Recorder::default());
        let subscriber = SinkSubscriber::new(Arc::clone(&recorder), LevelFilter::INFO);

        tracing::subscriber::with_default(subscriber, || {
            tracing::error!(target: "mesh", code = 3);
        });

        assert_eq!(recorder.0.lock().unwrap()[0].2, "code=3");
    }
}
