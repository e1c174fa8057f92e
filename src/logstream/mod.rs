//! Out-of-band diagnostic log stream.
//!
//! [`LogStream`] sits in the process log path as a [`LogSink`] wrapping the
//! previous sink. Every record still reaches the previous sink first; while
//! the stream is enabled the record is also timestamped, formatted and sent
//! to the root as a `LogLine` packet. The root switches the stream on and
//! off with `LogControl` packets; it starts switched off.
//!
//! The transport may itself log while a line is being sent. A per-thread
//! guard makes such nested records reach the previous sink only, so the
//! hook never recurses.

mod clock;
mod sink;
mod subscriber;

pub use clock::{LogClock, NO_TIME_PREFIX, SystemClock, TimePrefix, time_prefix};
pub use sink::{LogSink, NoopSink, StderrSink};
pub use subscriber::SinkSubscriber;

use std::cell::Cell;
use std::fmt::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::Level;
use tracing::level_filters::LevelFilter;

use crate::protocol::{
    BoundedString, DecodeError, LOG_LINE_FIELD_LEN, LogLineText, NodeId, NodeTag, Packet,
    PacketCounter, PacketType, Payload,
};
use crate::transport::SharedTransport;

/// Tag used when none is given.
pub const DEFAULT_TAG: &str = "node";

/// Size of the first-attempt line buffer, terminator included.
pub const STACK_LINE_LEN: usize = 128;

/// Hard cap on a forwarded line, terminator included.
pub const HEAP_LINE_MAX: usize = LOG_LINE_FIELD_LEN;

type StackLine = BoundedString<{ STACK_LINE_LEN - 1 }>;

/// Allocates an empty heap line buffer, `None` when memory is short.
type LineAlloc = fn(usize) -> Option<String>;

thread_local! {
    static IN_HOOK: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as inside the hook until dropped.
struct HookGuard(());

impl HookGuard {
    fn enter() -> Option<Self> {
        let busy = IN_HOOK.with(|flag| flag.replace(true));
        (!busy).then_some(Self(()))
    }
}

impl Drop for HookGuard {
    fn drop(&mut self) {
        IN_HOOK.with(|flag| flag.set(false));
    }
}

/// Log stream configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LogStreamConfig {
    /// Node receiving `LogLine` and `NodeInfo` packets
    pub destination: NodeId,
}

impl Default for LogStreamConfig {
    fn default() -> Self {
        Self {
            destination: NodeId::ROOT,
        }
    }
}

/// Log sink that mirrors records to the mesh root.
pub struct LogStream {
    tag: NodeTag,
    previous: Arc<dyn LogSink>,
    transport: SharedTransport,
    counter: PacketCounter,
    config: LogStreamConfig,
    clock: Arc<dyn LogClock>,
    alloc_line: LineAlloc,
    enabled: AtomicBool,
}

impl fmt::Debug for LogStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogStream")
            .field("tag", &self.tag)
            .field("config", &self.config)
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}

impl LogStream {
    /// Create a disabled stream wrapping `previous`.
    ///
    /// An empty `tag` selects [`DEFAULT_TAG`]; longer tags are truncated to
    /// the wire field.
    #[must_use]
    pub fn new(
        tag: &str,
        previous: Arc<dyn LogSink>,
        transport: SharedTransport,
        counter: PacketCounter,
        config: LogStreamConfig,
    ) -> Self {
        let tag = if tag.is_empty() { DEFAULT_TAG } else { tag };
        Self {
            tag: NodeTag::truncated(tag),
            previous,
            transport,
            counter,
            config,
            clock: Arc::new(SystemClock),
            alloc_line: reserve_line,
            enabled: AtomicBool::new(false),
        }
    }

    /// Replace the wall-clock source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn LogClock>) -> Self {
        self.clock = clock;
        self
    }

    #[cfg(test)]
    fn with_line_alloc(mut self, alloc_line: LineAlloc) -> Self {
        self.alloc_line = alloc_line;
        self
    }

    /// Install `self` behind a global [`SinkSubscriber`].
    ///
    /// Only the first installation in a process succeeds; later calls
    /// change nothing and return `false`.
    pub fn install(self: Arc<Self>, max_level: LevelFilter) -> bool {
        let installed =
            tracing::subscriber::set_global_default(SinkSubscriber::new(self, max_level)).is_ok();
        if installed {
            tracing::info!("mesh log stream initialised, waiting for control");
        }
        installed
    }

    /// Node tag carried in every packet.
    #[must_use]
    pub const fn tag(&self) -> &NodeTag {
        &self.tag
    }

    /// Whether records are currently forwarded.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Announce this node to the root with a `NodeInfo` packet.
    ///
    /// Safe to call on every (re)connection.
    pub fn on_transport_connected(&self) {
        let _guard = HookGuard::enter();
        self.send(Payload::NodeInfo { tag: self.tag });
    }

    /// Apply a `LogControl` packet and return the new enabled state.
    ///
    /// Never logs: this runs on the receive path, which may itself be
    /// inside a record being forwarded.
    pub fn handle_control_packet(&self, bytes: &[u8]) -> Result<bool, DecodeError> {
        let packet = Packet::decode(bytes)?;
        match packet.payload() {
            Payload::LogControl { enable } => {
                self.enabled.store(*enable, Ordering::Release);
                Ok(*enable)
            }
            _ => Err(DecodeError::UnexpectedType {
                expected: PacketType::LogControl.as_u8(),
                found: packet.header().type_byte(),
            }),
        }
    }

    fn send(&self, payload: Payload) {
        let packet = Packet::next(self.transport.local_id(), &self.counter, payload);
        // Failures are dropped; reporting them would log from inside the hook.
        let _ = self
            .transport
            .send_to(self.config.destination, &packet.encode());
    }

    fn forward(&self, level: Level, target: &str, message: &str) {
        let prefix = time_prefix(self.clock.as_ref());
        let record = Record {
            level,
            target,
            message,
        };

        let mut stack = StackLine::new();
        let _ = write!(stack, "{prefix}{record}");
        if !stack.is_truncated() {
            self.send_line(&stack);
            return;
        }

        match (self.alloc_line)(HEAP_LINE_MAX) {
            Some(buffer) => self.send_line(&heap_line(buffer, &prefix, &record)),
            None => self.send_line(&stack_fallback(stack)),
        }
    }

    fn send_line(&self, line: &str) {
        self.send(Payload::LogLine {
            tag: self.tag,
            line: LogLineText::truncated(line),
        });
    }
}

impl LogSink for LogStream {
    fn log(&self, level: Level, target: &str, message: &str) {
        self.previous.log(level, target, message);

        if !self.is_enabled() {
            return;
        }
        let Some(_guard) = HookGuard::enter() else {
            return;
        };
        self.forward(level, target, message);
    }
}

/// One record as it appears on the wire after the time prefix.
struct Record<'a> {
    level: Level,
    target: &'a str,
    message: &'a str,
}

impl fmt::Display for Record<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}: {}", self.level, self.target, self.message)
    }
}

fn reserve_line(capacity: usize) -> Option<String> {
    let mut line = String::new();
    line.try_reserve_exact(capacity).ok()?;
    Some(line)
}

/// Write the record into `line`, capped below [`HEAP_LINE_MAX`].
fn heap_line(mut line: String, prefix: &str, record: &Record<'_>) -> String {
    let mut capped = Capped {
        out: &mut line,
        limit: HEAP_LINE_MAX - 1,
    };
    let _ = write!(capped, "{prefix}{record}");
    line
}

/// Truncated stack line, terminated with a newline in its last slot.
fn stack_fallback(mut line: StackLine) -> StackLine {
    line.pop();
    line.push('\n');
    line
}

/// `fmt::Write` adapter that stops at `limit` bytes without reallocating.
struct Capped<'a> {
    out: &'a mut String,
    limit: usize,
}

impl Write for Capped<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = self.limit.saturating_sub(self.out.len());
        let mut take = s.len().min(room);
        while !s.is_char_boundary(take) {
            take -= 1;
        }
        self.out.push_str(&s[..take]);
        Ok(())
    }
}

/// Create a log stream and install it as the process-wide subscriber.
///
/// Returns `None` if a global subscriber was already installed.
#[must_use]
pub fn init(
    tag: &str,
    transport: SharedTransport,
    counter: PacketCounter,
    config: LogStreamConfig,
    max_level: LevelFilter,
) -> Option<Arc<LogStream>> {
    let stream = Arc::new(LogStream::new(
        tag,
        Arc::new(StderrSink),
        transport,
        counter,
        config,
    ));
    Arc::clone(&stream).install(max_level).then_some(stream)
}
