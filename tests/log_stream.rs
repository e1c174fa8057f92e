use std::sync::{Arc, Mutex, OnceLock};
use std::thread;

use meshlink::logstream::{LogClock, LogSink, LogStream, LogStreamConfig, NO_TIME_PREFIX};
use meshlink::protocol::{LOG_LINE_FIELD_LEN, encode};
use meshlink::{MeshTransport, NodeId, Packet, PacketCounter, Payload, TransportError};
use time::OffsetDateTime;
use time::macros::datetime;
use tracing::Level;
use tracing::level_filters::LevelFilter;

const NODE: NodeId = NodeId::new([0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F]);
const ROOT: NodeId = NodeId::new([0xAA; 6]);

#[derive(Default)]
struct Recorder(Mutex<Vec<String>>);

impl Recorder {
    fn messages(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl LogSink for Recorder {
    fn log(&self, _level: Level, _target: &str, message: &str) {
        self.0.lock().unwrap().push(message.to_owned());
    }
}

/// Transport that logs through the stream from inside every send, the way
/// a mesh stack with its own diagnostics would.
#[derive(Default)]
struct ChattyTransport {
    stream: OnceLock<Arc<LogStream>>,
    sent: Mutex<Vec<(NodeId, Packet)>>,
}

impl ChattyTransport {
    fn lines(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(_, packet)| match packet.payload() {
                Payload::LogLine { line, .. } => Some(line.to_string()),
                _ => None,
            })
            .collect()
    }
}

impl MeshTransport for ChattyTransport {
    fn local_id(&self) -> NodeId {
        NODE
    }

    fn broadcast(&self, _bytes: &[u8]) -> Result<(), TransportError> {
        Ok(())
    }

    fn send_to(&self, destination: NodeId, bytes: &[u8]) -> Result<(), TransportError> {
        let packet = Packet::decode(bytes).expect("stream emits valid packets");
        self.sent.lock().unwrap().push((destination, packet));
        if let Some(stream) = self.stream.get() {
            stream.log(Level::DEBUG, "mesh", "tx queued");
        }
        Ok(())
    }

    fn receive(&self) -> Result<(NodeId, Vec<u8>), TransportError> {
        Err(TransportError::Closed)
    }
}

struct Frozen(Option<OffsetDateTime>);

impl LogClock for Frozen {
    fn now(&self) -> Option<OffsetDateTime> {
        self.0
    }
}

fn enable(stream: &LogStream) {
    let control = encode(&Packet::new(ROOT, 1, Payload::LogControl { enable: true }));
    assert_eq!(stream.handle_control_packet(&control), Ok(true));
}

fn chatty_stream(clock: Frozen) -> (Arc<LogStream>, Arc<ChattyTransport>, Arc<Recorder>) {
    let transport = Arc::new(ChattyTransport::default());
    let previous = Arc::new(Recorder::default());
    let stream = Arc::new(
        LogStream::new(
            "pump-3",
            previous.clone(),
            transport.clone(),
            PacketCounter::new(),
            LogStreamConfig::default(),
        )
        .with_clock(Arc::new(clock)),
    );
    assert!(transport.stream.set(Arc::clone(&stream)).is_ok());
    (stream, transport, previous)
}

#[test]
fn reentrant_record_reaches_previous_sink_only() {
    let (stream, transport, previous) = chatty_stream(Frozen(None));
    enable(&stream);

    stream.log(Level::INFO, "app", "outer");

    assert_eq!(previous.messages(), ["outer", "tx queued"]);
    assert_eq!(transport.lines(), ["[no-time] INFO app: outer\n"]);

    // The guard was released: the next record is forwarded again.
    stream.log(Level::INFO, "app", "again");
    assert_eq!(transport.lines().len(), 2);
    assert_eq!(previous.messages().len(), 4);
}

#[test]
fn records_from_other_threads_are_all_forwarded() {
    let (stream, transport, _previous) = chatty_stream(Frozen(None));
    enable(&stream);

    let workers: Vec<_> = (0..4)
        .map(|i| {
            let stream = Arc::clone(&stream);
            thread::spawn(move || {
                for j in 0..10 {
                    stream.log(Level::INFO, "worker", &format!("{i}-{j}"));
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(transport.lines().len(), 40);
}

#[test]
fn long_line_is_capped_at_the_wire_limit() {
    let clock = Frozen(Some(datetime!(2025-01-31 23:59:58 UTC)));
    let (stream, transport, previous) = chatty_stream(clock);
    enable(&stream);

    let message = "x".repeat(400);
    stream.log(Level::ERROR, "pump", &message);

    assert_eq!(previous.messages()[0].len(), 400);
    let lines = transport.lines();
    assert_eq!(lines.len(), 1);
    let line = &lines[0];
    assert_eq!(line.len(), LOG_LINE_FIELD_LEN - 1);
    assert!(line.starts_with("[2025-01-31 23:59:58] ERROR pump: xxx"));
    assert!(line.ends_with('x'));
}

#[test]
fn log_lines_carry_tag_counter_and_destination() {
    let (stream, transport, _previous) = chatty_stream(Frozen(None));
    enable(&stream);

    stream.on_transport_connected();
    stream.log(Level::WARN, "app", "hello");

    let sent = transport.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|(dest, _)| dest.is_root()));
    assert!(sent.iter().all(|(_, packet)| packet.source() == NODE));
    assert_eq!(sent[0].1.counter(), 1);
    assert_eq!(sent[1].1.counter(), 2);
    assert!(matches!(sent[0].1.payload(), Payload::NodeInfo { tag } if tag == "pump-3"));
    assert!(matches!(sent[1].1.payload(), Payload::LogLine { tag, .. } if tag == "pump-3"));
}

#[test]
fn disabled_stream_only_feeds_previous_sink() {
    let (stream, transport, previous) = chatty_stream(Frozen(None));

    stream.log(Level::INFO, "app", "local only");
    assert_eq!(previous.messages(), ["local only"]);
    assert!(transport.lines().is_empty());
    assert!(NO_TIME_PREFIX.starts_with("[no-time]"));
}

#[test]
fn global_install_is_first_caller_wins() {
    let (stream, transport, previous) = chatty_stream(Frozen(None));

    assert!(Arc::clone(&stream).install(LevelFilter::INFO));
    assert!(!Arc::clone(&stream).install(LevelFilter::TRACE));
    assert!(
        previous
            .messages()
            .iter()
            .any(|m| m.contains("waiting for control"))
    );

    enable(&stream);
    tracing::info!(target: "app", sensor = "tds", "reading taken");
    tracing::debug!(target: "app", "below the installed level");

    let lines = transport.lines();
    assert!(
        lines
            .iter()
            .any(|l| l == "[no-time] INFO app: reading taken sensor=tds\n")
    );
    assert!(!lines.iter().any(|l| l.contains("below the installed level")));
}
