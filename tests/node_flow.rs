use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use meshlink::legacy::{LedOutput, PowerLed};
use meshlink::logstream::NoopSink;
use meshlink::queue::InboxReader;
use meshlink::sender::BackoffPolicy;
use meshlink::transport::{MemoryLink, MemoryMesh};
use meshlink::{
    Inbound, LogSink, LogStreamConfig, MeshNode, MeshTransport, NodeConfig, NodeId, PacketType,
    Payload, SenderConfig,
};

const ROOT: NodeId = NodeId::new([0xAA, 0xAA, 0xAA, 0x00, 0x00, 0x01]);
const LEAF_A: NodeId = NodeId::new([0x24, 0x6F, 0x28, 0x00, 0x00, 0x0A]);
const LEAF_B: NodeId = NodeId::new([0x24, 0x6F, 0x28, 0x00, 0x00, 0x0B]);

struct Running {
    node: Arc<MeshNode>,
    inbox: InboxReader,
    link: Arc<MemoryLink>,
    rx: thread::JoinHandle<()>,
}

impl Running {
    fn stop(self) -> InboxReader {
        self.node.shutdown();
        self.link.close();
        self.rx.join().unwrap();
        self.inbox
    }
}

fn fast_config() -> NodeConfig {
    NodeConfig {
        sender: SenderConfig {
            backoff: BackoffPolicy::fixed(Duration::from_millis(5)),
            ..SenderConfig::default()
        },
        ..NodeConfig::default()
    }
}

fn start(link: Arc<MemoryLink>, config: NodeConfig) -> Running {
    let (node, inbox) = MeshNode::new(link.clone(), config);
    let node = Arc::new(node);
    let rx = node.run_receiver().unwrap();
    Running {
        node,
        inbox,
        link,
        rx,
    }
}

fn poll<T>(what: &str, mut f: impl FnMut() -> Option<T>) -> T {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(value) = f() {
            return value;
        }
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn broadcast_text_reaches_peers_but_not_sender() {
    let mesh = MemoryMesh::new();
    mesh.set_echo_broadcasts(true);
    let mut a = start(mesh.join(LEAF_A), fast_config());
    let mut b = start(mesh.join(LEAF_B), fast_config());

    a.node.broadcast_text("flow").unwrap();

    let (origin, body) = poll("text at B", || b.inbox.pop_verified_body_with_origin());
    assert_eq!(origin, LEAF_A);
    assert_eq!(body, "flow");
    assert_eq!(b.inbox.pop_verified_body().unwrap(), "flow");

    // Give A's receiver time to see its own echo.
    thread::sleep(Duration::from_millis(20));
    assert!(a.inbox.pop_verified_body().is_none());

    a.stop();
    b.stop();
}

#[test]
fn corrupted_frames_never_reach_the_inbox() {
    let mesh = MemoryMesh::new();
    let node_link = mesh.join(LEAF_A);
    let (node, mut inbox) = MeshNode::new(node_link, NodeConfig::default());

    let frames: [&[u8]; 5] = [b"pm1*DD", b"pm1", b"pm1*G0", b"*01", b"pm1*DC*"];
    for raw in frames {
        assert!(matches!(
            node.handle_datagram(LEAF_B, raw),
            Inbound::Rejected(_)
        ));
    }
    assert!(inbox.pop_verified_body().is_none());
    assert!(inbox.pop_verified_body_with_origin().is_none());
}

#[test]
fn inbox_keeps_the_most_recent_frames() {
    let mesh = MemoryMesh::new();
    let (node, mut inbox) = MeshNode::new(mesh.join(LEAF_A), NodeConfig::default());

    for i in 0..12 {
        let frame = meshlink::protocol::add_checksum(&format!("m{i}"));
        assert!(matches!(
            node.handle_datagram(LEAF_B, frame.as_bytes()),
            Inbound::Text
        ));
    }

    let mut bodies = Vec::new();
    while let Some(body) = inbox.pop_verified_body() {
        bodies.push(body.to_string());
    }
    assert_eq!(bodies, ["m4", "m5", "m6", "m7", "m8", "m9", "m10", "m11"]);
    assert_eq!(inbox.text_overruns(), 4);
}

#[test]
fn root_receives_leaf_messages_through_transient_failures() {
    let mesh = MemoryMesh::new();
    let mut root = start(mesh.join_root(ROOT), fast_config());
    let leaf_link = mesh.join(LEAF_A);
    let leaf = start(leaf_link.clone(), fast_config());

    leaf.node.on_transport_connected().unwrap();
    leaf_link.fail_next_sends(3);
    assert!(leaf.node.send_to_root("tds=412"));
    assert!(leaf.node.send_to_root("temp=21.5"));

    let first = poll("first packet at root", || root.inbox.pop_packet());
    let second = poll("second packet at root", || root.inbox.pop_packet());
    assert_eq!(first.source(), LEAF_A);
    assert!(matches!(first.payload(), Payload::Text(t) if t == "tds=412"));
    assert!(matches!(second.payload(), Payload::Text(t) if t == "temp=21.5"));
    assert!(second.counter() > first.counter());

    let stats = poll("sender stats", || {
        let stats = leaf.node.sender().stats();
        (stats.sent == 2).then_some(stats)
    });
    assert_eq!(stats.failures, 3);

    leaf.stop();
    root.stop();
}

#[test]
fn root_switches_leaf_log_stream() {
    let mesh = MemoryMesh::new();
    let mut root = start(mesh.join_root(ROOT), fast_config());

    let leaf_link = mesh.join(LEAF_A);
    let (leaf, _leaf_inbox) = MeshNode::new(leaf_link.clone(), fast_config());
    let stream = Arc::new(leaf.new_log_stream(
        "tank",
        Arc::new(NoopSink),
        LogStreamConfig::default(),
    ));
    let leaf = Arc::new(leaf.with_log_stream(Arc::clone(&stream)));
    let leaf_rx = leaf.run_receiver().unwrap();

    leaf.on_transport_connected().unwrap();
    let hello = poll("node info at root", || root.inbox.pop_packet());
    assert_eq!(hello.packet_type(), Some(PacketType::NodeInfo));

    root.node
        .send_payload(LEAF_A, Payload::LogControl { enable: true })
        .unwrap();
    poll("stream enabled", || stream.is_enabled().then_some(()));

    stream.log(tracing::Level::INFO, "tank", "level=80%");
    let line = poll("log line at root", || root.inbox.pop_packet());
    match line.payload() {
        Payload::LogLine { tag, line } => {
            assert_eq!(tag, "tank");
            assert!(line.ends_with("INFO tank: level=80%\n"));
        }
        other => panic!("expected a log line, got {other:?}"),
    }
    assert!(line.counter() > hello.counter());

    leaf.shutdown();
    leaf_link.close();
    leaf_rx.join().unwrap();
    root.stop();
}

#[derive(Default)]
struct Pin(Vec<bool>);

impl LedOutput for Pin {
    fn set_level(&mut self, high: bool) {
        self.0.push(high);
    }
}

#[test]
fn legacy_commands_drive_the_power_led() {
    let mesh = MemoryMesh::new();
    let sender = mesh.join(LEAF_B);
    let mut leaf = start(mesh.join(LEAF_A), fast_config());
    let mut led = PowerLed::new(Pin::default());

    for body in ["readtds", "powled1", "pm1"] {
        sender
            .send_to(LEAF_A, meshlink::protocol::add_checksum(body).as_bytes())
            .unwrap();
    }
    for _ in 0..3 {
        let body = poll("command", || leaf.inbox.pop_verified_body());
        led.handle_text(&body);
    }

    assert!(led.is_on());
    assert_eq!(led.output().0, [false, true]);
    leaf.stop();
}

#[test]
fn receiver_exits_when_transport_closes() {
    let mesh = MemoryMesh::new();
    let leaf = start(mesh.join(LEAF_A), NodeConfig::default());
    let inbox = leaf.stop();
    drop(inbox);
}
