//! A root and two leaves on the in-process mesh.
//!
//! One leaf relays sensor readings to the root over a flaky link, the other
//! streams its logs once the root asks for them, and a broadcast `powled1`
//! switches every leaf's power LED.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use meshlink::legacy::{LedOutput, PowerLed};
use meshlink::logstream::StderrSink;
use meshlink::sender::BackoffPolicy;
use meshlink::transport::MemoryMesh;
use meshlink::{LogStreamConfig, MeshNode, NodeConfig, NodeId, Payload, SenderConfig};
use tracing::level_filters::LevelFilter;

const ROOT: NodeId = NodeId::new([0xAA, 0x00, 0x00, 0x00, 0x00, 0x01]);
const PUMP: NodeId = NodeId::new([0x24, 0x6F, 0x28, 0x00, 0x00, 0x0A]);
const TANK: NodeId = NodeId::new([0x24, 0x6F, 0x28, 0x00, 0x00, 0x0B]);

struct ConsolePin(&'static str);

impl LedOutput for ConsolePin {
    fn set_level(&mut self, high: bool) {
        println!("  [{}] power LED -> {}", self.0, if high { "HIGH" } else { "LOW" });
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("meshlink root relay demo");
    println!("========================\n");

    let config = NodeConfig {
        sender: SenderConfig {
            backoff: BackoffPolicy::fixed(Duration::from_millis(200)),
            ..SenderConfig::default()
        },
        ..NodeConfig::default()
    };

    let mesh = MemoryMesh::new();
    let root_link = mesh.join_root(ROOT);
    let (root, mut root_inbox) = MeshNode::new(root_link.clone(), config);
    let root = Arc::new(root);
    let root_rx = root.run_receiver()?;

    let pump_link = mesh.join(PUMP);
    let (pump, mut pump_inbox) = MeshNode::new(pump_link.clone(), config);
    let pump = Arc::new(pump);
    let pump_rx = pump.run_receiver()?;

    let tank_link = mesh.join(TANK);
    let (tank, mut tank_inbox) = MeshNode::new(tank_link.clone(), config);
    let stream = Arc::new(tank.new_log_stream(
        "tank",
        Arc::new(StderrSink),
        LogStreamConfig::default(),
    ));
    let tank = Arc::new(tank.with_log_stream(Arc::clone(&stream)));
    let tank_rx = tank.run_receiver()?;
    if !Arc::clone(&stream).install(LevelFilter::INFO) {
        println!("a global subscriber was already installed");
    }

    pump.on_transport_connected()?;
    tank.on_transport_connected()?;

    println!("pump relays readings over a link that drops the next 2 sends");
    pump_link.fail_next_sends(2);
    pump.send_to_root("tds=412");
    pump.send_to_root("temp=21.5");

    println!("root enables the tank log stream");
    root.send_payload(TANK, Payload::LogControl { enable: true })?;
    thread::sleep(Duration::from_millis(50));
    tracing::info!(target: "tank", percent = 80, "water level sampled");

    println!("root broadcasts powled1");
    root.broadcast_text("powled1")?;

    let deadline = Instant::now() + Duration::from_secs(2);
    let mut received = 0;
    while Instant::now() < deadline && received < 8 {
        match root_inbox.pop_packet() {
            Some(packet) => {
                received += 1;
                match packet.payload() {
                    Payload::Text(text) => {
                        let (source, counter) = (packet.source(), packet.counter());
                        println!("root <- {source} text #{counter}: {text}");
                    }
                    Payload::NodeInfo { tag } => {
                        println!("root <- {} node info: {tag}", packet.source());
                    }
                    Payload::LogLine { tag, line } => {
                        print!("root <- {} log [{tag}]: {line}", packet.source());
                    }
                    other => println!("root <- {} {other:?}", packet.source()),
                }
            }
            None => thread::sleep(Duration::from_millis(10)),
        }
    }

    for (name, inbox) in [("pump", &mut pump_inbox), ("tank", &mut tank_inbox)] {
        let mut led = PowerLed::new(ConsolePin(name));
        while let Some(body) = inbox.pop_verified_body() {
            led.handle_text(&body);
        }
    }

    let stats = pump.sender().stats();
    println!(
        "\npump sender: {} sent, {} failed attempts, {} dropped",
        stats.sent,
        stats.failures,
        stats.dropped_queue_full + stats.dropped_on_retry + stats.dropped_retries_exhausted
    );

    for (node, link, rx) in [
        (&pump, &pump_link, pump_rx),
        (&tank, &tank_link, tank_rx),
        (&root, &root_link, root_rx),
    ] {
        node.shutdown();
        link.close();
        let _ = rx.join();
    }

    Ok(())
}
