//! A mesh node: transport, sender, log stream and inbound queues wired
//! together.
//!
//! Inbound datagrams whose first byte is the packet magic take the binary
//! path; everything else is treated as a checksummed text frame. The node's
//! own broadcasts echoed back by the mesh are ignored.

use std::fmt;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info, instrument, warn};

use crate::logstream::{LogSink, LogStream, LogStreamConfig};
use crate::protocol::{
    Error, FrameError, MAGIC, NodeId, Packet, PacketCounter, PacketType, Payload, Result,
    add_checksum,
};
use crate::queue::{Inbox, InboxConfig, InboxReader, InboxWriter};
use crate::sender::{ReliableSender, SenderConfig};
use crate::transport::{SharedTransport, TransportError};

/// Name of the receive thread.
pub const RECEIVER_THREAD_NAME: &str = "meshlink-rx";

/// Node configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeConfig {
    /// Inbound queue sizes
    pub inbox: InboxConfig,
    /// Root sender settings
    pub sender: SenderConfig,
}

/// What happened to one inbound datagram.
#[derive(Debug)]
pub enum Inbound {
    /// Sent by this node, or empty
    Ignored,
    /// Verified text frame, queued
    Text,
    /// Decoded binary packet, queued
    Packet(Option<PacketType>),
    /// Log stream switched on or off
    Control {
        /// New forwarding state
        enabled: bool,
    },
    /// Frame or packet rejected and dropped
    Rejected(Error),
}

/// One node on the mesh.
pub struct MeshNode {
    transport: SharedTransport,
    counter: PacketCounter,
    sender: ReliableSender,
    inbox: Mutex<InboxWriter>,
    log_stream: Option<Arc<LogStream>>,
    config: NodeConfig,
}

impl fmt::Debug for MeshNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeshNode")
            .field("id", &self.transport.local_id())
            .field("sender", &self.sender)
            .field("log_stream", &self.log_stream)
            .finish_non_exhaustive()
    }
}

impl MeshNode {
    /// Create a node and the reader half of its inbound queues.
    #[must_use]
    pub fn new(transport: SharedTransport, config: NodeConfig) -> (Self, InboxReader) {
        let counter = PacketCounter::new();
        let sender = ReliableSender::new(Arc::clone(&transport), counter.clone(), config.sender);
        let (writer, reader) = Inbox::new(config.inbox);
        let node = Self {
            transport,
            counter,
            sender,
            inbox: Mutex::new(writer),
            log_stream: None,
            config,
        };
        (node, reader)
    }

    /// Build a log stream sharing this node's transport and counter.
    #[must_use]
    pub fn new_log_stream(
        &self,
        tag: &str,
        previous: Arc<dyn LogSink>,
        config: LogStreamConfig,
    ) -> LogStream {
        LogStream::new(
            tag,
            previous,
            Arc::clone(&self.transport),
            self.counter.clone(),
            config,
        )
    }

    /// Route `LogControl` packets to `stream` and announce it on connect.
    #[must_use]
    pub fn with_log_stream(mut self, stream: Arc<LogStream>) -> Self {
        self.log_stream = Some(stream);
        self
    }

    /// Replace the root sender, e.g. to install a drop hook.
    ///
    /// The sender should be built from [`transport`](Self::transport) and
    /// [`counter`](Self::counter).
    #[must_use]
    pub fn with_sender(mut self, sender: ReliableSender) -> Self {
        self.sender = sender;
        self
    }

    /// This node's identifier.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.transport.local_id()
    }

    /// The underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &SharedTransport {
        &self.transport
    }

    /// The counter shared by every binary packet this node sends.
    #[must_use]
    pub const fn counter(&self) -> &PacketCounter {
        &self.counter
    }

    /// The root sender.
    #[must_use]
    pub const fn sender(&self) -> &ReliableSender {
        &self.sender
    }

    /// Attached log stream, if any.
    #[must_use]
    pub const fn log_stream(&self) -> Option<&Arc<LogStream>> {
        self.log_stream.as_ref()
    }

    /// Node configuration.
    #[must_use]
    pub const fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Bring up outbound traffic once the mesh link is established.
    ///
    /// Starts the root sender on the first call and announces the node to
    /// the root through the log stream on every call.
    pub fn on_transport_connected(&self) -> Result<()> {
        if self
            .sender
            .start(self.config.sender.priority)
            .map_err(TransportError::from)?
        {
            info!(node = %self.id(), "mesh connected, root sender running");
        }
        if let Some(stream) = &self.log_stream {
            stream.on_transport_connected();
        }
        Ok(())
    }

    /// Classify and queue one inbound datagram.
    #[instrument(level = "trace", skip(self, bytes), fields(len = bytes.len()))]
    pub fn handle_datagram(&self, origin: NodeId, bytes: &[u8]) -> Inbound {
        if self.transport.is_self(origin) {
            return Inbound::Ignored;
        }
        match bytes.first() {
            None => Inbound::Ignored,
            Some(&MAGIC) => self.handle_packet(origin, bytes),
            Some(_) => self.handle_text(origin, bytes),
        }
    }

    fn handle_text(&self, origin: NodeId, bytes: &[u8]) -> Inbound {
        let Ok(raw) = std::str::from_utf8(bytes) else {
            return Inbound::Rejected(FrameError::Malformed.into());
        };
        if raw.trim().is_empty() {
            return Inbound::Ignored;
        }
        match lock(&self.inbox).accept_frame(origin, raw) {
            Ok(()) => Inbound::Text,
            Err(err) => Inbound::Rejected(err.into()),
        }
    }

    fn handle_packet(&self, origin: NodeId, bytes: &[u8]) -> Inbound {
        let packet = match Packet::decode(bytes) {
            Ok(packet) => packet,
            Err(err) => {
                warn!(%origin, error = %err, "dropping undecodable packet");
                return Inbound::Rejected(err.into());
            }
        };

        let packet_type = packet.packet_type();
        if let (Some(PacketType::LogControl), Some(stream)) = (packet_type, &self.log_stream) {
            // No logging on this path: the stream may be mid-forward.
            return match stream.handle_control_packet(bytes) {
                Ok(enabled) => Inbound::Control { enabled },
                Err(err) => Inbound::Rejected(err.into()),
            };
        }

        match packet.payload() {
            Payload::Text(text) => info!(
                counter = packet.counter(),
                %origin,
                source = %packet.source(),
                text = %text,
                "rx text packet"
            ),
            _ => debug!(
                counter = packet.counter(),
                %origin,
                packet_type = packet.header().type_byte(),
                "rx packet"
            ),
        }
        if lock(&self.inbox).accept_packet(packet) {
            debug!("packet queue full, oldest packet evicted");
        }
        Inbound::Packet(packet_type)
    }

    /// Spawn the receive thread.
    ///
    /// The thread feeds every datagram to [`handle_datagram`](Self::handle_datagram)
    /// and exits when the transport reports [`TransportError::Closed`].
    pub fn run_receiver(self: &Arc<Self>) -> io::Result<JoinHandle<()>> {
        let node = Arc::clone(self);
        thread::Builder::new()
            .name(RECEIVER_THREAD_NAME.into())
            .spawn(move || node.receive_loop())
    }

    fn receive_loop(&self) {
        loop {
            match self.transport.receive() {
                Ok((origin, bytes)) => {
                    self.handle_datagram(origin, &bytes);
                }
                Err(err) if err.is_closed() => {
                    debug!(node = %self.id(), "transport closed, receiver exiting");
                    break;
                }
                Err(err) => error!(error = %err, "mesh receive failed"),
            }
        }
    }

    /// Broadcast a checksummed text frame. Unreliable.
    pub fn broadcast_text(&self, body: &str) -> Result<()> {
        self.transport.broadcast(add_checksum(body).as_bytes())?;
        Ok(())
    }

    /// Send a checksummed text frame to one node. Unreliable.
    pub fn send_text_to(&self, destination: NodeId, body: &str) -> Result<()> {
        self.transport
            .send_to(destination, add_checksum(body).as_bytes())?;
        Ok(())
    }

    /// Send one binary packet with the next counter value. Unreliable.
    ///
    /// Returns the counter the packet carried.
    pub fn send_payload(&self, destination: NodeId, payload: Payload) -> Result<u32> {
        let packet = Packet::next(self.id(), &self.counter, payload);
        self.transport.send_to(destination, &packet.encode())?;
        Ok(packet.counter())
    }

    /// Queue `text` for reliable delivery to the root.
    pub fn send_to_root(&self, text: &str) -> bool {
        self.sender.enqueue(text)
    }

    /// Like [`send_to_root`](Self::send_to_root), reporting a full queue as
    /// [`Error::QueueFull`].
    pub fn try_send_to_root(&self, text: &str) -> Result<bool> {
        self.sender.try_enqueue(text)
    }

    /// Stop the root sender.
    pub fn shutdown(&self) {
        self.sender.shutdown();
    }
}

fn lock(inbox: &Mutex<InboxWriter>) -> MutexGuard<'_, InboxWriter> {
    inbox.lock().unwrap_or_else(PoisonError::into_inner)
}
