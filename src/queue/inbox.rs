//! Receive-side buffering between the transport callback and the
//! application.
//!
//! Verified text bodies land in two independently sized evicting queues:
//! one carrying the body only, one carrying the body with its origin.
//! Decoded binary packets land in a third.

use crate::protocol::{FrameBody, FrameError, NodeId, Packet, checksum};

use super::evicting::{Consumer, Producer, evicting_queue};

/// Capacities of the inbound queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InboxConfig {
    /// Slots in each of the two text queues
    pub capacity: usize,
    /// Slots in the decoded packet queue
    pub packet_capacity: usize,
}

impl Default for InboxConfig {
    fn default() -> Self {
        Self {
            capacity: 8,
            packet_capacity: 8,
        }
    }
}

/// Factory for the inbound queue pair.
#[derive(Debug)]
pub struct Inbox;

impl Inbox {
    /// Build the queues and split them into writer and reader halves.
    #[must_use]
    pub fn new(config: InboxConfig) -> (InboxWriter, InboxReader) {
        let (bodies_tx, bodies_rx) = evicting_queue(config.capacity);
        let (routed_tx, routed_rx) = evicting_queue(config.capacity);
        let (packets_tx, packets_rx) = evicting_queue(config.packet_capacity);
        (
            InboxWriter {
                bodies: bodies_tx,
                routed: routed_tx,
                packets: packets_tx,
            },
            InboxReader {
                bodies: bodies_rx,
                routed: routed_rx,
                packets: packets_rx,
            },
        )
    }
}

/// Producer half, owned by whoever drives the transport receive path.
#[derive(Debug)]
pub struct InboxWriter {
    bodies: Producer<FrameBody>,
    routed: Producer<(NodeId, FrameBody)>,
    packets: Producer<Packet>,
}

impl InboxWriter {
    /// Verify a raw text frame and queue its body.
    ///
    /// Surrounding whitespace is trimmed first. Rejected frames leave both
    /// queues untouched; the error is returned for the caller to discard.
    pub fn accept_frame(&mut self, origin: NodeId, raw: &str) -> Result<(), FrameError> {
        let body = checksum::verify_and_strip(raw.trim())?;
        let body = FrameBody::truncated(body);
        self.bodies.push(body);
        self.routed.push((origin, body));
        Ok(())
    }

    /// Queue a decoded binary packet.
    ///
    /// Returns `true` when an older packet was evicted to make room.
    pub fn accept_packet(&mut self, packet: Packet) -> bool {
        self.packets.push(packet)
    }
}

/// Consumer half, owned by the application.
#[derive(Debug)]
pub struct InboxReader {
    bodies: Consumer<FrameBody>,
    routed: Consumer<(NodeId, FrameBody)>,
    packets: Consumer<Packet>,
}

impl InboxReader {
    /// Oldest verified body.
    pub fn pop_verified_body(&mut self) -> Option<FrameBody> {
        self.bodies.pop()
    }

    /// Oldest verified body together with the node it came from.
    pub fn pop_verified_body_with_origin(&mut self) -> Option<(NodeId, FrameBody)> {
        self.routed.pop()
    }

    /// Oldest decoded binary packet.
    pub fn pop_packet(&mut self) -> Option<Packet> {
        self.packets.pop()
    }

    /// Text bodies overwritten before being read.
    #[must_use]
    pub fn text_overruns(&self) -> u64 {
        self.bodies.evicted()
    }

    /// Packets overwritten before being read.
    #[must_use]
    pub fn packet_overruns(&self) -> u64 {
        self.packets.evicted()
    }
}
