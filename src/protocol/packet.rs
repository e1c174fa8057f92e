//! Typed binary packets

use bytes::Bytes;

use super::{
    LogLineText, NodeId, NodeTag, PacketCounter, PacketHeader, PacketType, TextPayload,
};

/// Payload variants, one per packet type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Application text (`PacketType::Text`)
    Text(TextPayload),
    /// Forwarded log line (`PacketType::LogLine`)
    LogLine {
        /// Tag of the node that produced the line
        tag: NodeTag,
        /// Timestamped, formatted line
        line: LogLineText,
    },
    /// Log stream switch (`PacketType::LogControl`)
    LogControl {
        /// Whether forwarding should be on
        enable: bool,
    },
    /// Node announcement (`PacketType::NodeInfo`)
    NodeInfo {
        /// Tag of the announcing node
        tag: NodeTag,
    },
    /// Payload of a reserved type byte, left to the caller
    Unknown(Bytes),
}

impl Payload {
    /// Type of a known payload, `None` for [`Payload::Unknown`].
    #[must_use]
    pub const fn packet_type(&self) -> Option<PacketType> {
        match self {
            Self::Text(_) => Some(PacketType::Text),
            Self::LogLine { .. } => Some(PacketType::LogLine),
            Self::LogControl { .. } => Some(PacketType::LogControl),
            Self::NodeInfo { .. } => Some(PacketType::NodeInfo),
            Self::Unknown(_) => None,
        }
    }
}

/// Header plus typed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    header: PacketHeader,
    payload: Payload,
}

impl Packet {
    /// Build a packet for a known payload type.
    ///
    /// For [`Payload::Unknown`] use [`Packet::from_parts`] with a header
    /// carrying the reserved type byte.
    #[must_use]
    pub fn new(source: NodeId, counter: u32, payload: Payload) -> Self {
        let type_byte = payload.packet_type().map_or(0, PacketType::as_u8);
        Self {
            header: PacketHeader::with_type_byte(type_byte, counter, source),
            payload,
        }
    }

    /// Build a packet drawing the next value from `counter`.
    #[must_use]
    pub fn next(source: NodeId, counter: &PacketCounter, payload: Payload) -> Self {
        Self::new(source, counter.next(), payload)
    }

    /// Combine an already parsed header and payload.
    #[must_use]
    pub fn from_parts(header: PacketHeader, payload: Payload) -> Self {
        Self { header, payload }
    }

    /// Text packet.
    #[must_use]
    pub fn text(source: NodeId, counter: u32, text: &str) -> Self {
        Self::new(source, counter, Payload::Text(TextPayload::truncated(text)))
    }

    /// Get header
    #[must_use]
    pub const fn header(&self) -> &PacketHeader {
        &self.header
    }

    /// Get payload
    #[must_use]
    pub const fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Get packet type
    #[must_use]
    pub fn packet_type(&self) -> Option<PacketType> {
        self.header.packet_type()
    }

    /// Get counter
    #[must_use]
    pub const fn counter(&self) -> u32 {
        self.header.counter()
    }

    /// Get sender identifier
    #[must_use]
    pub const fn source(&self) -> NodeId {
        self.header.source()
    }

    /// Consume the packet and return its payload.
    #[must_use]
    pub fn into_payload(self) -> Payload {
        self.payload
    }

    /// Encode packet to bytes
    #[must_use]
    pub fn encode(&self) -> Bytes {
        super::encode(self)
    }

    /// Decode packet from bytes
    pub fn decode(bytes: &[u8]) -> Result<Self, super::DecodeError> {
        super::decode(bytes)
    }
}
