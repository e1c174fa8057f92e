//! meshlink wire formats
//!
//! This module provides the CRC-8 text framing, the fixed-layout binary
//! packet header and payloads, and the codec shared by the text relay and the
//! diagnostic log stream.

pub mod checksum;
mod bounded;
mod codec;
mod counter;
mod error;
mod header;
mod packet;
mod types;

pub use bounded::BoundedString;
pub use checksum::{add_checksum, crc8, verify_and_strip};
pub use codec::{decode, encode};
pub use counter::PacketCounter;
pub use error::{DecodeError, Error, FrameError, Result};
pub use header::PacketHeader;
pub use packet::{Packet, Payload};
pub use types::{NodeId, PacketType};

/// Packet magic byte: every binary packet starts with it.
pub const MAGIC: u8 = 0xA5;

/// The single supported binary protocol version.
pub const PROTOCOL_VERSION: u8 = 1;

/// Header size in bytes (magic, version, type, reserved, counter, source).
pub const HEADER_SIZE: usize = 14;

/// Size of a node identifier on the wire.
pub const NODE_ID_LEN: usize = 6;

/// Width of the `Text` payload field, including the NUL terminator.
pub const TEXT_FIELD_LEN: usize = 32;

/// Width of the node tag field carried by log packets.
pub const TAG_FIELD_LEN: usize = 16;

/// Width of the log line field, including the NUL terminator.
pub const LOG_LINE_FIELD_LEN: usize = 256;

/// Receive slot size for text frame bodies, including the terminator.
pub const FRAME_SLOT_LEN: usize = 64;

/// Body of a verified text frame as stored in the inbound queues.
pub type FrameBody = BoundedString<{ FRAME_SLOT_LEN - 1 }>;

/// Text carried by a binary `Text` packet.
pub type TextPayload = BoundedString<{ TEXT_FIELD_LEN - 1 }>;

/// Short tag naming a node in log packets.
pub type NodeTag = BoundedString<{ TAG_FIELD_LEN - 1 }>;

/// A single forwarded log line.
pub type LogLineText = BoundedString<{ LOG_LINE_FIELD_LEN - 1 }>;
