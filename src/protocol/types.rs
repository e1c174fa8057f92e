//! Packet types and node identifiers

use std::fmt;

use super::NODE_ID_LEN;

/// Binary packet types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    /// Application text relayed to the root
    Text = 0x01,
    /// One forwarded diagnostic log line
    LogLine = 0x02,
    /// Remote enable/disable of the log stream
    LogControl = 0x03,
    /// Node announcement carrying its log tag
    NodeInfo = 0x04,
}

impl PacketType {
    /// Convert from byte
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::Text),
            0x02 => Some(Self::LogLine),
            0x03 => Some(Self::LogControl),
            0x04 => Some(Self::NodeInfo),
            _ => None,
        }
    }

    /// Convert to byte
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Fixed payload size carried after the header.
    #[must_use]
    pub const fn payload_len(self) -> usize {
        use super::{LOG_LINE_FIELD_LEN, TAG_FIELD_LEN, TEXT_FIELD_LEN};

        match self {
            Self::Text => TEXT_FIELD_LEN,
            Self::LogLine => TAG_FIELD_LEN + LOG_LINE_FIELD_LEN,
            Self::LogControl => 1,
            Self::NodeInfo => TAG_FIELD_LEN,
        }
    }

    /// Whether the packet belongs to the diagnostic log stream.
    #[must_use]
    pub const fn is_diagnostic(self) -> bool {
        matches!(self, Self::LogLine | Self::LogControl | Self::NodeInfo)
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "Text",
            Self::LogLine => "LogLine",
            Self::LogControl => "LogControl",
            Self::NodeInfo => "NodeInfo",
        };
        write!(f, "{name}")
    }
}

/// 6-byte hardware identifier of a mesh node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId([u8; NODE_ID_LEN]);

impl NodeId {
    /// All-zero address: the mesh root.
    pub const ROOT: Self = Self([0u8; NODE_ID_LEN]);

    /// Wrap raw identifier bytes.
    #[must_use]
    pub const fn new(bytes: [u8; NODE_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw identifier bytes.
    #[must_use]
    pub const fn octets(&self) -> [u8; NODE_ID_LEN] {
        self.0
    }

    /// Whether this is the root address.
    #[must_use]
    pub fn is_root(&self) -> bool {
        *self == Self::ROOT
    }
}

impl From<[u8; NODE_ID_LEN]> for NodeId {
    fn from(bytes: [u8; NODE_ID_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}
