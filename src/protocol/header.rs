//! Binary packet header
//!
//! The header is 14 bytes, packed, little-endian.

use super::{DecodeError, HEADER_SIZE, MAGIC, NODE_ID_LEN, NodeId, PROTOCOL_VERSION, PacketType};

/// Binary packet header (14 bytes, no padding)
///
/// # Wire Format
///
/// ```text
///  0       1       2       3       4                               8
/// +-------+-------+-------+-------+-------+-------+-------+-------+
/// | Magic |Version| Type  | Rsvd  |        Counter (u32 LE)       |
/// +-------+-------+-------+-------+-------+-------+-------+-------+
/// |                 Source ID (6)                 |
/// +-------+-------+-------+-------+-------+-------+
///  8                                              14
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    magic: u8,
    version: u8,
    packet_type: u8,
    reserved: u8,
    counter: u32,
    source: NodeId,
}

impl PacketHeader {
    /// Create a new packet header
    #[must_use]
    pub fn new(packet_type: PacketType, counter: u32, source: NodeId) -> Self {
        Self::with_type_byte(packet_type.as_u8(), counter, source)
    }

    /// Create a header carrying an arbitrary type byte.
    #[must_use]
    pub const fn with_type_byte(packet_type: u8, counter: u32, source: NodeId) -> Self {
        Self {
            magic: MAGIC,
            version: PROTOCOL_VERSION,
            packet_type,
            reserved: 0,
            counter,
            source,
        }
    }

    /// Get magic byte
    #[must_use]
    pub const fn magic(&self) -> u8 {
        self.magic
    }

    /// Get protocol version
    #[must_use]
    pub const fn version(&self) -> u8 {
        self.version
    }

    /// Get packet type byte
    #[must_use]
    pub const fn type_byte(&self) -> u8 {
        self.packet_type
    }

    /// Get packet type, `None` for reserved values
    #[must_use]
    pub fn packet_type(&self) -> Option<PacketType> {
        PacketType::from_u8(self.packet_type)
    }

    /// Get packet counter
    #[must_use]
    pub const fn counter(&self) -> u32 {
        self.counter
    }

    /// Get sender identifier
    #[must_use]
    pub const fn source(&self) -> NodeId {
        self.source
    }

    /// Validate magic and version
    pub fn validate(&self) -> Result<(), DecodeError> {
        if self.magic != MAGIC {
            return Err(DecodeError::BadMagic(self.magic));
        }
        if self.version != PROTOCOL_VERSION {
            return Err(DecodeError::BadVersion(self.version));
        }
        Ok(())
    }

    /// Convert to bytes (little-endian)
    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];

        bytes[0] = self.magic;
        bytes[1] = self.version;
        bytes[2] = self.packet_type;
        bytes[3] = self.reserved;
        bytes[4..8].copy_from_slice(&self.counter.to_le_bytes());
        bytes[8..14].copy_from_slice(&self.source.octets());

        bytes
    }

    /// Parse from bytes (little-endian)
    ///
    /// The reserved byte is carried but not checked.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < HEADER_SIZE {
            return Err(DecodeError::TooShort {
                needed: HEADER_SIZE,
                got: bytes.len(),
            });
        }

        let mut counter = [0u8; 4];
        counter.copy_from_slice(&bytes[4..8]);
        let mut source = [0u8; NODE_ID_LEN];
        source.copy_from_slice(&bytes[8..14]);

        let header = Self {
            magic: bytes[0],
            version: bytes[1],
            packet_type: bytes[2],
            reserved: bytes[3],
            counter: u32::from_le_bytes(counter),
            source: NodeId::new(source),
        };

        header.validate()?;
        Ok(header)
    }
}
