//! meshlink error types

use thiserror::Error;

use super::types::NodeId;
use crate::transport::TransportError;

/// Rejection reasons for an inbound text frame.
///
/// All of them lead to a silent drop of the frame: no reply, no log line.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// No `*` delimiter, or it is not exactly three characters from the end.
    #[error("malformed frame: checksum suffix missing or misplaced")]
    Malformed,

    /// The two trailing characters are not hexadecimal.
    #[error("malformed frame: checksum suffix is not hexadecimal")]
    BadHex,

    /// The recomputed checksum differs from the transmitted one.
    #[error("checksum mismatch: expected {expected:#04x}, got {found:#04x}")]
    ChecksumMismatch {
        /// Checksum computed over the received body
        expected: u8,
        /// Checksum carried by the frame
        found: u8,
    },
}

/// Rejection reasons for an inbound binary packet.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Buffer shorter than the header, or than header plus the fixed payload
    /// of the claimed type.
    #[error("packet too short: need {needed} bytes, got {got}")]
    TooShort {
        /// Needed size
        needed: usize,
        /// Actual size
        got: usize,
    },

    /// Magic byte does not match.
    #[error("invalid magic byte: expected 0xa5, got {0:#04x}")]
    BadMagic(u8),

    /// Unsupported protocol version.
    #[error("unsupported protocol version {0}")]
    BadVersion(u8),

    /// A well-formed packet of a type the caller did not ask for.
    #[error("unexpected packet type: expected {expected:#04x}, got {found:#04x}")]
    UnexpectedType {
        /// Type byte the caller requires
        expected: u8,
        /// Type byte carried by the packet
        found: u8,
    },
}

/// meshlink errors
#[derive(Error, Debug)]
pub enum Error {
    /// Text frame rejected
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Binary packet rejected
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Transport failure
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Work queue at capacity
    #[error("queue full, message for {destination} dropped")]
    QueueFull {
        /// Destination of the dropped message
        destination: NodeId,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
