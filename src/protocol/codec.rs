//! Binary packet codec (encode/decode)
//!
//! Every packet is the 14-byte header followed by the fixed-size payload of
//! its type, so a receiver can dispatch on the type byte alone.

use bytes::{BufMut, Bytes, BytesMut};

use super::{
    DecodeError, HEADER_SIZE, LOG_LINE_FIELD_LEN, LogLineText, NodeTag, Packet, PacketHeader,
    PacketType, Payload, TAG_FIELD_LEN, TEXT_FIELD_LEN, TextPayload,
};

/// Encode a packet to bytes
///
/// # Format
///
/// ```text
/// [HEADER (14 bytes)] [PAYLOAD (fixed size per type)]
/// ```
///
/// String fields are NUL padded to their full width.
#[must_use]
pub fn encode(packet: &Packet) -> Bytes {
    let payload_len = match packet.payload() {
        Payload::Unknown(raw) => raw.len(),
        known => known.packet_type().map_or(0, PacketType::payload_len),
    };

    let mut bytes = BytesMut::with_capacity(HEADER_SIZE + payload_len);
    bytes.put_slice(&packet.header().to_bytes());

    match packet.payload() {
        Payload::Text(text) => put_field(&mut bytes, text.as_str(), TEXT_FIELD_LEN),
        Payload::LogLine { tag, line } => {
            put_field(&mut bytes, tag.as_str(), TAG_FIELD_LEN);
            put_field(&mut bytes, line.as_str(), LOG_LINE_FIELD_LEN);
        }
        Payload::LogControl { enable } => bytes.put_u8(u8::from(*enable)),
        Payload::NodeInfo { tag } => put_field(&mut bytes, tag.as_str(), TAG_FIELD_LEN),
        Payload::Unknown(raw) => bytes.put_slice(raw),
    }

    bytes.freeze()
}

/// Decode a packet from bytes
///
/// # Errors
///
/// Returns an error if:
/// - Buffer is shorter than the header, or than header plus the payload of
///   the claimed type
/// - Magic byte or version is not the supported one
///
/// Reserved type values decode to [`Payload::Unknown`] with the remaining
/// bytes; bytes past the fixed size of a known type are ignored.
pub fn decode(bytes: &[u8]) -> Result<Packet, DecodeError> {
    let header = PacketHeader::from_bytes(bytes)?;
    let body = &bytes[HEADER_SIZE..];

    let Some(packet_type) = header.packet_type() else {
        return Ok(Packet::from_parts(
            header,
            Payload::Unknown(Bytes::copy_from_slice(body)),
        ));
    };

    let needed = HEADER_SIZE + packet_type.payload_len();
    if bytes.len() < needed {
        return Err(DecodeError::TooShort {
            needed,
            got: bytes.len(),
        });
    }

    let payload = match packet_type {
        PacketType::Text => Payload::Text(TextPayload::from_nul_padded(&body[..TEXT_FIELD_LEN])),
        PacketType::LogLine => Payload::LogLine {
            tag: NodeTag::from_nul_padded(&body[..TAG_FIELD_LEN]),
            line: LogLineText::from_nul_padded(
                &body[TAG_FIELD_LEN..TAG_FIELD_LEN + LOG_LINE_FIELD_LEN],
            ),
        },
        PacketType::LogControl => Payload::LogControl {
            enable: body[0] != 0,
        },
        PacketType::NodeInfo => Payload::NodeInfo {
            tag: NodeTag::from_nul_padded(&body[..TAG_FIELD_LEN]),
        },
    };

    Ok(Packet::from_parts(header, payload))
}

fn put_field(bytes: &mut BytesMut, value: &str, width: usize) {
    let start = bytes.len();
    bytes.put_bytes(0, width);
    // Field types are sized one byte under the width, so the NUL survives.
    let value = value.as_bytes();
    let take = value.len().min(width - 1);
    bytes[start..start + take].copy_from_slice(&value[..take]);
}
