//! CRC-8 text framing
//!
//! Text frames travel as `<body>*<HH>` where `HH` is the uppercase hex
//! CRC-8/Dallas-Maxim of `<body>` exactly as sent.

use std::fmt::Write;

use super::FrameError;

/// Frame checksum delimiter.
pub const DELIMITER: char = '*';

/// Length of the checksum suffix: delimiter plus two hex digits.
pub const SUFFIX_LEN: usize = 3;

const REFLECTED_POLY: u8 = 0x8C;

/// CRC-8/Dallas-Maxim (polynomial 0x31, reflected 0x8C, initial value 0).
///
/// Bits are consumed LSB-first; the reflected polynomial is fed back
/// whenever the shifted-out bit differs from the input bit.
#[must_use]
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in data {
        let mut input = byte;
        for _ in 0..8 {
            let mix = (crc ^ input) & 0x01;
            crc >>= 1;
            if mix != 0 {
                crc ^= REFLECTED_POLY;
            }
            input >>= 1;
        }
    }
    crc
}

/// Append `*HH` to `body`.
#[must_use]
pub fn add_checksum(body: &str) -> String {
    let mut frame = String::with_capacity(body.len() + SUFFIX_LEN);
    frame.push_str(body);
    frame.push(DELIMITER);
    // Writing into a String cannot fail.
    let _ = write!(frame, "{:02X}", crc8(body.as_bytes()));
    frame
}

/// Validate the checksum suffix of `frame` and return the body.
///
/// The body is returned exactly as received, without trimming.
pub fn verify_and_strip(frame: &str) -> Result<&str, FrameError> {
    let pos = frame.rfind(DELIMITER).ok_or(FrameError::Malformed)?;
    if pos + SUFFIX_LEN != frame.len() {
        return Err(FrameError::Malformed);
    }

    let hex = &frame[pos + 1..];
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(FrameError::BadHex);
    }
    let found = u8::from_str_radix(hex, 16).map_err(|_| FrameError::BadHex)?;

    let body = &frame[..pos];
    let expected = crc8(body.as_bytes());
    if expected != found {
        return Err(FrameError::ChecksumMismatch { expected, found });
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc8_check_value() {
        assert_eq!(crc8(b"123456789"), 0xA1);
        assert_eq!(crc8(b""), 0x00);
    }

    #[test]
    fn test_pm1_golden_frame() {
        assert_eq!(crc8(b"pm1"), 0xDC);
        assert_eq!(add_checksum("pm1"), "pm1*DC");
        assert_eq!(verify_and_strip("pm1*DC"), Ok("pm1"));
    }

    #[test]
    fn test_lowercase_hex_is_accepted() {
        assert_eq!(verify_and_strip("pm1*dc"), Ok("pm1"));
    }

    #[test]
    fn test_missing_delimiter_is_malformed() {
        assert_eq!(verify_and_strip("pm1DC"), Err(FrameError::Malformed));
        assert_eq!(verify_and_strip(""), Err(FrameError::Malformed));
    }

    #[test]
    fn test_delimiter_must_sit_three_from_the_end() {
        assert_eq!(verify_and_strip("pm1*D"), Err(FrameError::Malformed));
        assert_eq!(verify_and_strip("pm1*DC0"), Err(FrameError::Malformed));
        // An earlier '*' does not count once a later one exists.
        assert_eq!(verify_and_strip("a*DC*x"), Err(FrameError::Malformed));
    }

    #[test]
    fn test_non_hex_suffix() {
        assert_eq!(verify_and_strip("pm1*ZZ"), Err(FrameError::BadHex));
        assert_eq!(verify_and_strip("pm1*+1"), Err(FrameError::BadHex));
        assert_eq!(verify_and_strip("pm1* 1"), Err(FrameError::BadHex));
    }

    #[test]
    fn test_tampered_checksum_detected() {
        assert_eq!(
            verify_and_strip("pm1*DD"),
            Err(FrameError::ChecksumMismatch {
                expected: 0xDC,
                found: 0xDD
            })
        );
    }

    #[test]
    fn test_body_may_contain_delimiter() {
        let frame = add_checksum("a*b");
        assert_eq!(verify_and_strip(&frame), Ok("a*b"));
    }

    #[test]
    fn test_body_is_not_trimmed() {
        let frame = add_checksum(" powled1 ");
        assert_eq!(verify_and_strip(&frame), Ok(" powled1 "));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: framing then verifying yields the original body
            #[test]
            fn test_prop_roundtrip(body in ".{0,80}") {
                let frame = add_checksum(&body);
                prop_assert_eq!(verify_and_strip(&frame), Ok(body.as_str()));
            }

            /// Property: any other checksum value is reported as a mismatch
            #[test]
            fn test_prop_tampered_suffix_rejected(body in "[ -~]{0,40}", delta in 1u8..=255) {
                let wrong = crc8(body.as_bytes()).wrapping_add(delta);
                let frame = format!("{body}*{wrong:02X}");
                let rejected = matches!(
                    verify_and_strip(&frame),
                    Err(FrameError::ChecksumMismatch { .. })
                );
                prop_assert!(rejected);
            }

            /// Property: frames without a delimiter are malformed
            #[test]
            fn test_prop_missing_delimiter_rejected(body in "[a-zA-Z0-9 ]{0,40}") {
                prop_assert_eq!(verify_and_strip(&body), Err(FrameError::Malformed));
            }
        }
    }
}
