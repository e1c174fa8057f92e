//! Fixed-capacity inline strings with silent truncation.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;

/// UTF-8 string stored inline in `N` bytes.
///
/// Content beyond `N` bytes is dropped at the last character boundary that
/// fits and [`is_truncated`](Self::is_truncated) reports it; no operation
/// fails. The type is `Copy`, so queue slots and packet fields are copied in
/// and out by value. Equality and hashing look at the content only.
#[derive(Clone, Copy)]
pub struct BoundedString<const N: usize> {
    bytes: [u8; N],
    len: usize,
    truncated: bool,
}

impl<const N: usize> BoundedString<N> {
    /// Maximum content length in bytes.
    pub const CAPACITY: usize = N;

    /// Create an empty string.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bytes: [0u8; N],
            len: 0,
            truncated: false,
        }
    }

    /// Copy `s`, truncating it to `N` bytes if needed.
    #[must_use]
    pub fn truncated(s: &str) -> Self {
        let mut out = Self::new();
        out.push_str(s);
        out
    }

    /// Build from a NUL-padded wire field: stops at the first NUL and
    /// replaces invalid UTF-8.
    #[must_use]
    pub fn from_nul_padded(field: &[u8]) -> Self {
        let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
        Self::truncated(&String::from_utf8_lossy(&field[..end]))
    }

    /// Append as much of `s` as fits.
    pub fn push_str(&mut self, s: &str) {
        let room = N - self.len;
        let take = floor_char_boundary(s, room);
        self.bytes[self.len..self.len + take].copy_from_slice(&s.as_bytes()[..take]);
        self.len += take;
        if take < s.len() {
            self.truncated = true;
        }
    }

    /// Append a single character if it fits.
    pub fn push(&mut self, ch: char) {
        let mut buf = [0u8; 4];
        self.push_str(ch.encode_utf8(&mut buf));
    }

    /// Remove the last character.
    pub fn pop(&mut self) -> Option<char> {
        let ch = self.as_str().chars().next_back()?;
        self.len -= ch.len_utf8();
        self.bytes[self.len..self.len + ch.len_utf8()].fill(0);
        Some(ch)
    }

    /// Borrow the content.
    #[must_use]
    pub fn as_str(&self) -> &str {
        // Only whole characters are ever copied in.
        std::str::from_utf8(&self.bytes[..self.len]).unwrap_or_default()
    }

    /// Content length in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the string is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether any input was dropped to fit the capacity.
    #[must_use]
    pub const fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Write the content into a fixed-width wire field of `field.len()`
    /// bytes, NUL padded and always NUL terminated.
    pub fn write_nul_padded(&self, field: &mut [u8]) {
        field.fill(0);
        let take = floor_char_boundary(self.as_str(), field.len().saturating_sub(1));
        field[..take].copy_from_slice(&self.bytes[..take]);
    }
}

fn floor_char_boundary(s: &str, max: usize) -> usize {
    if max >= s.len() {
        return s.len();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    end
}

impl<const N: usize> Default for BoundedString<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Deref for BoundedString<N> {
    type Target = str;

    fn deref(&self) -> &str {
        self.as_str()
    }
}

impl<const N: usize> AsRef<str> for BoundedString<N> {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl<const N: usize> From<&str> for BoundedString<N> {
    fn from(s: &str) -> Self {
        Self::truncated(s)
    }
}

impl<const N: usize> PartialEq for BoundedString<N> {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl<const N: usize> Eq for BoundedString<N> {}

impl<const N: usize> Hash for BoundedString<N> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl<const N: usize> PartialEq<str> for BoundedString<N> {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl<const N: usize> PartialEq<&str> for BoundedString<N> {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl<const N: usize> fmt::Write for BoundedString<N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_str(s);
        Ok(())
    }
}

impl<const N: usize> fmt::Display for BoundedString<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<const N: usize> fmt::Debug for BoundedString<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write as _;

    #[test]
    fn test_short_input_is_kept() {
        let s = BoundedString::<8>::truncated("pm1");
        assert_eq!(s, "pm1");
        assert_eq!(s.len(), 3);
        assert!(!s.is_truncated());
    }

    #[test]
    fn test_long_input_is_cut_silently() {
        let s = BoundedString::<4>::truncated("powled1");
        assert_eq!(s, "powl");
        assert!(s.is_truncated());
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        // "żółw" is 7 bytes; 'ł' occupies bytes 4..6.
        let s = BoundedString::<5>::truncated("żółw");
        assert_eq!(s, "żó");
        assert!(s.is_truncated());
    }

    #[test]
    fn test_fmt_write_truncates_instead_of_failing() {
        let mut s = BoundedString::<6>::new();
        write!(s, "{}-{}", "abc", 12345).unwrap();
        assert_eq!(s, "abc-12");
        assert!(s.is_truncated());
    }

    #[test]
    fn test_nul_padded_field_roundtrip() {
        let s = BoundedString::<15>::truncated("root-node");
        let mut field = [0xFFu8; 16];
        s.write_nul_padded(&mut field);
        assert_eq!(&field[..9], b"root-node");
        assert!(field[9..].iter().all(|&b| b == 0));
        assert_eq!(BoundedString::<15>::from_nul_padded(&field), "root-node");
    }

    #[test]
    fn test_wire_field_always_keeps_a_terminator() {
        let s = BoundedString::<8>::truncated("abcdefgh");
        let mut field = [0u8; 4];
        s.write_nul_padded(&mut field);
        assert_eq!(&field, b"abc\0");
    }

    #[test]
    fn test_pop_removes_last_char() {
        let mut s = BoundedString::<8>::truncated("ab");
        assert_eq!(s.pop(), Some('b'));
        s.push('\n');
        assert_eq!(s, "a\n");
    }
}
