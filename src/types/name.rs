//! Fixed-width name cells
//!
//! Name, email and similar string fields travel on the wire and on disk as
//! fixed 32-byte cells, NUL-padded, with at least one NUL terminator inside
//! the cell. The cell keeps the raw bytes: the customer-id derivation hashes
//! the exact bytes the client sent, so no lossy conversion may happen before
//! that point.

use std::borrow::Cow;
use std::fmt;

/// A 32-byte NUL-padded string cell
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NameCell([u8; NameCell::LEN]);

impl NameCell {
    /// Width of the cell in bytes, terminator included
    pub const LEN: usize = 32;

    /// Build a cell from a string, truncating to 31 bytes of content
    ///
    /// The final byte is always NUL, matching what conforming clients put
    /// on the wire.
    pub fn from_str(s: &str) -> Self {
        let mut cell = [0u8; Self::LEN];
        let take = s.len().min(Self::LEN - 1);
        cell[..take].copy_from_slice(&s.as_bytes()[..take]);
        NameCell(cell)
    }

    /// Build a cell from exactly [`NameCell::LEN`] wire bytes
    ///
    /// Returns `None` when the cell contains no NUL terminator, which a
    /// conforming peer can never produce.
    pub fn from_wire(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::LEN || !bytes.contains(&0) {
            return None;
        }
        let mut cell = [0u8; Self::LEN];
        cell.copy_from_slice(bytes);
        Some(NameCell(cell))
    }

    /// Build a cell from raw bytes without requiring a terminator
    ///
    /// Used by the persistence layer, which re-reads cells this process
    /// wrote itself.
    pub fn from_raw(bytes: [u8; Self::LEN]) -> Self {
        NameCell(bytes)
    }

    /// Content bytes up to (excluding) the first NUL
    pub fn as_bytes(&self) -> &[u8] {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(Self::LEN);
        &self.0[..end]
    }

    /// The full 32-byte cell, padding included
    pub fn raw(&self) -> &[u8; Self::LEN] {
        &self.0
    }

    /// Whether the cell holds no content bytes
    pub fn is_empty(&self) -> bool {
        self.0[0] == 0
    }

    /// Content as text, replacing any invalid UTF-8
    pub fn to_display(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.as_bytes())
    }
}

impl Default for NameCell {
    fn default() -> Self {
        NameCell([0u8; Self::LEN])
    }
}

impl fmt::Debug for NameCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NameCell({:?})", self.to_display())
    }
}

impl fmt::Display for NameCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_round_trips_content() {
        let cell = NameCell::from_str("Alice");
        assert_eq!(cell.as_bytes(), b"Alice");
        assert_eq!(cell.to_display(), "Alice");
        assert!(!cell.is_empty());
    }

    #[test]
    fn test_from_str_truncates_to_31_bytes() {
        let long = "x".repeat(64);
        let cell = NameCell::from_str(&long);
        assert_eq!(cell.as_bytes().len(), 31);
        assert_eq!(cell.raw()[31], 0);
    }

    #[test]
    fn test_empty_cell() {
        let cell = NameCell::default();
        assert!(cell.is_empty());
        assert_eq!(cell.as_bytes(), b"");
    }

    #[test]
    fn test_from_wire_requires_terminator() {
        let unterminated = [b'a'; NameCell::LEN];
        assert!(NameCell::from_wire(&unterminated).is_none());

        let mut terminated = [b'a'; NameCell::LEN];
        terminated[5] = 0;
        let cell = NameCell::from_wire(&terminated).unwrap();
        assert_eq!(cell.as_bytes(), b"aaaaa");
    }

    #[test]
    fn test_from_wire_rejects_wrong_length() {
        assert!(NameCell::from_wire(&[0u8; 16]).is_none());
        assert!(NameCell::from_wire(&[0u8; 64]).is_none());
    }

    #[test]
    fn test_from_raw_keeps_all_bytes() {
        let cell = NameCell::from_raw([b'z'; NameCell::LEN]);
        assert_eq!(cell.as_bytes().len(), NameCell::LEN);
    }

    #[test]
    fn test_equality_includes_padding_only_content() {
        assert_eq!(NameCell::from_str("Bob"), NameCell::from_str("Bob"));
        assert_ne!(NameCell::from_str("Bob"), NameCell::from_str("bob"));
    }
}
