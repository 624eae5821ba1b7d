//! Customer-id derivation
//!
//! The account key is derived from the first-name bytes and the PIN:
//! a 32-bit folding hash of the name, shifted left 16 bits as a 64-bit
//! value and XORed with the PIN. The derivation must be byte-for-byte
//! reproducible across restarts and platforms, because logging on re-derives
//! the key from the credentials the client presents.

use crate::types::CustomerId;

const HASH_SEED: u32 = 2_166_136_261;

/// One folding step: `h = ((h ^ x) << 5) - (h ^ x)`, wrapping
#[inline]
fn fold(hash: u32, value: u32) -> u32 {
    let mixed = hash ^ value;
    mixed.wrapping_shl(5).wrapping_sub(mixed)
}

/// 32-bit folding hash over little-endian 4-, 2- and 1-byte blocks
///
/// Whole 4-byte blocks are folded first, then a trailing 2-byte block and a
/// trailing byte, in that order. The finalizer XORs the high half down.
pub fn name_hash(bytes: &[u8]) -> u32 {
    let mut hash = HASH_SEED;

    let mut chunks = bytes.chunks_exact(4);
    for chunk in &mut chunks {
        let block = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        hash = fold(hash, block);
    }

    let mut rest = chunks.remainder();
    if rest.len() >= 2 {
        let block = u16::from_le_bytes([rest[0], rest[1]]) as u32;
        hash = fold(hash, block);
        rest = &rest[2..];
    }
    if let Some(&byte) = rest.first() {
        hash = fold(hash, byte as u32);
    }

    (hash >> 16) ^ hash
}

/// Derive the 64-bit customer id from first-name bytes and PIN
pub fn customer_id(first_name: &[u8], pin: u16) -> CustomerId {
    ((name_hash(first_name) as u64) << 16) ^ pin as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(name_hash(b"Alice"), name_hash(b"Alice"));
        assert_eq!(customer_id(b"Alice", 1234), customer_id(b"Alice", 1234));
    }

    #[test]
    fn test_distinct_names_distinct_ids() {
        assert_ne!(customer_id(b"Alice", 1234), customer_id(b"Bob", 1234));
    }

    #[test]
    fn test_distinct_pins_distinct_ids() {
        assert_ne!(customer_id(b"Alice", 1234), customer_id(b"Alice", 4321));
    }

    #[rstest]
    #[case::empty(b"".as_slice())]
    #[case::one(b"a".as_slice())]
    #[case::two(b"ab".as_slice())]
    #[case::three(b"abc".as_slice())]
    #[case::four(b"abcd".as_slice())]
    #[case::seven(b"abcdefg".as_slice())]
    fn test_all_tail_lengths_hash(#[case] bytes: &[u8]) {
        // every remainder path must produce a stable value
        assert_eq!(name_hash(bytes), name_hash(bytes));
    }

    #[test]
    fn test_tail_bytes_participate() {
        // differ only in the trailing 1-byte block
        assert_ne!(name_hash(b"abcde"), name_hash(b"abcdf"));
        // differ only in the trailing 2-byte block
        assert_ne!(name_hash(b"abcdef"), name_hash(b"abcdgf"));
    }

    #[test]
    fn test_pin_occupies_low_bits() {
        let id = customer_id(b"Alice", 0x0F0F);
        assert_eq!(id & 0xFFFF, (name_hash(b"Alice") as u64 & 0xFFFF) ^ 0x0F0F);
    }

    #[test]
    fn test_hash_widens_before_shift() {
        // the full 32-bit hash must survive the shift into bits 16..48
        let id = customer_id(b"Alice", 0);
        assert_eq!(id >> 16, name_hash(b"Alice") as u64);
    }
}
