//! The 16-byte standard frame header
//!
//! Present on every request and response:
//!
//! | Field     | Offset | Size |
//! |-----------|--------|------|
//! | msg_type  | 0      | 4    |
//! | data_len  | 4      | 2    |
//! | client_id | 6      | 2    |
//! | sequence  | 8      | 4    |
//! | context   | 12     | 4    |
//!
//! `sequence` and `context` belong to the client: the server echoes both
//! unchanged on every response. `client_id` is server-assigned on connect
//! and echoed by the client from then on.

use super::ByteReader;
use crate::types::error::FrameError;
use crate::types::ClientId;

/// Size of the standard header in bytes
pub const HEADER_LEN: usize = 16;

/// Decoded standard header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Raw message type field: (subtype << 16) | base
    pub msg_type: u32,

    /// Payload length excluding this header
    pub data_len: u16,

    /// Session identifier; [`crate::types::INVALID_CLIENT_ID`] before connect
    pub client_id: ClientId,

    /// Client-incremented counter, echoed verbatim on the response
    pub sequence: u32,

    /// Opaque client cookie, echoed verbatim on the response
    pub context: u32,
}

impl FrameHeader {
    /// Decode a header from exactly [`HEADER_LEN`] bytes
    pub fn decode(buf: &[u8]) -> Result<Self, FrameError> {
        let mut reader = ByteReader::new(buf);
        Ok(FrameHeader {
            msg_type: reader.read_u32()?,
            data_len: reader.read_u16()?,
            client_id: reader.read_u16()?,
            sequence: reader.read_u32()?,
            context: reader.read_u32()?,
        })
    }

    /// Append the encoded header to `out`
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.msg_type.to_le_bytes());
        out.extend_from_slice(&self.data_len.to_le_bytes());
        out.extend_from_slice(&self.client_id.to_le_bytes());
        out.extend_from_slice(&self.sequence.to_le_bytes());
        out.extend_from_slice(&self.context.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_round_trip() {
        let header = FrameHeader {
            msg_type: 0x0001_0050,
            data_len: 8,
            client_id: 3,
            sequence: 41,
            context: 0xCAFE_F00D,
        };

        let mut encoded = Vec::new();
        header.encode(&mut encoded);
        assert_eq!(encoded.len(), HEADER_LEN);

        let decoded = FrameHeader::decode(&encoded).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_header_byte_layout() {
        let header = FrameHeader {
            msg_type: 0x0001_0050,
            data_len: 0x0008,
            client_id: 0x0102,
            sequence: 0x0A0B_0C0D,
            context: 0,
        };

        let mut encoded = Vec::new();
        header.encode(&mut encoded);

        assert_eq!(&encoded[0..4], &[0x50, 0x00, 0x01, 0x00]);
        assert_eq!(&encoded[4..6], &[0x08, 0x00]);
        assert_eq!(&encoded[6..8], &[0x02, 0x01]);
        assert_eq!(&encoded[8..12], &[0x0D, 0x0C, 0x0B, 0x0A]);
        assert_eq!(&encoded[12..16], &[0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_short_buffer_rejected() {
        assert!(matches!(
            FrameHeader::decode(&[0u8; 10]),
            Err(FrameError::Truncated { .. })
        ));
    }
}
