//! The mandatory security trailer: 48-bit nonce + 96-bit HMAC tag.

use crate::error::ProtocolError;

/// Nonce length in bytes (48 bits).
pub const NONCE_LEN: usize = 6;
/// Tag length in bytes (96 bits, `NOW_HMAC_TAG_LEN`).
pub const TAG_LEN: usize = 12;
/// Trailer length in bytes.
pub const TRAILER_LEN: usize = NONCE_LEN + TAG_LEN;

/// The trailer appended to every frame except `PairRequest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trailer {
    /// Sender's 48-bit nonce for this frame.
    pub nonce: [u8; NONCE_LEN],
    /// Truncated HMAC-SHA256 tag.
    pub tag: [u8; TAG_LEN],
}

impl Trailer {
    /// Serialize to the 18-byte wire representation: nonce then tag.
    #[must_use]
    pub fn to_bytes(self) -> [u8; TRAILER_LEN] {
        let mut out = [0u8; TRAILER_LEN];
        out[..NONCE_LEN].copy_from_slice(&self.nonce);
        out[NONCE_LEN..].copy_from_slice(&self.tag);
        out
    }

    /// Parse a trailer from exactly `TRAILER_LEN` bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < TRAILER_LEN {
            return Err(ProtocolError::TrailerTruncated);
        }
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&bytes[..NONCE_LEN]);
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&bytes[NONCE_LEN..TRAILER_LEN]);
        Ok(Self { nonce, tag })
    }

    /// The nonce as a `u64` (top 16 bits always zero), for replay-guard
    /// bookkeeping.
    #[must_use]
    pub fn nonce_u64(self) -> u64 {
        let mut buf = [0u8; 8];
        buf[..NONCE_LEN].copy_from_slice(&self.nonce);
        u64::from_le_bytes(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let trailer = Trailer {
            nonce: [1, 2, 3, 4, 5, 6],
            tag: [9; TAG_LEN],
        };
        let bytes = trailer.to_bytes();
        assert_eq!(bytes.len(), TRAILER_LEN);
        assert_eq!(Trailer::parse(&bytes).unwrap(), trailer);
    }

    #[test]
    fn rejects_short_buffer() {
        let bytes = [0u8; TRAILER_LEN - 1];
        assert_eq!(Trailer::parse(&bytes), Err(ProtocolError::TrailerTruncated));
    }

    #[test]
    fn nonce_u64_is_little_endian() {
        let trailer = Trailer {
            nonce: [0x01, 0x00, 0x00, 0x00, 0x00, 0x00],
            tag: [0; TAG_LEN],
        };
        assert_eq!(trailer.nonce_u64(), 1);
    }
}
