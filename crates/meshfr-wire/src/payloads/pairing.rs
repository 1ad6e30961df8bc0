//! Pairing payloads.

use crate::error::ProtocolError;

/// Controller's reply to a `PairRequest` (spec.md §4.8). 24 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairAck {
    /// Controller's link-layer MAC address.
    pub icm_mac: [u8; 6],
    /// Initial radio channel the node should use.
    pub channel: u8,
    /// Freshly issued 128-bit device token.
    pub device_token: [u8; 16],
}

/// Wire size of [`PairAck`].
pub const PAIR_ACK_LEN: usize = 24;

impl PairAck {
    /// Serialize to the 24-byte wire representation.
    #[must_use]
    pub fn to_bytes(self) -> [u8; PAIR_ACK_LEN] {
        let mut out = [0u8; PAIR_ACK_LEN];
        out[0..6].copy_from_slice(&self.icm_mac);
        out[6] = self.channel;
        out[7] = 0; // reserved
        out[8..24].copy_from_slice(&self.device_token);
        out
    }

    /// Parse from at least [`PAIR_ACK_LEN`] bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < PAIR_ACK_LEN {
            return Err(ProtocolError::PayloadTooShort {
                opcode: crate::opcode::Opcode::PairAck.to_byte(),
                got: bytes.len(),
                need: PAIR_ACK_LEN,
            });
        }
        let mut icm_mac = [0u8; 6];
        icm_mac.copy_from_slice(&bytes[0..6]);
        let mut device_token = [0u8; 16];
        device_token.copy_from_slice(&bytes[8..24]);
        Ok(Self {
            icm_mac,
            channel: bytes[6],
            device_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let ack = PairAck {
            icm_mac: [1, 2, 3, 4, 5, 6],
            channel: 11,
            device_token: [7; 16],
        };
        let bytes = ack.to_bytes();
        assert_eq!(bytes.len(), PAIR_ACK_LEN);
        assert_eq!(PairAck::decode(&bytes).unwrap(), ack);
    }

    #[test]
    fn rejects_short_buffer() {
        let bytes = [0u8; PAIR_ACK_LEN - 1];
        assert!(PairAck::decode(&bytes).is_err());
    }
}
