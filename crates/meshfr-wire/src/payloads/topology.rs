//! Topology-push payload header.

use crate::error::ProtocolError;
use crate::opcode::Opcode;

/// Fixed header of a topology-push frame; the TLV blob is the variable
/// tail (spec.md §6: "TopoPush header, 4 + TLV").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopoPushHeader {
    /// New topology version being pushed.
    pub version: u16,
    /// Length in bytes of the TLV blob that follows this header.
    pub tlv_len: u16,
}

/// Wire size of [`TopoPushHeader`].
pub const TOPO_PUSH_HEADER_LEN: usize = 4;

impl TopoPushHeader {
    /// Serialize to the 4-byte wire representation.
    #[must_use]
    pub fn to_bytes(self) -> [u8; TOPO_PUSH_HEADER_LEN] {
        let mut out = [0u8; TOPO_PUSH_HEADER_LEN];
        out[0..2].copy_from_slice(&self.version.to_le_bytes());
        out[2..4].copy_from_slice(&self.tlv_len.to_le_bytes());
        out
    }

    /// Parse from at least [`TOPO_PUSH_HEADER_LEN`] bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < TOPO_PUSH_HEADER_LEN {
            return Err(ProtocolError::PayloadTooShort {
                opcode: Opcode::TopoPush.to_byte(),
                got: bytes.len(),
                need: TOPO_PUSH_HEADER_LEN,
            });
        }
        Ok(Self {
            version: u16::from_le_bytes([bytes[0], bytes[1]]),
            tlv_len: u16::from_le_bytes([bytes[2], bytes[3]]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let header = TopoPushHeader {
            version: 7,
            tlv_len: 64,
        };
        assert_eq!(TopoPushHeader::decode(&header.to_bytes()).unwrap(), header);
    }
}
