//! Configuration-write payload header.

use crate::error::ProtocolError;
use crate::opcode::Opcode;

/// Fixed header of a config-write frame; `value` is the variable tail
/// (spec.md §6: "ConfigWrite header, 8 + value").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigWriteHeader {
    /// Six-byte configuration key, matching `on_config_write(key6, value)`.
    pub key: [u8; 6],
    /// Length in bytes of the value that follows this header.
    pub value_len: u16,
}

/// Wire size of [`ConfigWriteHeader`].
pub const CONFIG_WRITE_HEADER_LEN: usize = 8;

impl ConfigWriteHeader {
    /// Serialize to the 8-byte wire representation.
    #[must_use]
    pub fn to_bytes(self) -> [u8; CONFIG_WRITE_HEADER_LEN] {
        let mut out = [0u8; CONFIG_WRITE_HEADER_LEN];
        out[0..6].copy_from_slice(&self.key);
        out[6..8].copy_from_slice(&self.value_len.to_le_bytes());
        out
    }

    /// Parse from at least [`CONFIG_WRITE_HEADER_LEN`] bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < CONFIG_WRITE_HEADER_LEN {
            return Err(ProtocolError::PayloadTooShort {
                opcode: Opcode::ConfigWrite.to_byte(),
                got: bytes.len(),
                need: CONFIG_WRITE_HEADER_LEN,
            });
        }
        let mut key = [0u8; 6];
        key.copy_from_slice(&bytes[0..6]);
        Ok(Self {
            key,
            value_len: u16::from_le_bytes([bytes[6], bytes[7]]),
        })
    }
}
