//! Channel-switch and relay-control payloads.

use crate::error::ProtocolError;
use crate::opcode::Opcode;

fn too_short(opcode: Opcode, got: usize, need: usize) -> ProtocolError {
    ProtocolError::PayloadTooShort {
        opcode: opcode.to_byte(),
        got,
        need,
    }
}

/// Channel-set command (spec.md §4.8). 4 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetSetChan {
    /// Radio channel to switch to.
    pub new_channel: u8,
    /// Delay, in milliseconds, before switching.
    pub grace_delay_ms: u16,
}

/// Wire size of [`NetSetChan`].
pub const NET_SET_CHAN_LEN: usize = 4;

impl NetSetChan {
    /// Serialize to the 4-byte wire representation.
    #[must_use]
    pub fn to_bytes(self) -> [u8; NET_SET_CHAN_LEN] {
        let mut out = [0u8; NET_SET_CHAN_LEN];
        out[0] = self.new_channel;
        out[1] = 0; // reserved
        out[2..4].copy_from_slice(&self.grace_delay_ms.to_le_bytes());
        out
    }

    /// Parse from at least [`NET_SET_CHAN_LEN`] bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < NET_SET_CHAN_LEN {
            return Err(too_short(Opcode::NetSetChan, bytes.len(), NET_SET_CHAN_LEN));
        }
        Ok(Self {
            new_channel: bytes[0],
            grace_delay_ms: u16::from_le_bytes([bytes[2], bytes[3]]),
        })
    }
}

/// Relay actuation command (spec.md §4.5, §6). 4 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CtrlRelay {
    /// Bitmask of relay channels to act on.
    pub relay_mask: u16,
    /// Commanded state: 0 = off, 1 = on, 2 = toggle.
    pub command: u8,
}

/// Wire size of [`CtrlRelay`].
pub const CTRL_RELAY_LEN: usize = 4;

impl CtrlRelay {
    /// Serialize to the 4-byte wire representation.
    #[must_use]
    pub fn to_bytes(self) -> [u8; CTRL_RELAY_LEN] {
        let mut out = [0u8; CTRL_RELAY_LEN];
        out[0..2].copy_from_slice(&self.relay_mask.to_le_bytes());
        out[2] = self.command;
        out[3] = 0; // reserved
        out
    }

    /// Parse from at least [`CTRL_RELAY_LEN`] bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < CTRL_RELAY_LEN {
            return Err(too_short(Opcode::CtrlRelay, bytes.len(), CTRL_RELAY_LEN));
        }
        Ok(Self {
            relay_mask: u16::from_le_bytes([bytes[0], bytes[1]]),
            command: bytes[2],
        })
    }
}

/// Relay actuation result report (spec.md §3 invariant f, §4.5). 4 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RlyState {
    /// The `virt_id` that was addressed by the originating command.
    pub virt_id_echo: u8,
    /// The *entire* device output mask, regardless of which virtual index
    /// was commanded (spec.md §3 invariant f).
    pub device_mask: u8,
    /// Result code: 0 = Ok, non-zero mirrors a `CoreError` kind.
    pub result: u8,
}

/// Wire size of [`RlyState`].
pub const RLY_STATE_LEN: usize = 4;

impl RlyState {
    /// Serialize to the 4-byte wire representation.
    #[must_use]
    pub fn to_bytes(self) -> [u8; RLY_STATE_LEN] {
        [self.virt_id_echo, self.device_mask, self.result, 0]
    }

    /// Parse from at least [`RLY_STATE_LEN`] bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < RLY_STATE_LEN {
            return Err(too_short(Opcode::RlyState, bytes.len(), RLY_STATE_LEN));
        }
        Ok(Self {
            virt_id_echo: bytes[0],
            device_mask: bytes[1],
            result: bytes[2],
        })
    }
}
