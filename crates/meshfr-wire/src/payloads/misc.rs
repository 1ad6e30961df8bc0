//! Liveness and time-sync payloads.

use crate::error::ProtocolError;
use crate::opcode::Opcode;

fn too_short(opcode: Opcode, got: usize, need: usize) -> ProtocolError {
    ProtocolError::PayloadTooShort {
        opcode: opcode.to_byte(),
        got,
        need,
    }
}

/// Liveness probe (spec.md §6). 2 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ping {
    /// Echoed back verbatim in the corresponding [`PingReply`].
    pub echo: u16,
}

/// Wire size of [`Ping`].
pub const PING_LEN: usize = 2;

impl Ping {
    /// Serialize to the 2-byte wire representation.
    #[must_use]
    pub fn to_bytes(self) -> [u8; PING_LEN] {
        self.echo.to_le_bytes()
    }

    /// Parse from at least [`PING_LEN`] bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < PING_LEN {
            return Err(too_short(Opcode::Ping, bytes.len(), PING_LEN));
        }
        Ok(Self {
            echo: u16::from_le_bytes([bytes[0], bytes[1]]),
        })
    }
}

/// Liveness probe reply (spec.md §6, §7). 5 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingReply {
    /// Coarse health bitfield surfaced to the controller's UI.
    pub state_flags: u8,
    /// Uptime in seconds since the replying node's last boot.
    pub uptime_s: u32,
}

/// Wire size of [`PingReply`].
pub const PING_REPLY_LEN: usize = 5;

impl PingReply {
    /// Serialize to the 5-byte wire representation.
    #[must_use]
    pub fn to_bytes(self) -> [u8; PING_REPLY_LEN] {
        let mut out = [0u8; PING_REPLY_LEN];
        out[0] = self.state_flags;
        out[1..5].copy_from_slice(&self.uptime_s.to_le_bytes());
        out
    }

    /// Parse from at least [`PING_REPLY_LEN`] bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < PING_REPLY_LEN {
            return Err(too_short(Opcode::PingReply, bytes.len(), PING_REPLY_LEN));
        }
        Ok(Self {
            state_flags: bytes[0],
            uptime_s: u32::from_le_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]),
        })
    }
}

/// Wall-clock synchronization (spec.md §6). 8 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSync {
    /// Controller's current time, in milliseconds (48-bit range).
    pub controller_ts_ms: u64,
}

/// Wire size of [`TimeSync`].
pub const TIME_SYNC_LEN: usize = 8;

impl TimeSync {
    /// Serialize to the 8-byte wire representation.
    #[must_use]
    pub fn to_bytes(self) -> [u8; TIME_SYNC_LEN] {
        let mut out = [0u8; TIME_SYNC_LEN];
        let ts = self.controller_ts_ms.to_le_bytes();
        out[0..6].copy_from_slice(&ts[0..6]);
        out
    }

    /// Parse from at least [`TIME_SYNC_LEN`] bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < TIME_SYNC_LEN {
            return Err(too_short(Opcode::TimeSync, bytes.len(), TIME_SYNC_LEN));
        }
        let mut buf = [0u8; 8];
        buf[0..6].copy_from_slice(&bytes[0..6]);
        Ok(Self {
            controller_ts_ms: u64::from_le_bytes(buf),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_round_trip() {
        let ping = Ping { echo: 0xBEEF };
        assert_eq!(Ping::decode(&ping.to_bytes()).unwrap(), ping);
    }

    #[test]
    fn ping_reply_round_trip() {
        let reply = PingReply {
            state_flags: 0b0101,
            uptime_s: 86_400,
        };
        assert_eq!(PingReply::decode(&reply.to_bytes()).unwrap(), reply);
    }

    #[test]
    fn time_sync_round_trip() {
        let sync = TimeSync {
            controller_ts_ms: 0x0000_1234_5678,
        };
        assert_eq!(TimeSync::decode(&sync.to_bytes()).unwrap(), sync);
    }
}
