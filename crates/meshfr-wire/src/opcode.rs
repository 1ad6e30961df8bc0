//! Opcode space and the per-opcode facts the router and scheduler need.

use crate::error::ProtocolError;

/// A v2H opcode. Values are frozen to match the deployed firmware's
/// `NOW_MT_*` constants so that mixed-version fleets stay wire-compatible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[non_exhaustive]
pub enum Opcode {
    /// Unauthenticated bootstrap request from an unpaired node.
    PairRequest,
    /// Controller's reply to `PairRequest`, carrying the new device token.
    PairAck,
    /// Controller-pushed topology blob.
    TopoPush,
    /// Controller-commanded channel change.
    NetSetChan,
    /// Controller-commanded relay actuation.
    CtrlRelay,
    /// Sensor node's periodic sample report.
    SensReport,
    /// Relay node's actuation-result report.
    RlyState,
    /// Power-management node's telemetry report.
    PmsStatus,
    /// Controller-issued key/value configuration write.
    ConfigWrite,
    /// Liveness probe.
    Ping,
    /// Liveness probe reply.
    PingReply,
    /// Controller-issued wall-clock synchronization.
    TimeSync,
    /// Firmware transfer: begin.
    FwBegin,
    /// Firmware transfer: one data chunk.
    FwChunk,
    /// Firmware transfer: progress/result report.
    FwStatus,
    /// Firmware transfer: signed commit request.
    FwCommit,
    /// Firmware transfer: abort with reason.
    FwAbort,
}

impl Opcode {
    /// Decode a wire opcode byte.
    pub fn from_byte(byte: u8) -> Result<Self, ProtocolError> {
        Ok(match byte {
            0x01 => Self::PairRequest,
            0x02 => Self::PairAck,
            0x03 => Self::TopoPush,
            0x04 => Self::NetSetChan,
            0x10 => Self::CtrlRelay,
            0x20 => Self::SensReport,
            0x21 => Self::RlyState,
            0x22 => Self::PmsStatus,
            0x30 => Self::ConfigWrite,
            0x40 => Self::Ping,
            0x41 => Self::PingReply,
            0x50 => Self::TimeSync,
            0x60 => Self::FwBegin,
            0x61 => Self::FwChunk,
            0x62 => Self::FwStatus,
            0x63 => Self::FwCommit,
            0x64 => Self::FwAbort,
            other => return Err(ProtocolError::UnknownOpcode { opcode: other }),
        })
    }

    /// Encode to the wire opcode byte.
    #[must_use]
    pub fn to_byte(self) -> u8 {
        match self {
            Self::PairRequest => 0x01,
            Self::PairAck => 0x02,
            Self::TopoPush => 0x03,
            Self::NetSetChan => 0x04,
            Self::CtrlRelay => 0x10,
            Self::SensReport => 0x20,
            Self::RlyState => 0x21,
            Self::PmsStatus => 0x22,
            Self::ConfigWrite => 0x30,
            Self::Ping => 0x40,
            Self::PingReply => 0x41,
            Self::TimeSync => 0x50,
            Self::FwBegin => 0x60,
            Self::FwChunk => 0x61,
            Self::FwStatus => 0x62,
            Self::FwCommit => 0x63,
            Self::FwAbort => 0x64,
        }
    }

    /// `true` for `PairRequest`, the only frame sent without an admission
    /// token and without a trailer (spec.md §3, §4.5 step 2/4).
    #[must_use]
    pub fn is_unauthenticated(self) -> bool {
        matches!(self, Self::PairRequest)
    }

    /// `true` for opcodes accepted only from the paired controller MAC
    /// with sender role `Controller` (spec.md §4.5 step 6). `FwStatus`
    /// flows the other direction (node to controller, adapter.rs §52)
    /// and is gated by the ordinary per-peer HMAC check instead — a
    /// controller's own sender role is never `Controller` from the
    /// receiving node's point of view, so listing it here would make
    /// every legitimate report unroutable.
    #[must_use]
    pub fn is_privileged(self) -> bool {
        matches!(
            self,
            Self::TopoPush
                | Self::NetSetChan
                | Self::TimeSync
                | Self::FwBegin
                | Self::FwChunk
                | Self::FwCommit
                | Self::FwAbort
        )
    }

    /// `true` if the frame must carry a validated topology token (spec.md
    /// §4.5 step 9). Presently only relay control.
    #[must_use]
    pub fn requires_topology_token(self) -> bool {
        matches!(self, Self::CtrlRelay)
    }

    /// Minimum fixed-section payload length, i.e. the length of the
    /// opcode's *header* for variable-tail opcodes (spec.md §6).
    #[must_use]
    pub fn min_payload_len(self) -> usize {
        match self {
            Self::PairRequest => 0,
            Self::PairAck => 24,
            Self::TopoPush => 4,
            Self::NetSetChan => 4,
            Self::CtrlRelay => 4,
            Self::SensReport => 30,
            Self::RlyState => 4,
            Self::PmsStatus => 17,
            Self::ConfigWrite => 8,
            Self::Ping => 2,
            Self::PingReply => 5,
            Self::TimeSync => 8,
            Self::FwBegin => 52,
            Self::FwChunk => 12,
            Self::FwStatus => 16,
            Self::FwCommit => 8,
            Self::FwAbort => 8,
        }
    }

    /// `true` if this opcode's payload has a variable tail beyond
    /// `min_payload_len` (TLV blob, config value, chunk data, signature).
    #[must_use]
    pub fn has_variable_tail(self) -> bool {
        matches!(
            self,
            Self::TopoPush | Self::ConfigWrite | Self::FwChunk | Self::FwCommit
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_opcode() {
        let all = [
            Opcode::PairRequest,
            Opcode::PairAck,
            Opcode::TopoPush,
            Opcode::NetSetChan,
            Opcode::CtrlRelay,
            Opcode::SensReport,
            Opcode::RlyState,
            Opcode::PmsStatus,
            Opcode::ConfigWrite,
            Opcode::Ping,
            Opcode::PingReply,
            Opcode::TimeSync,
            Opcode::FwBegin,
            Opcode::FwChunk,
            Opcode::FwStatus,
            Opcode::FwCommit,
            Opcode::FwAbort,
        ];
        for op in all {
            assert_eq!(Opcode::from_byte(op.to_byte()), Ok(op));
        }
    }

    #[test]
    fn ctrl_relay_byte_matches_firmware_constant() {
        // NOW_MT_CTRL_RELAY == 0x10 in the deployed firmware; topology-token
        // gating keys off this exact value.
        assert_eq!(Opcode::CtrlRelay.to_byte(), 0x10);
    }

    #[test]
    fn unknown_byte_is_rejected() {
        assert_eq!(
            Opcode::from_byte(0xEE),
            Err(ProtocolError::UnknownOpcode { opcode: 0xEE })
        );
    }

    #[test]
    fn only_pair_request_is_unauthenticated() {
        assert!(Opcode::PairRequest.is_unauthenticated());
        assert!(!Opcode::Ping.is_unauthenticated());
    }

    #[test]
    fn privileged_set_matches_spec() {
        for op in [
            Opcode::TopoPush,
            Opcode::NetSetChan,
            Opcode::TimeSync,
            Opcode::FwBegin,
            Opcode::FwChunk,
            Opcode::FwCommit,
            Opcode::FwAbort,
        ] {
            assert!(op.is_privileged(), "{op:?} should be privileged");
        }
        for op in [Opcode::Ping, Opcode::SensReport, Opcode::CtrlRelay, Opcode::FwStatus] {
            assert!(!op.is_privileged(), "{op:?} should not be privileged");
        }
    }
}
