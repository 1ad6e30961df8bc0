//! Inbound router (spec.md §4.5): parse → size-sanity → admission gate →
//! privilege gate → HMAC verify → replay window → topology-token check →
//! dispatch.
//!
//! A close structural port of the original firmware's
//! `espnow_router.cpp::on_rx` step order, adapted from a static callback
//! into an explicit method the host calls with each inbound frame.

use meshfr_crypto::PeerKey;
use meshfr_wire::payloads::{
    CtrlRelay, NetSetChan, PmsStatus, RlyState, SensReport, TimeSync,
};
use meshfr_wire::{DecodedFrame, Opcode, ZERO_TOKEN};

use crate::adapter::{RoleAdapter, SenderContext};
use crate::error::CoreError;
use crate::events::{CoreEvent, EventSink};
use crate::replay::ReplayGuard;
use crate::role::DeviceRole;
use crate::topology::TopologyStore;

/// Deployment-wide secrets the router needs to re-derive a per-peer key
/// from the admission token carried on each frame (spec.md §4.2: the
/// admission token *is* the peer's device token).
#[derive(Debug, Clone, Copy)]
pub struct DeploymentSecrets {
    /// Fleet-wide pre-shared key.
    pub pre_shared_key: [u8; 16],
    /// Per-link key (installed alongside the peer on the radio).
    pub per_link_key: [u8; 16],
    /// Deployment salt mixed into key derivation.
    pub salt: [u8; 16],
}

/// Which opcodes require sender-role = Controller and sender MAC =
/// the stored controller MAC (spec.md §4.5 step 6, invariant e).
/// `FwStatus` is deliberately excluded: it flows node-to-controller, so
/// it is gated by the ordinary per-peer HMAC check below instead.
fn is_privileged(opcode: Opcode) -> bool {
    opcode.is_privileged()
}

/// The inbound pipeline. Holds only what differs frame-to-frame
/// (replay state, topology); deployment secrets and the controller MAC
/// are supplied per-call so the same router works for any role.
pub struct InboundRouter {
    replay: ReplayGuard,
}

impl InboundRouter {
    /// A router with default replay-window configuration.
    #[must_use]
    pub fn new() -> Self {
        Self { replay: ReplayGuard::new() }
    }

    /// Run the full pipeline on `bytes`, received from `from_mac`, and
    /// dispatch to `adapter` on success. Returns the error that caused a
    /// drop, if any, purely for observability — the router itself never
    /// replies to a bad frame (spec.md §7).
    #[allow(clippy::too_many_arguments)]
    pub fn on_frame(
        &mut self,
        bytes: &[u8],
        secrets: &DeploymentSecrets,
        controller_mac: Option<[u8; 6]>,
        topology: &TopologyStore,
        adapter: &mut impl RoleAdapter,
        events: &mut impl EventSink,
    ) -> Result<(), CoreError> {
        let result = self.try_dispatch(bytes, secrets, controller_mac, topology, adapter);
        match &result {
            Ok(()) => {
                if let Ok(decoded) = DecodedFrame::parse(bytes) {
                    if let Ok(opcode) = decoded.header.opcode() {
                        events.emit(CoreEvent::FrameAccepted { mac: decoded.header.sender_mac(), opcode });
                    }
                }
            }
            Err(err) => {
                let mac = DecodedFrame::parse(bytes).ok().map(|d| d.header.sender_mac());
                events.emit(CoreEvent::FrameRejected { mac, reason: *err });
            }
        }
        result
    }

    fn try_dispatch(
        &mut self,
        bytes: &[u8],
        secrets: &DeploymentSecrets,
        controller_mac: Option<[u8; 6]>,
        topology: &TopologyStore,
        adapter: &mut impl RoleAdapter,
    ) -> Result<(), CoreError> {
        let routed = self.verify(bytes, secrets, controller_mac, topology)?;
        dispatch(routed.opcode, routed.ctx, routed.payload, adapter)
    }

    /// Run steps 1-9 of the inbound pipeline (everything short of
    /// dispatch) and hand back the validated payload. Used directly by
    /// [`crate::runtime::Core`] for opcodes the generic [`RoleAdapter`]
    /// surface doesn't cover (pairing, firmware transfer), which still
    /// need the same admission/privilege/replay/topology-token gates.
    pub fn verify<'a>(
        &mut self,
        bytes: &'a [u8],
        secrets: &DeploymentSecrets,
        controller_mac: Option<[u8; 6]>,
        topology: &TopologyStore,
    ) -> Result<RoutedFrame<'a>, CoreError> {
        // Steps 1-4: header bound-check, admission/topology-token/trailer
        // presence. All structural; owned by the wire codec.
        let decoded = DecodedFrame::parse(bytes)?;
        let opcode = decoded.header.opcode()?;

        // Step 5: payload size sanity against the opcode's minimum.
        if decoded.payload.len() < opcode.min_payload_len() {
            return Err(CoreError::Malformed);
        }

        let sender_role = DeviceRole::from_byte(decoded.header.sender_role())
            .ok_or(CoreError::RoleMismatch)?;
        let sender_mac = decoded.header.sender_mac();

        // Step 6: privileged-op gating.
        if is_privileged(opcode) {
            let is_controller = sender_role == DeviceRole::Controller
                && controller_mac == Some(sender_mac);
            if !is_controller {
                return Err(CoreError::RoleMismatch);
            }
        }

        // Step 7: HMAC verify, keyed from the admission token carried on
        // the frame (pair-request has none and is exempt).
        if !opcode.is_unauthenticated() {
            let admission =
                decoded.admission_token.copied().ok_or(CoreError::AuthFail)?;
            let trailer = decoded.trailer.ok_or(CoreError::AuthFail)?;
            let key: PeerKey = meshfr_crypto::derive_peer_key(
                &secrets.pre_shared_key,
                &secrets.per_link_key,
                &admission,
                &secrets.salt,
            );
            let signed_prefix = decoded.signed_prefix(bytes);
            meshfr_crypto::verify_tag(&key, signed_prefix, &trailer.nonce, &trailer.tag)?;

            // Step 8: replay window.
            let seq = decoded.header.seq();
            let nonce = trailer.nonce_u64();
            if !self.replay.check(sender_mac, opcode, seq, nonce) {
                return Err(CoreError::Replay);
            }
        }

        // Step 9: topology-token check for opcodes that require it.
        if opcode.requires_topology_token() {
            let token = decoded.topology_token.copied().unwrap_or(ZERO_TOKEN);
            if !topology.validate_token(&token) {
                return Err(CoreError::TopologyMismatch);
            }
        }

        let ctx = SenderContext { mac: sender_mac, virt_id: decoded.header.virt_id() };
        Ok(RoutedFrame { opcode, ctx, payload: decoded.payload })
    }
}

/// A frame that passed every router check short of dispatch: admission,
/// privilege, replay, and topology-token gates all succeeded.
#[derive(Debug, Clone, Copy)]
pub struct RoutedFrame<'a> {
    /// Decoded opcode.
    pub opcode: Opcode,
    /// Sender identity.
    pub ctx: SenderContext,
    /// Opcode-specific payload slice.
    pub payload: &'a [u8],
}

impl Default for InboundRouter {
    fn default() -> Self {
        Self::new()
    }
}

fn dispatch(
    opcode: Opcode,
    ctx: SenderContext,
    payload: &[u8],
    adapter: &mut impl RoleAdapter,
) -> Result<(), CoreError> {
    match opcode {
        Opcode::Ping => {
            let ping = meshfr_wire::payloads::misc::Ping::decode(payload)?;
            adapter.on_ping(ctx, ping.echo);
        }
        Opcode::PingReply => {
            let reply = meshfr_wire::payloads::misc::PingReply::decode(payload)?;
            adapter.on_ping_reply(ctx, reply.state_flags, reply.uptime_s);
        }
        Opcode::CtrlRelay => {
            let ctrl = CtrlRelay::decode(payload)?;
            adapter.on_ctrl_relay(ctx, ctrl);
        }
        Opcode::SensReport => {
            let report = SensReport::decode(payload)?;
            adapter.on_sensor_report(ctx, report);
        }
        Opcode::RlyState => {
            let state = RlyState::decode(payload)?;
            adapter.on_relay_state(ctx, state);
        }
        Opcode::PmsStatus => {
            let status = PmsStatus::decode(payload)?;
            adapter.on_power_status(ctx, status);
        }
        Opcode::ConfigWrite => {
            let header = meshfr_wire::payloads::ConfigWriteHeader::decode(payload)?;
            let value_start = meshfr_wire::payloads::config::CONFIG_WRITE_HEADER_LEN;
            adapter.on_config_write(ctx, header.key, &payload[value_start..]);
        }
        Opcode::TopoPush => {
            let header = meshfr_wire::payloads::TopoPushHeader::decode(payload)?;
            let tlv_start = meshfr_wire::payloads::topology::TOPO_PUSH_HEADER_LEN;
            adapter.on_topology_push(ctx, &payload[tlv_start..tlv_start + header.tlv_len as usize]);
        }
        Opcode::NetSetChan => {
            let cmd = NetSetChan::decode(payload)?;
            adapter.on_net_set_chan(ctx, cmd);
        }
        Opcode::TimeSync => {
            let sync = TimeSync::decode(payload)?;
            adapter.on_time_sync(ctx, sync);
        }
        Opcode::FwStatus => {
            let status = meshfr_wire::payloads::FwStatus::decode(payload)?;
            adapter.on_fw_status(ctx, status);
        }
        // Firmware begin/chunk/commit/abort and pair-request/ack are
        // handled by dedicated core state machines (firmware, pairing),
        // not the generic role-adapter surface.
        Opcode::PairRequest
        | Opcode::PairAck
        | Opcode::FwBegin
        | Opcode::FwChunk
        | Opcode::FwCommit
        | Opcode::FwAbort => {}
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::TracingEventSink;
    use meshfr_wire::header::{Header, VIRT_ID_PHYSICAL};
    use meshfr_wire::{encode, FrameFlags, FrameParts, Trailer};

    struct RecordingAdapter {
        pings: Vec<u16>,
        topology_pushes: usize,
    }

    impl RoleAdapter for RecordingAdapter {
        fn on_ping(&mut self, _ctx: SenderContext, echo: u16) {
            self.pings.push(echo);
        }
        fn on_topology_push(&mut self, _ctx: SenderContext, _tlv: &[u8]) {
            self.topology_pushes += 1;
        }
    }

    const SECRETS: DeploymentSecrets =
        DeploymentSecrets { pre_shared_key: [1; 16], per_link_key: [2; 16], salt: [3; 16] };
    const TOKEN: [u8; 16] = [9; 16];
    const SENDER_MAC: [u8; 6] = [1, 2, 3, 4, 5, 6];

    fn signed_ping(seq: u16, nonce: [u8; 6], echo: u16) -> Vec<u8> {
        let header = Header {
            opcode: Opcode::Ping,
            flags: FrameFlags::default(),
            seq,
            topo_ver: 0,
            virt_id: VIRT_ID_PHYSICAL,
            ts_ms: 1,
            sender_mac: SENDER_MAC,
            sender_role: DeviceRole::Sensor.to_byte(),
        };
        let payload = meshfr_wire::payloads::misc::Ping { echo }.to_bytes();
        let key = meshfr_crypto::derive_peer_key(
            &SECRETS.pre_shared_key,
            &SECRETS.per_link_key,
            &TOKEN,
            &SECRETS.salt,
        );
        let parts_for_signing = FrameParts {
            header: header.clone(),
            admission_token: Some(TOKEN),
            topology_token: None,
            payload: &payload,
            trailer: Some(Trailer { nonce, tag: [0; 12] }),
        };
        let unsigned = encode(&parts_for_signing).unwrap();
        let signed_prefix = &unsigned[..unsigned.len() - meshfr_wire::TRAILER_LEN];
        let tag = meshfr_crypto::compute_tag(&key, signed_prefix, &nonce);
        let parts = FrameParts {
            header,
            admission_token: Some(TOKEN),
            topology_token: None,
            payload: &payload,
            trailer: Some(Trailer { nonce, tag }),
        };
        encode(&parts).unwrap()
    }

    #[test]
    fn accepts_correctly_signed_ping_and_dispatches() {
        let mut router = InboundRouter::new();
        let mut adapter = RecordingAdapter { pings: Vec::new(), topology_pushes: 0 };
        let mut events = TracingEventSink;
        let topology = TopologyStore::empty();
        let frame = signed_ping(1, [0, 0, 0, 0, 0, 1], 0xBEEF);
        router
            .on_frame(&frame, &SECRETS, None, &topology, &mut adapter, &mut events)
            .unwrap();
        assert_eq!(adapter.pings, vec![0xBEEF]);
    }

    #[test]
    fn rejects_tampered_tag() {
        let mut router = InboundRouter::new();
        let mut adapter = RecordingAdapter { pings: Vec::new(), topology_pushes: 0 };
        let mut events = TracingEventSink;
        let topology = TopologyStore::empty();
        let mut frame = signed_ping(1, [0, 0, 0, 0, 0, 1], 0xBEEF);
        let last = frame.len() - 1;
        frame[last] ^= 0xFF;
        let err = router
            .on_frame(&frame, &SECRETS, None, &topology, &mut adapter, &mut events)
            .unwrap_err();
        assert_eq!(err, CoreError::AuthFail);
    }

    #[test]
    fn scenario_s2_replay_rejected() {
        let mut router = InboundRouter::new();
        let mut adapter = RecordingAdapter { pings: Vec::new(), topology_pushes: 0 };
        let mut events = TracingEventSink;
        let topology = TopologyStore::empty();
        let frame = signed_ping(100, [0, 0, 1, 0, 0, 0], 0);
        router.on_frame(&frame, &SECRETS, None, &topology, &mut adapter, &mut events).unwrap();
        let err =
            router.on_frame(&frame, &SECRETS, None, &topology, &mut adapter, &mut events).unwrap_err();
        assert_eq!(err, CoreError::Replay);
    }

    #[test]
    fn scenario_s3_privilege_gating_drops_non_controller_topology_push() {
        let mut router = InboundRouter::new();
        let mut adapter = RecordingAdapter { pings: Vec::new(), topology_pushes: 0 };
        let mut events = TracingEventSink;
        let topology = TopologyStore::empty();

        let header = Header {
            opcode: Opcode::TopoPush,
            flags: FrameFlags::default(),
            seq: 1,
            topo_ver: 0,
            virt_id: VIRT_ID_PHYSICAL,
            ts_ms: 1,
            sender_mac: SENDER_MAC,
            sender_role: DeviceRole::PowerManager.to_byte(),
        };
        let payload = meshfr_wire::payloads::TopoPushHeader { version: 1, tlv_len: 0 }.to_bytes();
        let key = meshfr_crypto::derive_peer_key(
            &SECRETS.pre_shared_key,
            &SECRETS.per_link_key,
            &TOKEN,
            &SECRETS.salt,
        );
        let nonce = [0u8; 6];
        let parts_for_signing = FrameParts {
            header: header.clone(),
            admission_token: Some(TOKEN),
            topology_token: None,
            payload: &payload,
            trailer: Some(Trailer { nonce, tag: [0; 12] }),
        };
        let unsigned = encode(&parts_for_signing).unwrap();
        let signed_prefix = &unsigned[..unsigned.len() - meshfr_wire::TRAILER_LEN];
        let tag = meshfr_crypto::compute_tag(&key, signed_prefix, &nonce);
        let parts = FrameParts {
            header,
            admission_token: Some(TOKEN),
            topology_token: None,
            payload: &payload,
            trailer: Some(Trailer { nonce, tag }),
        };
        let frame = encode(&parts).unwrap();

        let err = router
            .on_frame(&frame, &SECRETS, Some([9, 9, 9, 9, 9, 9]), &topology, &mut adapter, &mut events)
            .unwrap_err();
        assert_eq!(err, CoreError::RoleMismatch);
        assert_eq!(adapter.topology_pushes, 0);
    }
}
