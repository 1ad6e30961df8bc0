//! The node runtime (REDESIGN FLAG: the original firmware's collection of
//! module-scope mutable globals — `g_seq`, the replay table, the tx
//! queue, the topology store, the firmware session — is consolidated
//! into one struct here. `Core` is the only thing that mutates any of
//! this state; callers drive it through [`Core::on_frame`],
//! [`Core::tick`], and the per-opcode `send_*` methods.

use meshfr_crypto::SignatureVerifier;
use meshfr_wire::payloads::{
    firmware as fw_payload, topology as topo_payload, ConfigWriteHeader, CtrlRelay, FwAbortPayload,
    FwBegin, FwChunkHeader, FwCommitHeader, NetSetChan, PairAck, Ping, PingReply, PmsStatus, RlyState,
    SensReport, TimeSync, TopoPushHeader,
};
use meshfr_wire::{encode, DecodedFrame, FrameFlags, FrameParts, Header, Opcode, Trailer, TRAILER_LEN, VIRT_ID_PHYSICAL};

use crate::adapter::RoleAdapter;
use crate::env::Environment;
use crate::error::CoreError;
use crate::events::{CoreEvent, EventSink};
use crate::firmware::{FirmwareAction, FirmwareSession};
use crate::pairing;
use crate::persist::PersistedState;
use crate::radio::Radio;
use crate::role::DeviceRole;
use crate::router::{DeploymentSecrets, InboundRouter};
use crate::scheduler::OutboundScheduler;
use crate::topology::TopologyStore;

fn nonce_bytes(nonce: u64) -> [u8; 6] {
    let b = nonce.to_le_bytes();
    [b[0], b[1], b[2], b[3], b[4], b[5]]
}

/// One node's complete runtime state: identity, the inbound pipeline,
/// the outbound scheduler, the topology store, and any in-progress
/// firmware session. Generic only over what the host must inject
/// per-call ([`Environment`], [`Radio`]); everything else lives here.
pub struct Core {
    role: DeviceRole,
    own_mac: [u8; 6],
    device_token: [u8; 16],
    controller_mac: Option<[u8; 6]>,
    channel: u8,
    secrets: DeploymentSecrets,
    seq: u16,
    router: InboundRouter,
    scheduler: OutboundScheduler,
    topology: TopologyStore,
    firmware: FirmwareSession,
    pending_switch: Option<pairing::ChannelSwitch>,
}

impl Core {
    /// Build a node from its durable state and deployment secrets.
    #[must_use]
    pub fn from_persisted(state: PersistedState, secrets: DeploymentSecrets, own_mac: [u8; 6]) -> Self {
        let paired = state.device_token != [0; 16];
        Self {
            role: state.role,
            own_mac,
            device_token: state.device_token,
            controller_mac: paired.then_some(state.controller_mac),
            channel: state.channel,
            secrets,
            seq: 1,
            router: InboundRouter::new(),
            scheduler: OutboundScheduler::new(),
            topology: TopologyStore::from_persisted(state.topology_version, state.topology_blob),
            firmware: FirmwareSession::idle(),
            pending_switch: None,
        }
    }

    /// Snapshot the durable fields, for [`crate::persist::Persistence::save`].
    ///
    /// An in-progress firmware transfer is not captured: resuming a
    /// partial transfer across a reboot needs the accumulated chunk
    /// window persisted too, which [`crate::persist::FirmwareSessionSnapshot`]
    /// does not yet carry (spec.md §9 open question).
    #[must_use]
    pub fn to_persisted(&self) -> PersistedState {
        PersistedState {
            role: self.role,
            device_token: self.device_token,
            controller_mac: self.controller_mac.unwrap_or([0; 6]),
            channel: self.channel,
            topology_version: self.topology.version(),
            topology_blob: self.topology.blob().to_vec(),
            firmware_session: None,
        }
    }

    /// This node's role.
    #[must_use]
    pub fn role(&self) -> DeviceRole {
        self.role
    }

    /// The installed topology store, for adapters that need direct read
    /// access (e.g. to enumerate node entries) rather than reacting to
    /// `on_topology_push`.
    #[must_use]
    pub fn topology(&self) -> &TopologyStore {
        &self.topology
    }

    /// `true` once a device token has been issued (spec.md §4.8).
    #[must_use]
    pub fn is_paired(&self) -> bool {
        self.device_token != [0; 16]
    }

    /// Number of frames currently queued for transmission.
    #[must_use]
    pub fn outbound_len(&self) -> usize {
        self.scheduler.len()
    }

    fn next_seq(&mut self) -> u16 {
        let seq = self.seq;
        self.seq = self.seq.wrapping_add(1).max(1);
        seq
    }

    fn build_header(&mut self, opcode: Opcode, now_ms: u64, topology_token_present: bool) -> Header {
        Header {
            opcode,
            flags: FrameFlags::default().with_topology_token_present(topology_token_present),
            seq: self.next_seq(),
            topo_ver: self.topology.version(),
            virt_id: VIRT_ID_PHYSICAL,
            ts_ms: now_ms,
            sender_mac: self.own_mac,
            sender_role: self.role.to_byte(),
        }
    }

    /// Build, sign, and enqueue one outbound authenticated frame.
    /// `admission` is the *destination's* device token: per spec.md
    /// §4.2 the admission token on any frame is the token of the party
    /// whose key derives the tag, and both directions of a pairing use
    /// the same derived key.
    fn enqueue_authenticated(
        &mut self,
        env: &mut impl Environment,
        dest_mac: [u8; 6],
        admission: [u8; 16],
        opcode: Opcode,
        topology_token: Option<[u8; 16]>,
        payload: &[u8],
    ) -> bool {
        let now = env.now_ms();
        let header = self.build_header(opcode, now, topology_token.is_some());
        let nonce = nonce_bytes(env.next_nonce());
        let key = meshfr_crypto::derive_peer_key(
            &self.secrets.pre_shared_key,
            &self.secrets.per_link_key,
            &admission,
            &self.secrets.salt,
        );

        let unsigned = FrameParts {
            header,
            admission_token: Some(admission),
            topology_token,
            payload,
            trailer: Some(Trailer { nonce, tag: [0; 12] }),
        };
        let Ok(unsigned_bytes) = encode(&unsigned) else { return false };
        let signed_prefix = &unsigned_bytes[..unsigned_bytes.len() - TRAILER_LEN];
        let tag = meshfr_crypto::compute_tag(&key, signed_prefix, &nonce);

        let signed = FrameParts {
            header,
            admission_token: Some(admission),
            topology_token,
            payload,
            trailer: Some(Trailer { nonce, tag }),
        };
        let Ok(frame) = encode(&signed) else { return false };
        self.scheduler.enqueue(dest_mac, opcode, &frame, now)
    }

    fn to_controller(&self) -> Option<([u8; 6], [u8; 16])> {
        self.controller_mac.map(|mac| (mac, self.device_token))
    }

    /// Feed one inbound frame through the pipeline. `PairRequest` and
    /// the firmware-transfer opcodes are intercepted here because they
    /// mutate `Core`'s own state machines rather than a generic
    /// [`RoleAdapter`] callback; everything else is delegated to the
    /// [`InboundRouter`].
    pub fn on_frame(
        &mut self,
        bytes: &[u8],
        env: &mut impl Environment,
        verifier: &impl SignatureVerifier,
        adapter: &mut impl RoleAdapter,
        events: &mut impl EventSink,
    ) -> Result<(), CoreError> {
        let decoded = DecodedFrame::parse(bytes)?;
        let opcode = decoded.header.opcode()?;
        let sender_mac = decoded.header.sender_mac();

        let result = match opcode {
            Opcode::PairRequest if self.role == DeviceRole::Controller => {
                self.handle_pair_request(sender_mac, env);
                Ok(())
            }
            Opcode::PairRequest => Err(CoreError::RoleMismatch),
            Opcode::PairAck => self.handle_pair_ack(bytes),
            Opcode::TopoPush => self.handle_topology_push(bytes, verifier, adapter, events),
            Opcode::NetSetChan => self.handle_net_set_chan(bytes, env, adapter, events),
            Opcode::FwBegin | Opcode::FwChunk | Opcode::FwCommit | Opcode::FwAbort => {
                self.handle_firmware_frame(bytes, opcode, env, verifier, events)
            }
            _ => self.router.on_frame(bytes, &self.secrets, self.controller_mac, &self.topology, adapter, events),
        };

        // The generic branches above (router.on_frame) already emit
        // their own accept/reject events; the branches this method owns
        // directly still need to report.
        if matches!(opcode, Opcode::PairRequest | Opcode::PairAck) {
            match &result {
                Ok(()) => events.emit(CoreEvent::FrameAccepted { mac: sender_mac, opcode }),
                Err(err) => events.emit(CoreEvent::FrameRejected { mac: Some(sender_mac), reason: *err }),
            }
        }
        result
    }

    fn handle_pair_request(&mut self, peer_mac: [u8; 6], env: &mut impl Environment) {
        let outcome = pairing::handle_pair_request(env, self.own_mac, self.channel);
        let payload = outcome.ack.to_bytes();
        self.enqueue_authenticated(env, peer_mac, outcome.device_token, Opcode::PairAck, None, &payload);
    }

    /// Node-side pair completion: `PairAck` carries its own admission
    /// token (the freshly issued `device_token`), so the router can
    /// verify it without `Core` already knowing the token — this is the
    /// same per-frame key derivation every authenticated opcode uses,
    /// just bootstrapped from the payload instead of prior state.
    fn handle_pair_ack(&mut self, bytes: &[u8]) -> Result<(), CoreError> {
        let routed = self.router.verify(bytes, &self.secrets, self.controller_mac, &self.topology)?;
        let ack = PairAck::decode(routed.payload)?;
        self.device_token = ack.device_token;
        self.controller_mac = Some(ack.icm_mac);
        self.channel = ack.channel;
        Ok(())
    }

    /// Node-side topology install: the generic [`RoleAdapter`] surface
    /// only hands the adapter the raw TLV (`router::dispatch` has no
    /// `&mut TopologyStore` to install into), so `Core` intercepts this
    /// opcode to actually call [`TopologyStore::apply_push`] before
    /// still notifying the adapter, preserving its existing callback.
    fn handle_topology_push(
        &mut self,
        bytes: &[u8],
        verifier: &impl SignatureVerifier,
        adapter: &mut impl RoleAdapter,
        events: &mut impl EventSink,
    ) -> Result<(), CoreError> {
        let routed = {
            let result = self.router.verify(bytes, &self.secrets, self.controller_mac, &self.topology);
            match &result {
                Ok(routed) => events.emit(CoreEvent::FrameAccepted { mac: routed.ctx.mac, opcode: Opcode::TopoPush }),
                Err(err) => events.emit(CoreEvent::FrameRejected { mac: None, reason: *err }),
            }
            result?
        };
        let header = TopoPushHeader::decode(routed.payload)?;
        let tlv_start = topo_payload::TOPO_PUSH_HEADER_LEN;
        let tlv_end = tlv_start + header.tlv_len as usize;
        let tlv = routed.payload.get(tlv_start..tlv_end).ok_or(CoreError::Malformed)?;
        let peer_key = meshfr_crypto::derive_peer_key(
            &self.secrets.pre_shared_key,
            &self.secrets.per_link_key,
            &self.device_token,
            &self.secrets.salt,
        );
        if self.topology.apply_push(header.version, tlv, &peer_key, verifier) {
            events.emit(CoreEvent::TopologyInstalled { version: header.version });
        }
        adapter.on_topology_push(routed.ctx, tlv);
        Ok(())
    }

    /// Node-side channel-set handling (spec.md §4.8): the core itself
    /// owns scheduling the deferred switch, not the role adapter, since
    /// the adapter has no path back into `Core`'s own state. The adapter
    /// still receives `on_net_set_chan` afterward for roles that want to
    /// observe it.
    fn handle_net_set_chan(
        &mut self,
        bytes: &[u8],
        env: &impl Environment,
        adapter: &mut impl RoleAdapter,
        events: &mut impl EventSink,
    ) -> Result<(), CoreError> {
        let routed = {
            let result = self.router.verify(bytes, &self.secrets, self.controller_mac, &self.topology);
            match &result {
                Ok(routed) => events.emit(CoreEvent::FrameAccepted { mac: routed.ctx.mac, opcode: Opcode::NetSetChan }),
                Err(err) => events.emit(CoreEvent::FrameRejected { mac: None, reason: *err }),
            }
            result?
        };
        let cmd = NetSetChan::decode(routed.payload)?;
        self.schedule_channel_switch(env, cmd.new_channel, cmd.grace_delay_ms);
        adapter.on_net_set_chan(routed.ctx, cmd);
        Ok(())
    }

    fn handle_firmware_frame(
        &mut self,
        bytes: &[u8],
        opcode: Opcode,
        env: &mut impl Environment,
        verifier: &impl SignatureVerifier,
        events: &mut impl EventSink,
    ) -> Result<(), CoreError> {
        let routed = {
            let result = self.router.verify(bytes, &self.secrets, self.controller_mac, &self.topology);
            match &result {
                Ok(routed) => events.emit(CoreEvent::FrameAccepted { mac: routed.ctx.mac, opcode }),
                Err(err) => events.emit(CoreEvent::FrameRejected { mac: None, reason: *err }),
            }
            result?
        };

        let actions = match opcode {
            Opcode::FwBegin => {
                let begin = FwBegin::decode(routed.payload)?;
                vec![self.firmware.on_begin(begin, self.role)]
            }
            Opcode::FwChunk => {
                let header = FwChunkHeader::decode(routed.payload)?;
                let data_start = fw_payload::FW_CHUNK_HEADER_LEN;
                let data_end = data_start + header.data_len as usize;
                let data = routed.payload.get(data_start..data_end).ok_or(CoreError::Malformed)?;
                vec![self.firmware.on_chunk(header, data)]
            }
            Opcode::FwCommit => {
                let header = FwCommitHeader::decode(routed.payload)?;
                let sig_start = fw_payload::FW_COMMIT_HEADER_LEN;
                let sig_end = sig_start + header.sig_len as usize;
                let sig = routed.payload.get(sig_start..sig_end).ok_or(CoreError::Malformed)?;
                self.firmware.on_commit(header, sig, verifier)
            }
            Opcode::FwAbort => {
                let payload = FwAbortPayload::decode(routed.payload)?;
                vec![self.firmware.on_abort(payload)]
            }
            _ => unreachable!("handle_firmware_frame only called for firmware opcodes"),
        };

        for action in actions {
            self.apply_firmware_action(action, routed.ctx.mac, env, events);
        }
        Ok(())
    }

    fn apply_firmware_action(
        &mut self,
        action: FirmwareAction,
        controller_mac: [u8; 6],
        env: &mut impl Environment,
        events: &mut impl EventSink,
    ) {
        match action {
            FirmwareAction::SendStatus(status) => {
                let payload = status.to_bytes();
                self.enqueue_authenticated(env, controller_mac, self.device_token, Opcode::FwStatus, None, &payload);
                events.emit(CoreEvent::FirmwareStateChanged { image_id: status.image_id, state: "status" });
            }
            FirmwareAction::SendAbort(abort) => {
                let payload = abort.to_bytes();
                self.enqueue_authenticated(env, controller_mac, self.device_token, Opcode::FwAbort, None, &payload);
                events.emit(CoreEvent::FirmwareStateChanged { image_id: abort.image_id, state: "Error" });
            }
            FirmwareAction::ScheduleReboot => {
                events.emit(CoreEvent::FirmwareStateChanged { image_id: 0, state: "Rebooting" });
            }
            FirmwareAction::None => {}
        }
    }

    /// Drive the deferred channel switch and one outbound-scheduler tick.
    /// Callers invoke this from their cooperative loop at whatever
    /// cadence suits the host (spec.md §5: single-threaded, no internal
    /// timers).
    pub fn tick(&mut self, env: &mut impl Environment, radio: &mut impl Radio, events: &mut impl EventSink) {
        let now = env.now_ms();
        if let Some(switch) = self.pending_switch {
            if let Some(channel) = switch.due(now) {
                radio.set_channel(channel);
                self.channel = channel;
                self.pending_switch = None;
            }
        }
        if let Some(dropped) = self.scheduler.tick(radio, now) {
            events.emit(CoreEvent::SendDropped { mac: dropped.mac, opcode: dropped.opcode });
        }
    }

    /// Node-side handling of a channel-set command: persists the new
    /// channel immediately and schedules the radio reinit after the
    /// grace delay (spec.md §4.8).
    pub fn schedule_channel_switch(&mut self, env: &impl Environment, new_channel: u8, grace_delay_ms: u16) {
        self.pending_switch = Some(pairing::ChannelSwitch::schedule(new_channel, grace_delay_ms, env.now_ms()));
    }

    /// Liveness probe to an arbitrary peer.
    pub fn send_ping(&mut self, env: &mut impl Environment, dest_mac: [u8; 6], dest_admission: [u8; 16], echo: u16) -> bool {
        let payload = Ping { echo }.to_bytes();
        self.enqueue_authenticated(env, dest_mac, dest_admission, Opcode::Ping, None, &payload)
    }

    /// Reply to a liveness probe.
    pub fn send_ping_reply(
        &mut self,
        env: &mut impl Environment,
        dest_mac: [u8; 6],
        dest_admission: [u8; 16],
        state_flags: u8,
        uptime_s: u32,
    ) -> bool {
        let payload = PingReply { state_flags, uptime_s }.to_bytes();
        self.enqueue_authenticated(env, dest_mac, dest_admission, Opcode::PingReply, None, &payload)
    }

    /// Relay actuation command. Requires the caller's current topology
    /// token, since `CtrlRelay` is topology-token-gated rather than
    /// sender-privileged (spec.md §4.5 step 9).
    pub fn send_ctrl_relay(
        &mut self,
        env: &mut impl Environment,
        dest_mac: [u8; 6],
        dest_admission: [u8; 16],
        topology_token: [u8; 16],
        relay_mask: u16,
        command: u8,
    ) -> bool {
        let payload = CtrlRelay { relay_mask, command }.to_bytes();
        self.enqueue_authenticated(env, dest_mac, dest_admission, Opcode::CtrlRelay, Some(topology_token), &payload)
    }

    /// Report this node's relay output state to the controller.
    pub fn send_relay_state(&mut self, env: &mut impl Environment, state: RlyState) -> bool {
        let Some((mac, admission)) = self.to_controller() else { return false };
        let payload = state.to_bytes();
        self.enqueue_authenticated(env, mac, admission, Opcode::RlyState, None, &payload)
    }

    /// Report a periodic sensor sample to the controller.
    pub fn send_sensor_report(&mut self, env: &mut impl Environment, report: SensReport) -> bool {
        let Some((mac, admission)) = self.to_controller() else { return false };
        let payload = report.to_bytes();
        self.enqueue_authenticated(env, mac, admission, Opcode::SensReport, None, &payload)
    }

    /// Report power-management telemetry to the controller.
    pub fn send_power_status(&mut self, env: &mut impl Environment, status: PmsStatus) -> bool {
        let Some((mac, admission)) = self.to_controller() else { return false };
        let payload = status.to_bytes();
        self.enqueue_authenticated(env, mac, admission, Opcode::PmsStatus, None, &payload)
    }

    /// Controller-issued configuration write.
    pub fn send_config_write(
        &mut self,
        env: &mut impl Environment,
        dest_mac: [u8; 6],
        dest_admission: [u8; 16],
        key: [u8; 6],
        value: &[u8],
    ) -> bool {
        let header = ConfigWriteHeader { key, value_len: value.len() as u16 };
        let mut payload = header.to_bytes().to_vec();
        payload.extend_from_slice(value);
        self.enqueue_authenticated(env, dest_mac, dest_admission, Opcode::ConfigWrite, None, &payload)
    }

    /// Push a topology blob to a peer.
    pub fn send_topo_push(
        &mut self,
        env: &mut impl Environment,
        dest_mac: [u8; 6],
        dest_admission: [u8; 16],
        version: u16,
        tlv: &[u8],
    ) -> bool {
        let header = TopoPushHeader { version, tlv_len: tlv.len() as u16 };
        let mut payload = header.to_bytes().to_vec();
        payload.extend_from_slice(tlv);
        self.enqueue_authenticated(env, dest_mac, dest_admission, Opcode::TopoPush, None, &payload)
    }

    /// Command a peer's channel change.
    pub fn send_net_set_chan(
        &mut self,
        env: &mut impl Environment,
        dest_mac: [u8; 6],
        dest_admission: [u8; 16],
        new_channel: u8,
        grace_delay_ms: u16,
    ) -> bool {
        let payload = NetSetChan { new_channel, grace_delay_ms }.to_bytes();
        self.enqueue_authenticated(env, dest_mac, dest_admission, Opcode::NetSetChan, None, &payload)
    }

    /// Wall-clock synchronization.
    pub fn send_time_sync(
        &mut self,
        env: &mut impl Environment,
        dest_mac: [u8; 6],
        dest_admission: [u8; 16],
        controller_ts_ms: u64,
    ) -> bool {
        let payload = TimeSync { controller_ts_ms }.to_bytes();
        self.enqueue_authenticated(env, dest_mac, dest_admission, Opcode::TimeSync, None, &payload)
    }

    /// Begin a firmware transfer to a peer.
    pub fn send_fw_begin(&mut self, env: &mut impl Environment, dest_mac: [u8; 6], dest_admission: [u8; 16], begin: FwBegin) -> bool {
        let payload = begin.to_bytes();
        self.enqueue_authenticated(env, dest_mac, dest_admission, Opcode::FwBegin, None, &payload)
    }

    /// Send one firmware chunk to a peer.
    pub fn send_fw_chunk(
        &mut self,
        env: &mut impl Environment,
        dest_mac: [u8; 6],
        dest_admission: [u8; 16],
        header: FwChunkHeader,
        data: &[u8],
    ) -> bool {
        let mut payload = header.to_bytes().to_vec();
        payload.extend_from_slice(data);
        self.enqueue_authenticated(env, dest_mac, dest_admission, Opcode::FwChunk, None, &payload)
    }

    /// Request a signed firmware commit from a peer.
    pub fn send_fw_commit(
        &mut self,
        env: &mut impl Environment,
        dest_mac: [u8; 6],
        dest_admission: [u8; 16],
        header: FwCommitHeader,
        signature: &[u8],
    ) -> bool {
        let mut payload = header.to_bytes().to_vec();
        payload.extend_from_slice(signature);
        self.enqueue_authenticated(env, dest_mac, dest_admission, Opcode::FwCommit, None, &payload)
    }

    /// Abort a firmware transfer on a peer.
    pub fn send_fw_abort(&mut self, env: &mut impl Environment, dest_mac: [u8; 6], dest_admission: [u8; 16], payload: FwAbortPayload) -> bool {
        let bytes = payload.to_bytes();
        self.enqueue_authenticated(env, dest_mac, dest_admission, Opcode::FwAbort, None, &bytes)
    }
}
