//! A [`meshfr_core::RoleAdapter`] that records every callback instead of
//! reacting to it, for scenario-test assertions. Grounded on
//! `lockframe-core::connection`'s test-module `RecordingTransport`
//! pattern: push observed calls to a `Vec`, assert on it afterward.

use meshfr_core::{RoleAdapter, SenderContext};
use meshfr_wire::payloads::{CtrlRelay, FwStatus, NetSetChan, PmsStatus, RlyState, SensReport, TimeSync};

/// Records every [`RoleAdapter`] callback it receives, in call order per
/// field.
#[derive(Debug, Default)]
pub struct RecordingAdapter {
    /// `(sender, echo)` for every `on_ping`.
    pub pings: Vec<(SenderContext, u16)>,
    /// `(sender, state_flags, uptime_s)` for every `on_ping_reply`.
    pub ping_replies: Vec<(SenderContext, u8, u32)>,
    /// Every `on_ctrl_relay`.
    pub ctrl_relays: Vec<(SenderContext, CtrlRelay)>,
    /// Every `on_sensor_report`.
    pub sensor_reports: Vec<(SenderContext, SensReport)>,
    /// Every `on_relay_state`.
    pub relay_states: Vec<(SenderContext, RlyState)>,
    /// Every `on_power_status`.
    pub power_statuses: Vec<(SenderContext, PmsStatus)>,
    /// `(sender, key, value)` for every `on_config_write`.
    pub config_writes: Vec<(SenderContext, [u8; 6], Vec<u8>)>,
    /// `(sender, tlv)` for every `on_topology_push`.
    pub topology_pushes: Vec<(SenderContext, Vec<u8>)>,
    /// Every `on_net_set_chan`.
    pub net_set_chans: Vec<(SenderContext, NetSetChan)>,
    /// Every `on_fw_status`.
    pub fw_statuses: Vec<(SenderContext, FwStatus)>,
    /// Every `on_time_sync`.
    pub time_syncs: Vec<(SenderContext, TimeSync)>,
}

impl RoleAdapter for RecordingAdapter {
    fn on_ping(&mut self, ctx: SenderContext, echo: u16) {
        self.pings.push((ctx, echo));
    }

    fn on_ping_reply(&mut self, ctx: SenderContext, state_flags: u8, uptime_s: u32) {
        self.ping_replies.push((ctx, state_flags, uptime_s));
    }

    fn on_ctrl_relay(&mut self, ctx: SenderContext, cmd: CtrlRelay) {
        self.ctrl_relays.push((ctx, cmd));
    }

    fn on_sensor_report(&mut self, ctx: SenderContext, report: SensReport) {
        self.sensor_reports.push((ctx, report));
    }

    fn on_relay_state(&mut self, ctx: SenderContext, state: RlyState) {
        self.relay_states.push((ctx, state));
    }

    fn on_power_status(&mut self, ctx: SenderContext, status: PmsStatus) {
        self.power_statuses.push((ctx, status));
    }

    fn on_config_write(&mut self, ctx: SenderContext, key: [u8; 6], value: &[u8]) {
        self.config_writes.push((ctx, key, value.to_vec()));
    }

    fn on_topology_push(&mut self, ctx: SenderContext, tlv: &[u8]) {
        self.topology_pushes.push((ctx, tlv.to_vec()));
    }

    fn on_net_set_chan(&mut self, ctx: SenderContext, cmd: NetSetChan) {
        self.net_set_chans.push((ctx, cmd));
    }

    fn on_fw_status(&mut self, ctx: SenderContext, status: FwStatus) {
        self.fw_statuses.push((ctx, status));
    }

    fn on_time_sync(&mut self, ctx: SenderContext, sync: TimeSync) {
        self.time_syncs.push((ctx, sync));
    }
}
