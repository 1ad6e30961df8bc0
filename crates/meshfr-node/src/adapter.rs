//! Logging [`RoleAdapter`]: traces every dispatched callback instead of
//! acting on it, so the binary has somewhere to route inbound frames
//! without committing to a specific role's business logic.

use meshfr_core::{RoleAdapter, SenderContext};
use meshfr_wire::payloads::{CtrlRelay, NetSetChan, PmsStatus, RlyState, SensReport, TimeSync};

/// A [`RoleAdapter`] that logs every callback via `tracing`.
#[derive(Debug, Default)]
pub struct LoggingAdapter;

impl RoleAdapter for LoggingAdapter {
    fn on_ping(&mut self, ctx: SenderContext, echo: u16) {
        tracing::info!(?ctx, echo, "ping");
    }

    fn on_ping_reply(&mut self, ctx: SenderContext, state_flags: u8, uptime_s: u32) {
        tracing::info!(?ctx, state_flags, uptime_s, "ping-reply");
    }

    fn on_ctrl_relay(&mut self, ctx: SenderContext, cmd: CtrlRelay) {
        tracing::info!(?ctx, ?cmd, "ctrl-relay");
    }

    fn on_sensor_report(&mut self, ctx: SenderContext, report: SensReport) {
        tracing::info!(?ctx, ?report, "sensor-report");
    }

    fn on_relay_state(&mut self, ctx: SenderContext, state: RlyState) {
        tracing::info!(?ctx, ?state, "relay-state");
    }

    fn on_power_status(&mut self, ctx: SenderContext, status: PmsStatus) {
        tracing::info!(?ctx, ?status, "power-status");
    }

    fn on_config_write(&mut self, ctx: SenderContext, key: [u8; 6], value: &[u8]) {
        tracing::info!(?ctx, ?key, len = value.len(), "config-write");
    }

    fn on_topology_push(&mut self, ctx: SenderContext, tlv: &[u8]) {
        tracing::info!(?ctx, len = tlv.len(), "topology-push");
    }

    fn on_net_set_chan(&mut self, ctx: SenderContext, cmd: NetSetChan) {
        tracing::info!(?ctx, ?cmd, "net-set-chan");
    }

    fn on_fw_status(&mut self, ctx: SenderContext, status: meshfr_wire::payloads::FwStatus) {
        tracing::info!(?ctx, ?status, "fw-status");
    }

    fn on_time_sync(&mut self, ctx: SenderContext, sync: TimeSync) {
        tracing::info!(?ctx, ?sync, "time-sync");
    }
}
