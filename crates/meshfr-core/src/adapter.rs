//! Role adapter surface (spec.md §6): the narrow trait the router
//! dispatches to. Implementations are per-role collaborators; the router
//! invokes only what is reachable given the peer's role and virtual
//! index.

use meshfr_wire::payloads::{CtrlRelay, NetSetChan, PmsStatus, RlyState, SensReport, TimeSync};

/// Sender identity attached to every dispatch, since several handlers
/// need the virtual index to disambiguate emulated endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SenderContext {
    /// Sender's hardware address.
    pub mac: [u8; 6],
    /// Virtual index from the header (`0xFF` for physical endpoints).
    pub virt_id: u8,
}

/// Capability interface a role implements to receive dispatched frames.
/// Methods default to doing nothing, so a role only overrides what it
/// cares about.
pub trait RoleAdapter {
    /// A liveness ping arrived; implementations typically reply with a
    /// ping-reply through the scheduler.
    fn on_ping(&mut self, _ctx: SenderContext, _echo: u16) {}

    /// A reply to a ping this node sent.
    fn on_ping_reply(&mut self, _ctx: SenderContext, _state_flags: u8, _uptime_s: u32) {}

    /// A relay-control command.
    fn on_ctrl_relay(&mut self, _ctx: SenderContext, _cmd: CtrlRelay) {}

    /// A periodic sensor report.
    fn on_sensor_report(&mut self, _ctx: SenderContext, _report: SensReport) {}

    /// A relay's output-state report.
    fn on_relay_state(&mut self, _ctx: SenderContext, _state: RlyState) {}

    /// A power-management status report.
    fn on_power_status(&mut self, _ctx: SenderContext, _status: PmsStatus) {}

    /// A configuration write: 6-byte key plus opaque value.
    fn on_config_write(&mut self, _ctx: SenderContext, _key: [u8; 6], _value: &[u8]) {}

    /// A topology push survived router-level checks (sequencing,
    /// privilege) and was handed to the topology store; this notifies
    /// the role after the store has processed it.
    fn on_topology_push(&mut self, _ctx: SenderContext, _tlv: &[u8]) {}

    /// A channel-set command.
    fn on_net_set_chan(&mut self, _ctx: SenderContext, _cmd: NetSetChan) {}

    /// A firmware status report (controller-side use).
    fn on_fw_status(&mut self, _ctx: SenderContext, _status: meshfr_wire::payloads::FwStatus) {}

    /// A time-sync frame.
    fn on_time_sync(&mut self, _ctx: SenderContext, _sync: TimeSync) {}
}
