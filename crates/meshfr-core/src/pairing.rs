//! Pairing ingress and deferred channel switch (spec.md §4.8).
//!
//! Both state machines follow the action pattern used throughout this
//! crate: they take time as an explicit input and return what the driver
//! should do, rather than performing I/O themselves.

use meshfr_wire::payloads::PairAck;

use crate::env::Environment;

/// What the driver should do after handling a pair-request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairingOutcome {
    /// The freshly issued device token, to persist for this peer.
    pub device_token: [u8; 16],
    /// The acknowledgment payload to send back, unsigned (the caller
    /// applies the HMAC trailer using the key derivable from
    /// `device_token`).
    pub ack: PairAck,
}

/// Controller-side pair-request handling: allocate a token and build the
/// reply. Pairing has no persistent state of its own beyond what the
/// caller does with [`PairingOutcome`], so this is a pure function rather
/// than a struct.
pub fn handle_pair_request(
    env: &mut impl Environment,
    controller_mac: [u8; 6],
    channel: u8,
) -> PairingOutcome {
    let mut device_token = [0u8; 16];
    env.random_bytes(&mut device_token);
    PairingOutcome { device_token, ack: PairAck { icm_mac: controller_mac, channel, device_token } }
}

/// Node-side deferred channel switch (spec.md §4.8): the node persists
/// the new channel immediately but only reinitializes the radio after
/// `grace_delay_ms`, so a subsequent channel-set frame can still cancel
/// it by replacing the pending switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSwitch {
    new_channel: u8,
    switch_at_ms: u64,
}

impl ChannelSwitch {
    /// Schedule a switch to `new_channel` after `grace_delay_ms` from
    /// `now_ms`. A subsequent call replaces any switch already pending —
    /// "the more recent command wins" (spec.md §5).
    #[must_use]
    pub fn schedule(new_channel: u8, grace_delay_ms: u16, now_ms: u64) -> Self {
        Self { new_channel, switch_at_ms: now_ms + u64::from(grace_delay_ms) }
    }

    /// Check whether the grace period has elapsed. Returns the channel
    /// to reinitialize the radio on, exactly once, when it has.
    #[must_use]
    pub fn due(&self, now_ms: u64) -> Option<u8> {
        (now_ms >= self.switch_at_ms).then_some(self.new_channel)
    }
}

/// Controller-side timing for its own radio switch: switch
/// `lead_ms` before the grace delay expires so it is listening on the
/// new channel when the node's probe arrives (spec.md §4.8: "the
/// controller switches its own radio at `(delay - ~100ms)`").
#[must_use]
pub fn controller_switch_at_ms(now_ms: u64, grace_delay_ms: u16, lead_ms: u64) -> u64 {
    now_ms + u64::from(grace_delay_ms).saturating_sub(lead_ms)
}

/// Default lead time the controller switches ahead of the node (spec.md
/// §4.8: "~100 ms").
pub const CONTROLLER_SWITCH_LEAD_MS: u64 = 100;
