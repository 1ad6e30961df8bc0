//! Loopback radio stub.
//!
//! `meshfr-core` treats the radio as an injected collaborator (spec.md §5,
//! REDESIGN FLAG: "singleton radio callback" replaced by an explicit
//! trait); the real ESP-NOW transport is firmware-specific and out of
//! scope here (spec.md Non-goals). This stub only logs what the core
//! would have sent, so the binary links and runs standalone for local
//! smoke-testing without real hardware.

use meshfr_core::{Radio, SendResult};

/// A [`Radio`] that logs every call instead of touching real hardware.
#[derive(Debug, Default)]
pub struct LoopbackRadio;

impl Radio for LoopbackRadio {
    fn set_channel(&mut self, channel: u8) {
        tracing::info!(channel, "radio: set_channel");
    }

    fn add_encrypted_peer(&mut self, mac: [u8; 6], _per_link_key: [u8; 16], _pre_shared_key: [u8; 16]) {
        tracing::info!(?mac, "radio: add_encrypted_peer");
    }

    fn remove_peer(&mut self, mac: [u8; 6]) {
        tracing::info!(?mac, "radio: remove_peer");
    }

    fn send(&mut self, mac: [u8; 6], frame: &[u8]) -> SendResult {
        tracing::info!(?mac, len = frame.len(), "radio: send (loopback, discarded)");
        SendResult::Ok
    }
}
