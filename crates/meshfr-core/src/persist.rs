//! Durable node state (spec.md §6) and the trait that loads/saves it.

use serde::{Deserialize, Serialize};

use crate::role::DeviceRole;

/// A snapshot of an in-progress firmware transfer, durable enough to
/// resume after a reboot without re-downloading completed chunks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FirmwareSessionSnapshot {
    /// Image identifier this session concerns.
    pub image_id: u32,
    /// Bytes received so far.
    pub received_bytes: u32,
    /// Next chunk index the receiver expects.
    pub next_needed: u16,
}

/// Everything a node must remember across a reboot to resume operating
/// without re-pairing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersistedState {
    /// This node's role.
    pub role: DeviceRole,
    /// The 128-bit token issued at pairing, used to derive the peer key.
    pub device_token: [u8; 16],
    /// The controller's hardware address, required for privileged-opcode
    /// gating.
    pub controller_mac: [u8; 6],
    /// The current radio channel.
    pub channel: u8,
    /// The last installed topology version.
    pub topology_version: u16,
    /// The last installed topology blob, as received (TLV-encoded).
    pub topology_blob: Vec<u8>,
    /// An in-progress firmware session to resume, if any.
    pub firmware_session: Option<FirmwareSessionSnapshot>,
}

impl PersistedState {
    /// The zero-value state a freshly provisioned, unpaired node starts
    /// from.
    #[must_use]
    pub fn unpaired(role: DeviceRole) -> Self {
        Self {
            role,
            device_token: [0; 16],
            controller_mac: [0; 6],
            channel: 0,
            topology_version: 0,
            topology_blob: Vec::new(),
            firmware_session: None,
        }
    }
}

/// Persists and restores [`PersistedState`]. Implementations are free to
/// choose the backing store (flash, file, in-memory for tests); the core
/// only needs load-at-boot and save-after-mutation.
pub trait Persistence {
    /// Error type for load/save failures.
    type Error: std::fmt::Debug;

    /// Load the last saved state, or `None` if nothing has been saved
    /// yet (a fresh device).
    fn load(&mut self) -> Result<Option<PersistedState>, Self::Error>;

    /// Persist `state`, overwriting whatever was saved before.
    fn save(&mut self, state: &PersistedState) -> Result<(), Self::Error>;
}
