//! Device roles (spec.md §3).

/// A node's immutable, post-provisioning role.
///
/// Emulator roles ([`Self::RelayEmulator`], [`Self::SensorEmulator`])
/// expose a virtual index space `1..=N` behind one radio identity; see
/// `virt_id` on [`meshfr_wire::Header`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DeviceRole {
    /// The single coordinator node.
    Controller,
    /// The power-management node.
    PowerManager,
    /// A production relay node.
    Relay,
    /// A production sensor node.
    Sensor,
    /// An emulator hosting many virtual relay endpoints.
    RelayEmulator,
    /// An emulator hosting many virtual sensor endpoints.
    SensorEmulator,
}

impl DeviceRole {
    /// Decode a wire `sender_role` byte.
    #[must_use]
    pub fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            0 => Self::Controller,
            1 => Self::PowerManager,
            2 => Self::Relay,
            3 => Self::Sensor,
            4 => Self::RelayEmulator,
            5 => Self::SensorEmulator,
            _ => return None,
        })
    }

    /// Encode to the wire `sender_role` byte.
    #[must_use]
    pub fn to_byte(self) -> u8 {
        match self {
            Self::Controller => 0,
            Self::PowerManager => 1,
            Self::Relay => 2,
            Self::Sensor => 3,
            Self::RelayEmulator => 4,
            Self::SensorEmulator => 5,
        }
    }

    /// `true` for the emulator roles, which multiplex virtual endpoints.
    #[must_use]
    pub fn is_emulator(self) -> bool {
        matches!(self, Self::RelayEmulator | Self::SensorEmulator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_role() {
        for role in [
            DeviceRole::Controller,
            DeviceRole::PowerManager,
            DeviceRole::Relay,
            DeviceRole::Sensor,
            DeviceRole::RelayEmulator,
            DeviceRole::SensorEmulator,
        ] {
            assert_eq!(DeviceRole::from_byte(role.to_byte()), Some(role));
        }
    }

    #[test]
    fn rejects_unknown_byte() {
        assert_eq!(DeviceRole::from_byte(0xEE), None);
    }
}
