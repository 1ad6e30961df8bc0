//! Fixed-size opaque tokens carried on the wire.

/// Length in bytes of the admission token and the topology token alike
/// (`NowAuth128`, `NowTopoToken128`).
pub const TOKEN_LEN: usize = 16;

/// The 128-bit admission token identifying a paired peer. Present on every
/// frame except `PairRequest`.
pub type AdmissionToken = [u8; TOKEN_LEN];

/// The 128-bit topology token certifying knowledge of the current topology
/// projection. Present only when [`FrameFlags::topology_token_present`]
/// is set.
///
/// [`FrameFlags::topology_token_present`]: crate::flags::FrameFlags::topology_token_present
pub type TopologyToken = [u8; TOKEN_LEN];

/// The all-zero token, used as the sentinel "no token issued yet" value.
pub const ZERO_TOKEN: [u8; TOKEN_LEN] = [0; TOKEN_LEN];
