//! The 23-byte fixed frame header.
//!
//! Field layout (all integers little-endian, spec.md §6):
//!
//! ```text
//! [0]      ver
//! [1]      op
//! [2..4]   flags
//! [4..6]   seq
//! [6..8]   topo_ver
//! [8]      virt_id
//! [9]      reserved
//! [10..16] ts_ms (48-bit)
//! [16..22] sender_mac
//! [22]     sender_role
//! ```
//!
//! Unlike the header type this crate's authors are used to reaching for,
//! this one is **not** `#[repr(C, packed)]` cast from a byte slice: the
//! protocol version is pinned and offsets are frozen by contract across a
//! fleet of devices that do not all rebuild in lockstep, so offsets are
//! asserted by tests rather than left to a compiler attribute.

use crate::error::{ProtocolError, HEADER_LEN};
use crate::flags::FrameFlags;
use crate::opcode::Opcode;

/// Protocol version this codec speaks. Frames with any other version are
/// rejected before anything else is inspected.
pub const PROTOCOL_VERSION: u8 = 3;

/// Sentinel `virt_id` meaning "physical endpoint, not an emulator slot."
pub const VIRT_ID_PHYSICAL: u8 = 0xFF;

/// An owned, builder-friendly representation of the frame header, used
/// when constructing outbound frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Opcode of the frame this header belongs to.
    pub opcode: Opcode,
    /// Frame-level flags.
    pub flags: FrameFlags,
    /// Per-(peer, opcode) sequence number.
    pub seq: u16,
    /// Topology version the sender believes is current.
    pub topo_ver: u16,
    /// Virtual endpoint index, or [`VIRT_ID_PHYSICAL`].
    pub virt_id: u8,
    /// Sender's monotonic milliseconds, 48-bit range.
    pub ts_ms: u64,
    /// Sender's link-layer MAC address.
    pub sender_mac: [u8; 6],
    /// Sender's device role, as its wire byte.
    pub sender_role: u8,
}

impl Header {
    /// Serialize to the 23-byte wire representation.
    #[must_use]
    pub fn to_bytes(self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0] = PROTOCOL_VERSION;
        out[1] = self.opcode.to_byte();
        out[2..4].copy_from_slice(&self.flags.bits().to_le_bytes());
        out[4..6].copy_from_slice(&self.seq.to_le_bytes());
        out[6..8].copy_from_slice(&self.topo_ver.to_le_bytes());
        out[8] = self.virt_id;
        out[9] = 0; // reserved
        let ts = self.ts_ms.to_le_bytes();
        out[10..16].copy_from_slice(&ts[0..6]);
        out[16..22].copy_from_slice(&self.sender_mac);
        out[22] = self.sender_role;
        out
    }
}

/// A validated, zero-copy view over a 23-byte header slice.
///
/// Construction via [`HeaderView::parse`] is the only inbound entry point
/// and performs the header-level checks from spec.md §4.5 step 1: length,
/// protocol version, and `reserved == 0`. Everything else (admission
/// token, trailer, HMAC, replay) is the router's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderView<'a> {
    bytes: &'a [u8],
}

impl<'a> HeaderView<'a> {
    /// Validate and wrap the first `HEADER_LEN` bytes of `bytes`.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < HEADER_LEN {
            return Err(ProtocolError::FrameTooShort { len: bytes.len() });
        }
        let view = Self {
            bytes: &bytes[..HEADER_LEN],
        };
        if view.reserved() != 0 {
            return Err(ProtocolError::ReservedNonZero);
        }
        if view.version() != PROTOCOL_VERSION {
            return Err(ProtocolError::UnsupportedVersion {
                version: view.version(),
            });
        }
        Ok(view)
    }

    /// The raw 23-byte slice backing this view.
    #[must_use]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Protocol version byte (already checked equal to [`PROTOCOL_VERSION`]
    /// by [`parse`](Self::parse)).
    #[must_use]
    pub fn version(&self) -> u8 {
        self.bytes[0]
    }

    /// Raw opcode byte. Use [`opcode`](Self::opcode) for the decoded enum.
    #[must_use]
    pub fn opcode_byte(&self) -> u8 {
        self.bytes[1]
    }

    /// Decoded opcode.
    pub fn opcode(&self) -> Result<Opcode, ProtocolError> {
        Opcode::from_byte(self.opcode_byte())
    }

    /// Frame-level flags.
    #[must_use]
    pub fn flags(&self) -> FrameFlags {
        FrameFlags::from_bits(u16::from_le_bytes([self.bytes[2], self.bytes[3]]))
    }

    /// Per-(peer, opcode) sequence number.
    #[must_use]
    pub fn seq(&self) -> u16 {
        u16::from_le_bytes([self.bytes[4], self.bytes[5]])
    }

    /// Topology version the sender believes is current.
    #[must_use]
    pub fn topo_ver(&self) -> u16 {
        u16::from_le_bytes([self.bytes[6], self.bytes[7]])
    }

    /// Virtual endpoint index, or [`VIRT_ID_PHYSICAL`].
    #[must_use]
    pub fn virt_id(&self) -> u8 {
        self.bytes[8]
    }

    /// The `reserved` byte; must be zero (checked by [`parse`](Self::parse)).
    #[must_use]
    pub fn reserved(&self) -> u8 {
        self.bytes[9]
    }

    /// Sender's monotonic milliseconds (48-bit range, stored LE).
    #[must_use]
    pub fn ts_ms(&self) -> u64 {
        let mut buf = [0u8; 8];
        buf[0..6].copy_from_slice(&self.bytes[10..16]);
        u64::from_le_bytes(buf)
    }

    /// Sender's link-layer MAC address.
    #[must_use]
    pub fn sender_mac(&self) -> [u8; 6] {
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&self.bytes[16..22]);
        mac
    }

    /// Sender's device role, as its wire byte.
    #[must_use]
    pub fn sender_role(&self) -> u8 {
        self.bytes[22]
    }

    /// Materialize into an owned [`Header`].
    pub fn to_owned_header(&self) -> Result<Header, ProtocolError> {
        Ok(Header {
            opcode: self.opcode()?,
            flags: self.flags(),
            seq: self.seq(),
            topo_ver: self.topo_ver(),
            virt_id: self.virt_id(),
            ts_ms: self.ts_ms(),
            sender_mac: self.sender_mac(),
            sender_role: self.sender_role(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> Header {
        Header {
            opcode: Opcode::Ping,
            flags: FrameFlags::default().with_topology_token_present(true),
            seq: 0x1234,
            topo_ver: 0x0007,
            virt_id: VIRT_ID_PHYSICAL,
            ts_ms: 0x0000_BEEF_CAFE,
            sender_mac: [1, 2, 3, 4, 5, 6],
            sender_role: 2,
        }
    }

    #[test]
    fn round_trip() {
        let header = sample_header();
        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), HEADER_LEN);
        let view = HeaderView::parse(&bytes).unwrap();
        assert_eq!(view.to_owned_header().unwrap(), header);
    }

    #[test]
    fn field_offsets_match_contract() {
        let header = sample_header();
        let bytes = header.to_bytes();
        assert_eq!(bytes[0], PROTOCOL_VERSION);
        assert_eq!(bytes[1], Opcode::Ping.to_byte());
        assert_eq!(u16::from_le_bytes([bytes[2], bytes[3]]) & 1, 1);
        assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]), 0x1234);
        assert_eq!(u16::from_le_bytes([bytes[6], bytes[7]]), 0x0007);
        assert_eq!(bytes[8], VIRT_ID_PHYSICAL);
        assert_eq!(bytes[9], 0);
        assert_eq!(&bytes[16..22], &[1, 2, 3, 4, 5, 6]);
        assert_eq!(bytes[22], 2);
    }

    #[test]
    fn rejects_short_buffer() {
        let bytes = [0u8; HEADER_LEN - 1];
        assert_eq!(
            HeaderView::parse(&bytes),
            Err(ProtocolError::FrameTooShort { len: bytes.len() })
        );
    }

    #[test]
    fn rejects_nonzero_reserved() {
        let mut bytes = sample_header().to_bytes();
        bytes[9] = 1;
        assert_eq!(
            HeaderView::parse(&bytes),
            Err(ProtocolError::ReservedNonZero)
        );
    }

    #[test]
    fn rejects_wrong_version() {
        let mut bytes = sample_header().to_bytes();
        bytes[0] = PROTOCOL_VERSION + 1;
        assert_eq!(
            HeaderView::parse(&bytes),
            Err(ProtocolError::UnsupportedVersion {
                version: PROTOCOL_VERSION + 1
            })
        );
    }

    #[test]
    fn ts_ms_is_48_bit_clamped_on_construction() {
        let mut header = sample_header();
        header.ts_ms = 0x0001_0000_0000_0000; // 49th bit set, must be dropped on encode
        let bytes = header.to_bytes();
        let view = HeaderView::parse(&bytes).unwrap();
        assert_eq!(view.ts_ms(), 0);
    }
}
