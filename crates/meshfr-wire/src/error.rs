//! Wire-level error kinds.

/// Errors raised while encoding or decoding a v2H frame.
///
/// All of these correspond to the `Malformed` error kind in the runtime
/// layer (`meshfr-core`); the wire codec itself never distinguishes
/// authentication or replay failures, since it has no key material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The buffer is shorter than the fixed 23-byte header.
    #[error("frame too short: {len} bytes, header needs {HEADER_LEN}")]
    FrameTooShort {
        /// Length actually supplied.
        len: usize,
    },

    /// `reserved` header byte was non-zero.
    #[error("reserved header byte is non-zero")]
    ReservedNonZero,

    /// `ver` did not match the supported protocol version.
    #[error("unsupported protocol version {version}")]
    UnsupportedVersion {
        /// Version found on the wire.
        version: u8,
    },

    /// The opcode byte did not match any known opcode.
    #[error("unknown opcode {opcode:#04x}")]
    UnknownOpcode {
        /// Raw opcode byte.
        opcode: u8,
    },

    /// The admission token section does not fit in the remaining bytes.
    #[error("admission token truncated")]
    AdmissionTruncated,

    /// The flag bit asserted a topology token that does not fit.
    #[error("topology token truncated")]
    TopologyTokenTruncated,

    /// The payload is shorter than the opcode's minimum length.
    #[error("payload too short for opcode {opcode:#04x}: got {got}, need {need}")]
    PayloadTooShort {
        /// Opcode the payload belongs to.
        opcode: u8,
        /// Bytes actually present.
        got: usize,
        /// Minimum bytes required.
        need: usize,
    },

    /// The frame would exceed the transport MTU.
    #[error("frame size {size} exceeds MTU {MAX_FRAME_LEN}")]
    FrameTooLarge {
        /// Computed encoded size.
        size: usize,
    },

    /// The trailer (nonce + tag) does not fit in the remaining bytes.
    #[error("trailer truncated or missing")]
    TrailerTruncated,

    /// A variable-length tail (TLV blob, config value, chunk data,
    /// signature) exceeded its opcode-specific cap.
    #[error("variable tail of {got} bytes exceeds cap of {cap} bytes")]
    TailTooLarge {
        /// Bytes supplied.
        got: usize,
        /// Maximum permitted for this opcode.
        cap: usize,
    },
}

/// Fixed header length in bytes (spec.md §6).
pub const HEADER_LEN: usize = 23;

/// Transport MTU; no encoded frame may exceed this many bytes (spec.md §4.1).
pub const MAX_FRAME_LEN: usize = 250;
