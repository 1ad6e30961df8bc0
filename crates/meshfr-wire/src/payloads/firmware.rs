//! Firmware-transfer payloads (spec.md §4.9, §6).

use crate::error::ProtocolError;
use crate::opcode::Opcode;

fn too_short(opcode: Opcode, got: usize, need: usize) -> ProtocolError {
    ProtocolError::PayloadTooShort {
        opcode: opcode.to_byte(),
        got,
        need,
    }
}

/// Signature algorithm used at firmware commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SigAlgo {
    /// Ed25519.
    Ed25519 = 0,
    /// ECDSA over P-256.
    EcdsaP256 = 1,
}

impl SigAlgo {
    /// Decode a wire `sig_algo` byte.
    pub fn from_byte(byte: u8) -> Result<Self, ProtocolError> {
        match byte {
            0 => Ok(Self::Ed25519),
            1 => Ok(Self::EcdsaP256),
            _ => Err(ProtocolError::PayloadTooShort {
                // sig_algo is a single byte with no valid decode for this value;
                // reported as a malformed commit/begin payload.
                opcode: Opcode::FwBegin.to_byte(),
                got: 0,
                need: 0,
            }),
        }
    }
}

/// Begin a firmware transfer (spec.md §4.9). 52 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FwBegin {
    /// Identifier of the image being transferred.
    pub image_id: u32,
    /// Device role this image targets.
    pub target_role: u8,
    /// Signature algorithm that will be used at commit.
    pub sig_algo: u8,
    /// Total image size in bytes.
    pub total_size: u32,
    /// Size in bytes of each chunk except possibly the last.
    pub chunk_size: u16,
    /// Total number of chunks.
    pub total_chunks: u16,
    /// Sliding-window size, in chunks.
    pub window_size: u16,
    /// Expected SHA-256 digest of the complete image.
    pub sha256: [u8; 32],
}

/// Wire size of [`FwBegin`].
pub const FW_BEGIN_LEN: usize = 52;

impl FwBegin {
    /// Serialize to the 52-byte wire representation.
    #[must_use]
    pub fn to_bytes(self) -> [u8; FW_BEGIN_LEN] {
        let mut out = [0u8; FW_BEGIN_LEN];
        out[0..4].copy_from_slice(&self.image_id.to_le_bytes());
        out[4] = self.target_role;
        out[5] = self.sig_algo;
        out[8..12].copy_from_slice(&self.total_size.to_le_bytes());
        out[12..14].copy_from_slice(&self.chunk_size.to_le_bytes());
        out[14..16].copy_from_slice(&self.total_chunks.to_le_bytes());
        out[16..18].copy_from_slice(&self.window_size.to_le_bytes());
        out[20..52].copy_from_slice(&self.sha256);
        out
    }

    /// Parse from at least [`FW_BEGIN_LEN`] bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < FW_BEGIN_LEN {
            return Err(too_short(Opcode::FwBegin, bytes.len(), FW_BEGIN_LEN));
        }
        let mut sha256 = [0u8; 32];
        sha256.copy_from_slice(&bytes[20..52]);
        Ok(Self {
            image_id: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            target_role: bytes[4],
            sig_algo: bytes[5],
            total_size: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            chunk_size: u16::from_le_bytes([bytes[12], bytes[13]]),
            total_chunks: u16::from_le_bytes([bytes[14], bytes[15]]),
            window_size: u16::from_le_bytes([bytes[16], bytes[17]]),
            sha256,
        })
    }
}

/// Fixed header of a firmware data chunk; the chunk payload is the
/// variable tail (spec.md §6: "FwChunk header, 12 + data"). 12 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FwChunkHeader {
    /// Identifier of the image this chunk belongs to.
    pub image_id: u32,
    /// Zero-based index of this chunk.
    pub chunk_index: u16,
    /// Length in bytes of the chunk data that follows this header.
    pub data_len: u16,
    /// CRC-16-CCITT over the chunk data.
    pub crc16: u16,
}

/// Wire size of [`FwChunkHeader`].
pub const FW_CHUNK_HEADER_LEN: usize = 12;

impl FwChunkHeader {
    /// Serialize to the 12-byte wire representation.
    #[must_use]
    pub fn to_bytes(self) -> [u8; FW_CHUNK_HEADER_LEN] {
        let mut out = [0u8; FW_CHUNK_HEADER_LEN];
        out[0..4].copy_from_slice(&self.image_id.to_le_bytes());
        out[4..6].copy_from_slice(&self.chunk_index.to_le_bytes());
        out[6..8].copy_from_slice(&self.data_len.to_le_bytes());
        out[8..10].copy_from_slice(&self.crc16.to_le_bytes());
        out
    }

    /// Parse from at least [`FW_CHUNK_HEADER_LEN`] bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < FW_CHUNK_HEADER_LEN {
            return Err(too_short(Opcode::FwChunk, bytes.len(), FW_CHUNK_HEADER_LEN));
        }
        Ok(Self {
            image_id: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            chunk_index: u16::from_le_bytes([bytes[4], bytes[5]]),
            data_len: u16::from_le_bytes([bytes[6], bytes[7]]),
            crc16: u16::from_le_bytes([bytes[8], bytes[9]]),
        })
    }
}

/// Firmware progress/result report (spec.md §4.9). 16 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FwStatus {
    /// Identifier of the image this status concerns.
    pub image_id: u32,
    /// Current `FirmwareState` as its wire byte.
    pub state: u8,
    /// Last error code (0 = none).
    pub last_error: u8,
    /// Next chunk index the node needs, used by the controller to drive
    /// retransmission.
    pub next_needed: u16,
    /// Total bytes received and accepted so far.
    pub received_bytes: u32,
}

/// Wire size of [`FwStatus`].
pub const FW_STATUS_LEN: usize = 16;

impl FwStatus {
    /// Serialize to the 16-byte wire representation.
    #[must_use]
    pub fn to_bytes(self) -> [u8; FW_STATUS_LEN] {
        let mut out = [0u8; FW_STATUS_LEN];
        out[0..4].copy_from_slice(&self.image_id.to_le_bytes());
        out[4] = self.state;
        out[5] = self.last_error;
        out[6..8].copy_from_slice(&self.next_needed.to_le_bytes());
        out[8..12].copy_from_slice(&self.received_bytes.to_le_bytes());
        out
    }

    /// Parse from at least [`FW_STATUS_LEN`] bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < FW_STATUS_LEN {
            return Err(too_short(Opcode::FwStatus, bytes.len(), FW_STATUS_LEN));
        }
        Ok(Self {
            image_id: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            state: bytes[4],
            last_error: bytes[5],
            next_needed: u16::from_le_bytes([bytes[6], bytes[7]]),
            received_bytes: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
        })
    }
}

/// Fixed header of a firmware commit request; the signature is the
/// variable tail (spec.md §6: "FwCommit header, 8 + signature"). 8 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FwCommitHeader {
    /// Identifier of the image being committed.
    pub image_id: u32,
    /// Signature algorithm used for `signature`.
    pub sig_algo: u8,
    /// `1` to apply at next boot, `0` to verify only.
    pub apply_at_boot: u8,
    /// Length in bytes of the signature that follows this header.
    pub sig_len: u16,
}

/// Wire size of [`FwCommitHeader`].
pub const FW_COMMIT_HEADER_LEN: usize = 8;

impl FwCommitHeader {
    /// Serialize to the 8-byte wire representation.
    #[must_use]
    pub fn to_bytes(self) -> [u8; FW_COMMIT_HEADER_LEN] {
        let mut out = [0u8; FW_COMMIT_HEADER_LEN];
        out[0..4].copy_from_slice(&self.image_id.to_le_bytes());
        out[4] = self.sig_algo;
        out[5] = self.apply_at_boot;
        out[6..8].copy_from_slice(&self.sig_len.to_le_bytes());
        out
    }

    /// Parse from at least [`FW_COMMIT_HEADER_LEN`] bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < FW_COMMIT_HEADER_LEN {
            return Err(too_short(
                Opcode::FwCommit,
                bytes.len(),
                FW_COMMIT_HEADER_LEN,
            ));
        }
        Ok(Self {
            image_id: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            sig_algo: bytes[4],
            apply_at_boot: bytes[5],
            sig_len: u16::from_le_bytes([bytes[6], bytes[7]]),
        })
    }
}

/// Abort a firmware transfer (spec.md §4.9). 8 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FwAbortPayload {
    /// Identifier of the image being aborted.
    pub image_id: u32,
    /// Reason code, one of `FwErrorCode`'s wire values.
    pub reason: u8,
}

/// Wire size of [`FwAbortPayload`].
pub const FW_ABORT_LEN: usize = 8;

impl FwAbortPayload {
    /// Serialize to the 8-byte wire representation.
    #[must_use]
    pub fn to_bytes(self) -> [u8; FW_ABORT_LEN] {
        let mut out = [0u8; FW_ABORT_LEN];
        out[0..4].copy_from_slice(&self.image_id.to_le_bytes());
        out[4] = self.reason;
        out
    }

    /// Parse from at least [`FW_ABORT_LEN`] bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < FW_ABORT_LEN {
            return Err(too_short(Opcode::FwAbort, bytes.len(), FW_ABORT_LEN));
        }
        Ok(Self {
            image_id: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            reason: bytes[4],
        })
    }
}
