//! Firmware update state machine (spec.md §4.9).

use meshfr_crypto::{SignatureAlgorithm, SignatureVerifier};
use meshfr_wire::payloads::{FwAbortPayload, FwBegin, FwChunkHeader, FwCommitHeader, FwStatus, SigAlgo};

use crate::role::DeviceRole;

const CRC16_CCITT: crc::Crc<u16> = crc::Crc::<u16>::new(&crc::CRC_16_IBM_3740);

fn crc16_ccitt(data: &[u8]) -> u16 {
    CRC16_CCITT.checksum(data)
}

/// Largest image a node's flash partition can hold (1 MiB). `FwBegin`
/// advertises `total_size` before a single chunk arrives, so this is
/// checked up front rather than discovered mid-transfer.
const MAX_IMAGE_SIZE: u32 = 1024 * 1024;

/// Reasons a firmware session can abort (spec.md §4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FwErrorCode {
    /// No error.
    None = 0,
    /// The controller (or operator) aborted the session deliberately.
    OperatorAbort = 1,
    /// The image does not target this node's role.
    RoleMismatch = 2,
    /// Not enough space to hold the image.
    OutOfSpace = 4,
    /// A chunk's CRC did not match.
    CrcMismatch = 5,
    /// The completed image's SHA-256 did not match the declared digest.
    DigestMismatch = 6,
    /// The commit signature failed verification.
    SignatureInvalid = 7,
    /// An internal invariant was violated.
    Internal = 8,
}

impl FwErrorCode {
    /// Wire byte for `FwStatus.last_error` / `FwAbortPayload.reason`.
    #[must_use]
    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

/// Parameters fixed for the lifetime of one transfer, installed by
/// `FwBegin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionParams {
    /// The image identifier from `FwBegin`.
    pub image_id: u32,
    /// The device role this image targets.
    pub target_role: DeviceRole,
    /// The commit signature algorithm declared for this image.
    pub sig_algo: SigAlgo,
    /// Total image size in bytes.
    pub total_size: u32,
    /// Size of each chunk in bytes.
    pub chunk_size: u16,
    /// Total number of chunks in the image.
    pub total_chunks: u16,
    /// Maximum number of out-of-order chunks held ahead of the cursor.
    pub window_size: u16,
    /// The expected SHA-256 digest of the completed image.
    pub expected_sha256: [u8; 32],
}

/// One accumulated chunk, as received.
#[derive(Debug, Clone)]
pub struct ReceivedChunk {
    /// The chunk's index within the image.
    pub index: u16,
    /// The chunk's payload bytes.
    pub data: Vec<u8>,
}

/// The firmware session, as a total state machine (REDESIGN FLAG: module-
/// scope firmware state becomes an enum, transitions total).
#[derive(Debug, Clone)]
pub enum FirmwareSession {
    /// No transfer in progress.
    Idle,
    /// Accepting chunks; `cursor` is the next contiguous chunk index
    /// expected, `window` holds chunks received ahead of the cursor.
    Receiving {
        /// Parameters fixed for this transfer.
        params: SessionParams,
        /// Next contiguous chunk index expected.
        cursor: u16,
        /// Chunks received ahead of the cursor.
        window: Vec<ReceivedChunk>,
        /// Bytes received and committed past the cursor so far.
        received_bytes: u32,
    },
    /// All chunks received; awaiting commit.
    Ready {
        /// Parameters fixed for this transfer.
        params: SessionParams,
        /// The fully assembled image.
        image: Vec<u8>,
    },
    /// Digest and signature verified; installing the image before
    /// reporting success (spec.md §4.9: "Applying").
    Applying {
        /// The image identifier being applied.
        image_id: u32,
    },
    /// Installed with `apply_at_boot = 1`; the host should reboot into
    /// the new image on its next tick.
    Rebooting {
        /// The image identifier that was installed.
        image_id: u32,
    },
    /// A terminal error state; the next `FwBegin` restarts from `Idle`.
    Error {
        /// The image identifier the session was processing.
        image_id: u32,
        /// Why the session aborted.
        reason: FwErrorCode,
    },
}

/// What the driver should do after advancing the session.
#[derive(Debug, Clone)]
pub enum FirmwareAction {
    /// Send this status to the controller.
    SendStatus(FwStatus),
    /// Send this abort to the controller.
    SendAbort(FwAbortPayload),
    /// The signature verified and `apply_at_boot` was set: schedule a
    /// reboot into the new image.
    ScheduleReboot,
    /// Nothing to do (e.g. a duplicate or out-of-window chunk was
    /// silently ignored).
    None,
}

impl FirmwareSession {
    /// A session with nothing in progress.
    #[must_use]
    pub fn idle() -> Self {
        Self::Idle
    }

    fn image_id(&self) -> Option<u32> {
        match self {
            Self::Idle => None,
            Self::Receiving { params, .. } | Self::Ready { params, .. } => Some(params.image_id),
            Self::Applying { image_id } | Self::Rebooting { image_id } | Self::Error { image_id, .. } => {
                Some(*image_id)
            }
        }
    }

    /// Idle + FwBegin → Receiving (or Error on role mismatch).
    pub fn on_begin(&mut self, begin: FwBegin, this_role: DeviceRole) -> FirmwareAction {
        let Some(target_role) = DeviceRole::from_byte(begin.target_role) else {
            *self = Self::Error { image_id: begin.image_id, reason: FwErrorCode::RoleMismatch };
            return FirmwareAction::SendAbort(FwAbortPayload {
                image_id: begin.image_id,
                reason: FwErrorCode::RoleMismatch.to_byte(),
            });
        };
        if target_role != this_role {
            *self = Self::Error { image_id: begin.image_id, reason: FwErrorCode::RoleMismatch };
            return FirmwareAction::SendAbort(FwAbortPayload {
                image_id: begin.image_id,
                reason: FwErrorCode::RoleMismatch.to_byte(),
            });
        }
        let Ok(sig_algo) = SigAlgo::from_byte(begin.sig_algo) else {
            *self = Self::Error { image_id: begin.image_id, reason: FwErrorCode::Internal };
            return FirmwareAction::SendAbort(FwAbortPayload {
                image_id: begin.image_id,
                reason: FwErrorCode::Internal.to_byte(),
            });
        };
        if begin.total_size > MAX_IMAGE_SIZE {
            *self = Self::Error { image_id: begin.image_id, reason: FwErrorCode::OutOfSpace };
            return FirmwareAction::SendAbort(FwAbortPayload {
                image_id: begin.image_id,
                reason: FwErrorCode::OutOfSpace.to_byte(),
            });
        }
        let params = SessionParams {
            image_id: begin.image_id,
            target_role,
            sig_algo,
            total_size: begin.total_size,
            chunk_size: begin.chunk_size,
            total_chunks: begin.total_chunks,
            window_size: begin.window_size,
            expected_sha256: begin.sha256,
        };
        *self = Self::Receiving { params, cursor: 0, window: Vec::new(), received_bytes: 0 };
        FirmwareAction::SendStatus(FwStatus {
            image_id: params.image_id,
            state: wire_state(&Self::Receiving {
                params,
                cursor: 0,
                window: Vec::new(),
                received_bytes: 0,
            }),
            last_error: FwErrorCode::None.to_byte(),
            next_needed: 0,
            received_bytes: 0,
        })
    }

    /// Receiving + FwChunk: validate, insert into the window, advance the
    /// cursor when contiguous.
    pub fn on_chunk(&mut self, header: FwChunkHeader, data: &[u8]) -> FirmwareAction {
        let Self::Receiving { params, cursor, window, received_bytes } = self else {
            return FirmwareAction::None;
        };
        if header.image_id != params.image_id {
            return FirmwareAction::None;
        }
        if header.chunk_index >= params.total_chunks || header.data_len as usize != data.len() {
            return FirmwareAction::None;
        }
        if data.len() > params.chunk_size as usize {
            return FirmwareAction::None;
        }
        if header.chunk_index < *cursor || window.iter().any(|c| c.index == header.chunk_index) {
            return FirmwareAction::None;
        }
        if window.len() >= params.window_size as usize {
            return FirmwareAction::None;
        }
        if crc16_ccitt(data) != header.crc16 {
            // still `Receiving` here; matches wire_state's Receiving arm.
            let state = 1;
            return FirmwareAction::SendStatus(FwStatus {
                image_id: params.image_id,
                state,
                last_error: FwErrorCode::CrcMismatch.to_byte(),
                next_needed: *cursor,
                received_bytes: *received_bytes,
            });
        }

        window.push(ReceivedChunk { index: header.chunk_index, data: data.to_vec() });

        while let Some(pos) = window.iter().position(|c| c.index == *cursor) {
            let chunk = window.remove(pos);
            *received_bytes += chunk.data.len() as u32;
            *cursor += 1;
        }

        let params = *params;
        let cursor_now = *cursor;
        let received_bytes_now = *received_bytes;

        if cursor_now == params.total_chunks {
            let mut image = Vec::with_capacity(params.total_size as usize);
            if let Self::Receiving { window, .. } = self {
                window.sort_by_key(|c| c.index);
                for c in window.drain(..) {
                    image.extend_from_slice(&c.data);
                }
            }
            let status = FwStatus {
                image_id: params.image_id,
                state: wire_state(&Self::Ready { params, image: Vec::new() }),
                last_error: FwErrorCode::None.to_byte(),
                next_needed: cursor_now,
                received_bytes: received_bytes_now,
            };
            *self = Self::Ready { params, image };
            return FirmwareAction::SendStatus(status);
        }

        FirmwareAction::SendStatus(FwStatus {
            image_id: params.image_id,
            state: wire_state(self),
            last_error: FwErrorCode::None.to_byte(),
            next_needed: cursor_now,
            received_bytes: received_bytes_now,
        })
    }

    /// Ready + FwCommit: verify digest and signature, drive through
    /// Applying to Rebooting (apply-at-boot) or back to Idle, or abort
    /// into Error. Returns every status the transition produces, in
    /// order, so the controller observes each intermediate state
    /// (spec.md §4.9, §8 S5: "state=Applying, then Rebooting").
    pub fn on_commit(
        &mut self,
        header: FwCommitHeader,
        signature: &[u8],
        verifier: &impl SignatureVerifier,
    ) -> Vec<FirmwareAction> {
        let Self::Ready { params, image } = self else {
            return vec![FirmwareAction::None];
        };
        if header.image_id != params.image_id {
            return vec![FirmwareAction::None];
        }

        let digest: [u8; 32] = {
            use sha2::Digest as _;
            sha2::Sha256::digest(&image[..]).into()
        };
        if digest != params.expected_sha256 {
            let image_id = params.image_id;
            *self = Self::Error { image_id, reason: FwErrorCode::DigestMismatch };
            return vec![FirmwareAction::SendAbort(FwAbortPayload {
                image_id,
                reason: FwErrorCode::DigestMismatch.to_byte(),
            })];
        }

        let algo = match params.sig_algo {
            SigAlgo::Ed25519 => SignatureAlgorithm::Ed25519,
            SigAlgo::EcdsaP256 => SignatureAlgorithm::EcdsaP256,
        };
        if verifier.verify(algo, &digest, signature).is_err() {
            let image_id = params.image_id;
            *self = Self::Error { image_id, reason: FwErrorCode::SignatureInvalid };
            return vec![FirmwareAction::SendAbort(FwAbortPayload {
                image_id,
                reason: FwErrorCode::SignatureInvalid.to_byte(),
            })];
        }

        let image_id = params.image_id;
        *self = Self::Applying { image_id };
        let applying_status = FwStatus {
            image_id,
            state: wire_state(&Self::Applying { image_id }),
            last_error: FwErrorCode::None.to_byte(),
            next_needed: 0,
            received_bytes: 0,
        };

        if header.apply_at_boot == 1 {
            *self = Self::Rebooting { image_id };
            let rebooting_status = FwStatus {
                image_id,
                state: wire_state(&Self::Rebooting { image_id }),
                last_error: FwErrorCode::None.to_byte(),
                next_needed: 0,
                received_bytes: 0,
            };
            vec![
                FirmwareAction::SendStatus(applying_status),
                FirmwareAction::SendStatus(rebooting_status),
                FirmwareAction::ScheduleReboot,
            ]
        } else {
            *self = Self::Idle;
            let idle_status = FwStatus {
                image_id,
                state: wire_state(&Self::Idle),
                last_error: FwErrorCode::None.to_byte(),
                next_needed: 0,
                received_bytes: 0,
            };
            vec![FirmwareAction::SendStatus(applying_status), FirmwareAction::SendStatus(idle_status)]
        }
    }

    /// Any state + FwAbort → Idle.
    pub fn on_abort(&mut self, payload: FwAbortPayload) -> FirmwareAction {
        if self.image_id() != Some(payload.image_id) && !matches!(self, Self::Idle) {
            return FirmwareAction::None;
        }
        *self = Self::Idle;
        FirmwareAction::SendStatus(FwStatus {
            image_id: payload.image_id,
            state: wire_state(&Self::Idle),
            last_error: payload.reason,
            next_needed: 0,
            received_bytes: 0,
        })
    }
}

fn wire_state(session: &FirmwareSession) -> u8 {
    match session {
        FirmwareSession::Idle => 0,
        FirmwareSession::Receiving { .. } => 1,
        FirmwareSession::Ready { .. } => 2,
        // 3 is reserved for spec.md §4.9's "Verifying", which this core
        // performs synchronously inside `on_commit` rather than modeling
        // as its own observable session state.
        FirmwareSession::Applying { .. } => 4,
        FirmwareSession::Rebooting { .. } => 5,
        FirmwareSession::Error { .. } => 6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshfr_crypto::CryptoError;

    struct AcceptAll;
    impl SignatureVerifier for AcceptAll {
        fn verify(&self, _algo: SignatureAlgorithm, _digest: &[u8; 32], _sig: &[u8]) -> Result<(), CryptoError> {
            Ok(())
        }
    }

    struct RejectAll;
    impl SignatureVerifier for RejectAll {
        fn verify(&self, _algo: SignatureAlgorithm, _digest: &[u8; 32], _sig: &[u8]) -> Result<(), CryptoError> {
            Err(CryptoError::SignatureInvalid)
        }
    }

    fn begin(image_id: u32, total_chunks: u16, chunk_size: u16, sha256: [u8; 32]) -> FwBegin {
        FwBegin {
            image_id,
            target_role: DeviceRole::Relay.to_byte(),
            sig_algo: 0,
            total_size: u32::from(total_chunks) * u32::from(chunk_size),
            chunk_size,
            total_chunks,
            window_size: 4,
            sha256,
        }
    }

    #[test]
    fn role_mismatch_aborts() {
        let mut session = FirmwareSession::idle();
        let b = begin(1, 1, 1, [0; 32]);
        let action = session.on_begin(b, DeviceRole::Sensor);
        assert!(matches!(action, FirmwareAction::SendAbort(_)));
        assert!(matches!(session, FirmwareSession::Error { reason: FwErrorCode::RoleMismatch, .. }));
    }

    #[test]
    fn scenario_s5_happy_path() {
        let data: Vec<u8> = (0u8..8).collect();
        let sha256: [u8; 32] = {
            use sha2::Digest as _;
            sha2::Sha256::digest(&data).into()
        };
        let mut session = FirmwareSession::idle();
        session.on_begin(begin(0xA, 8, 1, sha256), DeviceRole::Relay);

        for (i, byte) in data.iter().enumerate() {
            let chunk = [*byte];
            let header = FwChunkHeader {
                image_id: 0xA,
                chunk_index: i as u16,
                data_len: 1,
                crc16: crc16_ccitt(&chunk),
            };
            let action = session.on_chunk(header, &chunk);
            if i < 7 {
                assert!(matches!(action, FirmwareAction::SendStatus(s) if s.next_needed == i as u16 + 1));
            } else {
                assert!(matches!(action, FirmwareAction::SendStatus(s) if s.state == 2));
            }
        }
        assert!(matches!(session, FirmwareSession::Ready { .. }));

        let commit =
            FwCommitHeader { image_id: 0xA, sig_algo: 0, apply_at_boot: 1, sig_len: 64 };
        let actions = session.on_commit(commit, &[0u8; 64], &AcceptAll);
        assert!(matches!(&actions[0], FirmwareAction::SendStatus(s) if s.state == 4)); // Applying
        assert!(matches!(&actions[1], FirmwareAction::SendStatus(s) if s.state == 5)); // Rebooting
        assert!(matches!(actions[2], FirmwareAction::ScheduleReboot));
        assert!(matches!(session, FirmwareSession::Rebooting { image_id: 0xA }));
    }

    #[test]
    fn commit_without_apply_at_boot_returns_to_idle_through_applying() {
        let data = [3u8];
        let sha256: [u8; 32] = {
            use sha2::Digest as _;
            sha2::Sha256::digest(data).into()
        };
        let mut session = FirmwareSession::idle();
        session.on_begin(begin(0xA, 1, 1, sha256), DeviceRole::Relay);
        let header = FwChunkHeader { image_id: 0xA, chunk_index: 0, data_len: 1, crc16: crc16_ccitt(&data) };
        session.on_chunk(header, &data);

        let commit = FwCommitHeader { image_id: 0xA, sig_algo: 0, apply_at_boot: 0, sig_len: 0 };
        let actions = session.on_commit(commit, &[], &AcceptAll);
        assert!(matches!(&actions[0], FirmwareAction::SendStatus(s) if s.state == 4)); // Applying
        assert!(matches!(&actions[1], FirmwareAction::SendStatus(s) if s.state == 0)); // Idle
        assert!(matches!(session, FirmwareSession::Idle));
    }

    #[test]
    fn scenario_s6_crc_mismatch_does_not_advance_cursor() {
        let mut session = FirmwareSession::idle();
        session.on_begin(begin(0xA, 4, 1, [0; 32]), DeviceRole::Relay);
        let bad_header = FwChunkHeader { image_id: 0xA, chunk_index: 0, data_len: 1, crc16: 0xFFFF };
        let action = session.on_chunk(bad_header, &[0xAB]);
        assert!(matches!(action, FirmwareAction::SendStatus(s) if s.last_error == FwErrorCode::CrcMismatch.to_byte() && s.next_needed == 0));
    }

    #[test]
    fn digest_mismatch_aborts_without_applying() {
        let mut session = FirmwareSession::idle();
        session.on_begin(begin(0xA, 1, 1, [0xFF; 32]), DeviceRole::Relay);
        let header = FwChunkHeader { image_id: 0xA, chunk_index: 0, data_len: 1, crc16: crc16_ccitt(&[1]) };
        session.on_chunk(header, &[1]);
        let commit = FwCommitHeader { image_id: 0xA, sig_algo: 0, apply_at_boot: 1, sig_len: 0 };
        let actions = session.on_commit(commit, &[], &AcceptAll);
        assert!(matches!(&actions[0], FirmwareAction::SendAbort(a) if a.reason == FwErrorCode::DigestMismatch.to_byte()));
        assert_eq!(actions.len(), 1);
    }

    #[test]
    fn signature_failure_aborts() {
        let data = [7u8];
        let sha256: [u8; 32] = {
            use sha2::Digest as _;
            sha2::Sha256::digest(data).into()
        };
        let mut session = FirmwareSession::idle();
        session.on_begin(begin(0xA, 1, 1, sha256), DeviceRole::Relay);
        let header = FwChunkHeader { image_id: 0xA, chunk_index: 0, data_len: 1, crc16: crc16_ccitt(&data) };
        session.on_chunk(header, &data);
        let commit = FwCommitHeader { image_id: 0xA, sig_algo: 0, apply_at_boot: 1, sig_len: 0 };
        let actions = session.on_commit(commit, &[], &RejectAll);
        assert!(matches!(&actions[0], FirmwareAction::SendAbort(a) if a.reason == FwErrorCode::SignatureInvalid.to_byte()));
        assert_eq!(actions.len(), 1);
    }

    #[test]
    fn abort_returns_to_idle_from_any_state() {
        let mut session = FirmwareSession::idle();
        session.on_begin(begin(0xA, 4, 1, [0; 32]), DeviceRole::Relay);
        let action = session.on_abort(FwAbortPayload { image_id: 0xA, reason: FwErrorCode::OperatorAbort.to_byte() });
        assert!(matches!(action, FirmwareAction::SendStatus(s) if s.state == 0));
        assert!(matches!(session, FirmwareSession::Idle));
    }

    #[test]
    fn unknown_image_id_chunk_is_silently_dropped() {
        let mut session = FirmwareSession::idle();
        session.on_begin(begin(0xA, 4, 1, [0; 32]), DeviceRole::Relay);
        let header = FwChunkHeader { image_id: 0xB, chunk_index: 0, data_len: 1, crc16: 0 };
        let action = session.on_chunk(header, &[0]);
        assert!(matches!(action, FirmwareAction::None));
    }

    #[test]
    fn begin_over_capacity_aborts_without_entering_receiving() {
        let mut session = FirmwareSession::idle();
        let mut b = begin(0xA, 1, 1, [0; 32]);
        b.total_size = MAX_IMAGE_SIZE + 1;
        let action = session.on_begin(b, DeviceRole::Relay);
        assert!(matches!(&action, FirmwareAction::SendAbort(a) if a.reason == FwErrorCode::OutOfSpace.to_byte()));
        assert!(matches!(session, FirmwareSession::Error { reason: FwErrorCode::OutOfSpace, .. }));
    }

    #[test]
    fn chunk_larger_than_negotiated_chunk_size_is_dropped() {
        let mut session = FirmwareSession::idle();
        session.on_begin(begin(0xA, 4, 1, [0; 32]), DeviceRole::Relay);
        let oversized = [0xAB, 0xCD];
        let header = FwChunkHeader {
            image_id: 0xA,
            chunk_index: 0,
            data_len: oversized.len() as u16,
            crc16: crc16_ccitt(&oversized),
        };
        let action = session.on_chunk(header, &oversized);
        assert!(matches!(action, FirmwareAction::None));
    }

    #[test]
    fn window_full_of_future_chunks_drops_further_out_of_order_arrivals() {
        let mut session = FirmwareSession::idle();
        session.on_begin(begin(0xA, 8, 1, [0; 32]), DeviceRole::Relay);
        // window_size is 4 (see `begin`); chunks 1..=4 fill it without ever
        // completing chunk 0, so a 5th out-of-order arrival must be dropped
        // rather than growing the window unboundedly.
        for index in 1..=4u16 {
            let chunk = [index as u8];
            let header =
                FwChunkHeader { image_id: 0xA, chunk_index: index, data_len: 1, crc16: crc16_ccitt(&chunk) };
            session.on_chunk(header, &chunk);
        }
        let chunk = [5u8];
        let header = FwChunkHeader { image_id: 0xA, chunk_index: 5, data_len: 1, crc16: crc16_ccitt(&chunk) };
        let action = session.on_chunk(header, &chunk);
        assert!(matches!(action, FirmwareAction::None));
        if let FirmwareSession::Receiving { window, .. } = &session {
            assert_eq!(window.len(), 4);
        } else {
            panic!("session should still be Receiving");
        }
    }
}
