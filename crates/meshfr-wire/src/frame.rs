//! Whole-frame encode and decode-view (spec.md §4.1).

use crate::error::{ProtocolError, HEADER_LEN, MAX_FRAME_LEN};
use crate::header::{Header, HeaderView};
use crate::tokens::{AdmissionToken, TopologyToken, TOKEN_LEN};
use crate::trailer::{Trailer, TRAILER_LEN};

/// The pieces needed to encode an outbound frame.
#[derive(Debug, Clone)]
pub struct FrameParts<'a> {
    /// Frame header. Its `flags.topology_token_present()` bit must agree
    /// with `topology_token`'s presence.
    pub header: Header,
    /// Admission token. Required for every opcode except `PairRequest`,
    /// absent for `PairRequest`.
    pub admission_token: Option<AdmissionToken>,
    /// Topology token, present only when the header flag asserts it.
    pub topology_token: Option<TopologyToken>,
    /// Opcode-specific payload bytes.
    pub payload: &'a [u8],
    /// Security trailer. Required for every opcode except `PairRequest`,
    /// absent for `PairRequest`.
    pub trailer: Option<Trailer>,
}

/// Encode `parts` into a contiguous buffer, enforcing the structural
/// contract (admission/trailer presence, flag/token agreement, MTU).
pub fn encode(parts: &FrameParts<'_>) -> Result<Vec<u8>, ProtocolError> {
    let unauthenticated = parts.header.opcode.is_unauthenticated();

    if unauthenticated {
        if parts.admission_token.is_some() {
            return Err(ProtocolError::AdmissionTruncated);
        }
        if parts.trailer.is_some() {
            return Err(ProtocolError::TrailerTruncated);
        }
    } else {
        if parts.admission_token.is_none() {
            return Err(ProtocolError::AdmissionTruncated);
        }
        if parts.trailer.is_none() {
            return Err(ProtocolError::TrailerTruncated);
        }
    }

    if parts.header.flags.topology_token_present() != parts.topology_token.is_some() {
        return Err(ProtocolError::TopologyTokenTruncated);
    }

    let mut size = HEADER_LEN + parts.payload.len();
    if parts.admission_token.is_some() {
        size += TOKEN_LEN;
    }
    if parts.topology_token.is_some() {
        size += TOKEN_LEN;
    }
    if parts.trailer.is_some() {
        size += TRAILER_LEN;
    }
    if size > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge { size });
    }

    let mut out = Vec::with_capacity(size);
    out.extend_from_slice(&parts.header.to_bytes());
    if let Some(admission) = parts.admission_token {
        out.extend_from_slice(&admission);
    }
    if let Some(topo) = parts.topology_token {
        out.extend_from_slice(&topo);
    }
    out.extend_from_slice(parts.payload);
    if let Some(trailer) = parts.trailer {
        out.extend_from_slice(&trailer.to_bytes());
    }
    Ok(out)
}

/// A validated, zero-copy view over a decoded frame's sections.
#[derive(Debug, Clone, Copy)]
pub struct DecodedFrame<'a> {
    /// Fixed header view.
    pub header: HeaderView<'a>,
    /// Admission token slice, `None` only for `PairRequest`.
    pub admission_token: Option<&'a [u8; TOKEN_LEN]>,
    /// Topology token slice, present iff the header flag asserts it.
    pub topology_token: Option<&'a [u8; TOKEN_LEN]>,
    /// Opcode-specific payload slice (fixed part plus any variable tail).
    pub payload: &'a [u8],
    /// Security trailer, `None` only for `PairRequest`.
    pub trailer: Option<Trailer>,
}

fn token_ref(bytes: &[u8]) -> &[u8; TOKEN_LEN] {
    bytes[..TOKEN_LEN].try_into().unwrap_or(&[0; TOKEN_LEN])
}

impl<'a> DecodedFrame<'a> {
    /// Parse `bytes` into a [`DecodedFrame`], per spec.md §4.1 and the
    /// first four steps of the inbound router's pipeline (§4.5).
    ///
    /// This performs only the *structural* checks the wire codec owns:
    /// header validity, admission/topology-token/trailer presence, and
    /// MTU. Payload-size-against-opcode-minimum, HMAC, replay, and
    /// privilege checks are the router's responsibility.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, ProtocolError> {
        if bytes.len() > MAX_FRAME_LEN {
            return Err(ProtocolError::FrameTooLarge { size: bytes.len() });
        }
        let header = HeaderView::parse(bytes)?;
        let opcode = header.opcode()?;
        let mut cursor = HEADER_LEN;

        let admission_token = if opcode.is_unauthenticated() {
            None
        } else {
            let end = cursor
                .checked_add(TOKEN_LEN)
                .ok_or(ProtocolError::AdmissionTruncated)?;
            if bytes.len() < end {
                return Err(ProtocolError::AdmissionTruncated);
            }
            let token = token_ref(&bytes[cursor..end]);
            cursor = end;
            Some(token)
        };

        let topology_token = if header.flags().topology_token_present() {
            let end = cursor
                .checked_add(TOKEN_LEN)
                .ok_or(ProtocolError::TopologyTokenTruncated)?;
            if bytes.len() < end {
                return Err(ProtocolError::TopologyTokenTruncated);
            }
            let token = token_ref(&bytes[cursor..end]);
            cursor = end;
            Some(token)
        } else {
            None
        };

        let trailer = if opcode.is_unauthenticated() {
            None
        } else {
            if bytes.len() < cursor || bytes.len() - cursor < TRAILER_LEN {
                return Err(ProtocolError::TrailerTruncated);
            }
            let trailer_start = bytes.len() - TRAILER_LEN;
            Some(Trailer::parse(&bytes[trailer_start..])?)
        };

        let payload_end = if trailer.is_some() {
            bytes.len() - TRAILER_LEN
        } else {
            bytes.len()
        };
        let payload = &bytes[cursor..payload_end];

        Ok(Self {
            header,
            admission_token,
            topology_token,
            payload,
            trailer,
        })
    }

    /// Bytes covered by the HMAC tag: header ∥ admission ∥ [topology] ∥
    /// payload (the nonce is appended separately by the crypto layer;
    /// spec.md §4.2).
    #[must_use]
    pub fn signed_prefix(&self, original: &'a [u8]) -> &'a [u8] {
        let trailer_len = if self.trailer.is_some() {
            TRAILER_LEN
        } else {
            0
        };
        &original[..original.len() - trailer_len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::FrameFlags;
    use crate::header::{Header, VIRT_ID_PHYSICAL};
    use crate::opcode::Opcode;

    fn base_header(opcode: Opcode, topo_present: bool) -> Header {
        Header {
            opcode,
            flags: FrameFlags::default().with_topology_token_present(topo_present),
            seq: 1,
            topo_ver: 0,
            virt_id: VIRT_ID_PHYSICAL,
            ts_ms: 1_000,
            sender_mac: [1, 2, 3, 4, 5, 6],
            sender_role: 0,
        }
    }

    #[test]
    fn authenticated_round_trip() {
        let parts = FrameParts {
            header: base_header(Opcode::Ping, false),
            admission_token: Some([9; 16]),
            topology_token: None,
            payload: &[0xAB, 0xCD],
            trailer: Some(Trailer {
                nonce: [1, 2, 3, 4, 5, 6],
                tag: [7; 12],
            }),
        };
        let bytes = encode(&parts).unwrap();
        let decoded = DecodedFrame::parse(&bytes).unwrap();
        assert_eq!(decoded.header.opcode().unwrap(), Opcode::Ping);
        assert_eq!(decoded.admission_token, Some(&[9; 16]));
        assert_eq!(decoded.topology_token, None);
        assert_eq!(decoded.payload, &[0xAB, 0xCD]);
        assert_eq!(decoded.trailer.unwrap().nonce, [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn pair_request_has_no_admission_or_trailer() {
        let parts = FrameParts {
            header: base_header(Opcode::PairRequest, false),
            admission_token: None,
            topology_token: None,
            payload: &[],
            trailer: None,
        };
        let bytes = encode(&parts).unwrap();
        let decoded = DecodedFrame::parse(&bytes).unwrap();
        assert!(decoded.admission_token.is_none());
        assert!(decoded.trailer.is_none());
        assert_eq!(bytes.len(), HEADER_LEN);
    }

    #[test]
    fn topology_token_round_trips_when_flagged() {
        let parts = FrameParts {
            header: base_header(Opcode::CtrlRelay, true),
            admission_token: Some([1; 16]),
            topology_token: Some([2; 16]),
            payload: &[0, 0, 0, 0],
            trailer: Some(Trailer {
                nonce: [0; 6],
                tag: [0; 12],
            }),
        };
        let bytes = encode(&parts).unwrap();
        let decoded = DecodedFrame::parse(&bytes).unwrap();
        assert_eq!(decoded.topology_token, Some(&[2; 16]));
    }

    #[test]
    fn rejects_missing_admission_token_for_authenticated_opcode() {
        let parts = FrameParts {
            header: base_header(Opcode::Ping, false),
            admission_token: None,
            topology_token: None,
            payload: &[],
            trailer: Some(Trailer {
                nonce: [0; 6],
                tag: [0; 12],
            }),
        };
        assert_eq!(encode(&parts), Err(ProtocolError::AdmissionTruncated));
    }

    #[test]
    fn decode_rejects_truncated_admission_token() {
        let mut bytes = vec![0u8; HEADER_LEN + 4];
        bytes[0] = crate::header::PROTOCOL_VERSION;
        bytes[1] = Opcode::Ping.to_byte();
        assert_eq!(
            DecodedFrame::parse(&bytes),
            Err(ProtocolError::AdmissionTruncated)
        );
    }

    #[test]
    fn decode_rejects_oversized_frame() {
        let bytes = vec![0u8; MAX_FRAME_LEN + 1];
        assert_eq!(
            DecodedFrame::parse(&bytes),
            Err(ProtocolError::FrameTooLarge {
                size: MAX_FRAME_LEN + 1
            })
        );
    }

    #[test]
    fn encode_rejects_oversized_frame() {
        let parts = FrameParts {
            header: base_header(Opcode::FwChunk, false),
            admission_token: Some([0; 16]),
            topology_token: None,
            payload: &[0u8; 250],
            trailer: Some(Trailer {
                nonce: [0; 6],
                tag: [0; 12],
            }),
        };
        assert!(matches!(
            encode(&parts),
            Err(ProtocolError::FrameTooLarge { .. })
        ));
    }
}
