//! Round-trip properties for the wire codec (spec.md §8 property 1).

use meshfr_wire::flags::FrameFlags;
use meshfr_wire::header::{Header, VIRT_ID_PHYSICAL};
use meshfr_wire::opcode::Opcode;
use meshfr_wire::trailer::Trailer;
use meshfr_wire::{encode, DecodedFrame, FrameParts};
use proptest::prelude::*;

fn authenticated_opcode() -> impl Strategy<Value = Opcode> {
    prop_oneof![
        Just(Opcode::Ping),
        Just(Opcode::PingReply),
        Just(Opcode::CtrlRelay),
        Just(Opcode::SensReport),
        Just(Opcode::RlyState),
        Just(Opcode::PmsStatus),
        Just(Opcode::TimeSync),
        Just(Opcode::NetSetChan),
        Just(Opcode::FwAbort),
    ]
}

proptest! {
    #[test]
    fn round_trip_is_identity(
        opcode in authenticated_opcode(),
        topo_present in any::<bool>(),
        seq in any::<u16>(),
        topo_ver in any::<u16>(),
        ts_ms in any::<u64>(),
        sender_mac in any::<[u8; 6]>(),
        sender_role in any::<u8>(),
        admission in any::<[u8; 16]>(),
        topo_token in any::<[u8; 16]>(),
        payload in prop::collection::vec(any::<u8>(), 0..40),
        nonce in any::<[u8; 6]>(),
        tag in any::<[u8; 12]>(),
    ) {
        let header = Header {
            opcode,
            flags: FrameFlags::default().with_topology_token_present(topo_present),
            seq,
            topo_ver,
            virt_id: VIRT_ID_PHYSICAL,
            ts_ms: ts_ms & 0x0000_FFFF_FFFF_FFFF,
            sender_mac,
            sender_role,
        };
        let parts = FrameParts {
            header,
            admission_token: Some(admission),
            topology_token: if topo_present { Some(topo_token) } else { None },
            payload: &payload,
            trailer: Some(Trailer { nonce, tag }),
        };
        let bytes = match encode(&parts) {
            Ok(bytes) => bytes,
            Err(_) => return Ok(()), // oversized combination, not under test here
        };
        let decoded = DecodedFrame::parse(&bytes).unwrap();
        prop_assert_eq!(decoded.header.opcode().unwrap(), opcode);
        prop_assert_eq!(decoded.header.seq(), header.seq);
        prop_assert_eq!(decoded.admission_token, Some(&admission));
        prop_assert_eq!(decoded.payload, payload.as_slice());
        prop_assert_eq!(decoded.trailer, Some(Trailer { nonce, tag }));
        if topo_present {
            prop_assert_eq!(decoded.topology_token, Some(&topo_token));
        } else {
            prop_assert_eq!(decoded.topology_token, None);
        }
    }

    #[test]
    fn pair_request_never_carries_tokens_or_trailer(
        payload in prop::collection::vec(any::<u8>(), 0..8),
    ) {
        let header = Header {
            opcode: Opcode::PairRequest,
            flags: FrameFlags::default(),
            seq: 0,
            topo_ver: 0,
            virt_id: VIRT_ID_PHYSICAL,
            ts_ms: 0,
            sender_mac: [0; 6],
            sender_role: 0,
        };
        let parts = FrameParts {
            header,
            admission_token: None,
            topology_token: None,
            payload: &payload,
            trailer: None,
        };
        let bytes = encode(&parts).unwrap();
        let decoded = DecodedFrame::parse(&bytes).unwrap();
        prop_assert!(decoded.admission_token.is_none());
        prop_assert!(decoded.trailer.is_none());
        prop_assert_eq!(decoded.payload, payload.as_slice());
    }
}
