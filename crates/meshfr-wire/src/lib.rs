//! Packed binary wire codec for the hardened v2H mesh protocol.
//!
//! This crate owns frame layout only: the fixed header, the admission and
//! topology tokens, the opcode-specific payload structures, and the
//! security trailer. It has no key material and performs no
//! authentication; `meshfr-crypto` computes and verifies the HMAC tag,
//! and `meshfr-core` drives the inbound pipeline that calls into both.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod error;
pub mod flags;
pub mod frame;
pub mod header;
pub mod opcode;
pub mod payloads;
pub mod tokens;
pub mod trailer;

pub use error::{ProtocolError, HEADER_LEN, MAX_FRAME_LEN};
pub use flags::FrameFlags;
pub use frame::{encode, DecodedFrame, FrameParts};
pub use header::{Header, HeaderView, PROTOCOL_VERSION, VIRT_ID_PHYSICAL};
pub use opcode::Opcode;
pub use tokens::{AdmissionToken, TopologyToken, TOKEN_LEN, ZERO_TOKEN};
pub use trailer::{Trailer, NONCE_LEN, TAG_LEN, TRAILER_LEN};
