//! Fixed-size (and fixed-header, variable-tail) payload structures.
//!
//! Each payload type owns its own `encode`/`decode`; the opcode carried in
//! the frame header is what tells a caller which payload type to use, so
//! (unlike a self-describing format) no payload carries its own opcode.

pub mod config;
pub mod control;
pub mod firmware;
pub mod misc;
pub mod pairing;
pub mod reports;
pub mod topology;

pub use config::ConfigWriteHeader;
pub use control::{CtrlRelay, NetSetChan, RlyState};
pub use firmware::{FwAbortPayload, FwBegin, FwChunkHeader, FwCommitHeader, FwStatus, SigAlgo};
pub use misc::{Ping, PingReply, TimeSync};
pub use pairing::PairAck;
pub use reports::{PmsStatus, SensReport, TfPairSample};
pub use topology::TopoPushHeader;
