//! In-node runtime for the hardened v2H mesh protocol.
//!
//! This crate consumes `meshfr-wire` (frame codec) and `meshfr-crypto`
//! (HMAC/signature primitives) and drives the behavior a single node
//! needs: inbound admission/replay/privilege checks, outbound pacing,
//! the topology store, pairing, and firmware updates. [`runtime::Core`]
//! is the entry point; everything else here is a collaborator it owns
//! or a trait the host implements (`Environment`, `Radio`,
//! `Persistence`, `EventSink`).
//!
//! Nothing in this crate touches a clock, a socket, or a filesystem
//! directly — those are injected per-call so the same code runs on
//! firmware and in the simulator.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod adapter;
pub mod env;
pub mod error;
pub mod events;
pub mod firmware;
pub mod pairing;
pub mod persist;
pub mod radio;
pub mod replay;
pub mod router;
pub mod runtime;
pub mod scheduler;
pub mod role;
pub mod topology;

pub use adapter::{RoleAdapter, SenderContext};
pub use env::Environment;
pub use error::CoreError;
pub use events::{CoreEvent, EventSink, TracingEventSink};
pub use persist::{FirmwareSessionSnapshot, PersistedState, Persistence};
pub use radio::{Radio, SendResult};
pub use role::DeviceRole;
pub use router::{DeploymentSecrets, InboundRouter, RoutedFrame};
pub use runtime::Core;
