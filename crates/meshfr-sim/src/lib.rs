//! Deterministic multi-node simulation harness for the hardened v2H mesh
//! protocol.
//!
//! Everything here is synchronous: unlike `meshfr-core`'s teacher
//! ancestor, `meshfr_core::runtime::Core` has no async surface (spec.md
//! §5: a single-threaded cooperative loop driven by an inbound callback
//! and a periodic `tick`), so this harness drives multiple `Core`
//! instances by hand rather than through an async executor. [`Ether`]
//! is the shared medium, [`clock::DeterministicEnv`] the shared clock
//! and RNG, and [`recording::RecordingAdapter`] a [`meshfr_core::RoleAdapter`]
//! that records every callback for assertions.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod clock;
pub mod ether;
pub mod recording;

pub use clock::DeterministicEnv;
pub use ether::{Ether, EtherRadio};
pub use recording::RecordingAdapter;
