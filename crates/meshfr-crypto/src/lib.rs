//! Key derivation, HMAC tag authentication, and firmware signature
//! verification for the hardened v2H mesh protocol.
//!
//! ```text
//! deployment secrets (psk, per-link key, salt)
//!        │
//!        ▼  derive_peer_key(psk, link_key, device_token, salt)
//!   PeerKey (32 bytes, zeroized on drop)
//!        │
//!        ▼  compute_tag / verify_tag
//!   96-bit wire HMAC tag
//! ```
//!
//! Firmware-commit signatures are a separate, unrelated mechanism
//! ([`signature::SignatureVerifier`]): they authenticate a firmware image
//! digest against a deployment-wide key, not a per-peer one.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod error;
pub mod keys;
pub mod mac;
pub mod signature;

pub use error::CryptoError;
pub use keys::{derive_peer_key, peer_key_from_bytes, PeerKey, DEPLOYMENT_SECRET_LEN, PEER_KEY_LEN};
pub use mac::{compute_tag, verify_tag, TAG_LEN};
pub use signature::{DeploymentVerifier, SignatureAlgorithm, SignatureVerifier};
