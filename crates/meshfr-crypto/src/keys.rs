//! Per-peer application key derivation (spec.md §4.2).

use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroize;

use crate::error::CryptoError;

type HmacSha256 = Hmac<Sha256>;

/// Length in bytes of the pre-shared key, per-link key, and deployment
/// salt, all fixed by the deployment.
pub const DEPLOYMENT_SECRET_LEN: usize = 16;

/// Length in bytes of a derived per-peer application key.
pub const PEER_KEY_LEN: usize = 32;

/// A derived per-peer application key. Zeroized on drop since it is
/// effectively the bearer credential for every authenticated frame to or
/// from one peer.
pub struct PeerKey([u8; PEER_KEY_LEN]);

impl PeerKey {
    /// Borrow the raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; PEER_KEY_LEN] {
        &self.0
    }
}

impl Drop for PeerKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl std::fmt::Debug for PeerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerKey").field("bytes", &"<redacted>").finish()
    }
}

/// Derive the per-peer application key:
/// `HMAC-SHA256(pre_shared_key ∥ per_link_key, device_token ∥ salt)`
/// (spec.md §4.2). The HMAC-SHA256 output is exactly 32 bytes, i.e. the
/// "truncated to 32 bytes" clause is a no-op with this primitive; it is
/// named here only because the source document states it explicitly.
pub fn derive_peer_key(
    pre_shared_key: &[u8; DEPLOYMENT_SECRET_LEN],
    per_link_key: &[u8; DEPLOYMENT_SECRET_LEN],
    device_token: &[u8; 16],
    salt: &[u8; DEPLOYMENT_SECRET_LEN],
) -> PeerKey {
    let mut hmac_key = Vec::with_capacity(DEPLOYMENT_SECRET_LEN * 2);
    hmac_key.extend_from_slice(pre_shared_key);
    hmac_key.extend_from_slice(per_link_key);

    #[allow(clippy::expect_used)]
    let mut mac = HmacSha256::new_from_slice(&hmac_key).expect("HMAC accepts keys of any length");
    mac.update(device_token);
    mac.update(salt);
    let digest = mac.finalize().into_bytes();

    let mut out = [0u8; PEER_KEY_LEN];
    out.copy_from_slice(&digest);
    PeerKey(out)
}

/// Build a [`PeerKey`] directly from raw bytes, e.g. when loading a
/// persisted key rather than deriving one. Returns
/// [`CryptoError::InvalidKeyLength`] if `bytes` is not exactly
/// [`PEER_KEY_LEN`] long.
pub fn peer_key_from_bytes(bytes: &[u8]) -> Result<PeerKey, CryptoError> {
    if bytes.len() != PEER_KEY_LEN {
        return Err(CryptoError::InvalidKeyLength {
            expected: PEER_KEY_LEN,
            got: bytes.len(),
        });
    }
    let mut out = [0u8; PEER_KEY_LEN];
    out.copy_from_slice(bytes);
    Ok(PeerKey(out))
}
