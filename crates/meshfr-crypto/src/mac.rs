//! HMAC tag computation and constant-time verification (spec.md §4.2).

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::CryptoError;
use crate::keys::PeerKey;

type HmacSha256 = Hmac<Sha256>;

/// Length in bytes of the wire HMAC tag (`NOW_HMAC_TAG_LEN`): the
/// 256-bit HMAC-SHA256 output truncated to 96 bits.
pub const TAG_LEN: usize = 12;

/// Compute the wire tag over `header ∥ admission_token ∥ [topology_token]
/// ∥ payload ∥ nonce` (spec.md §4.2). `signed_prefix` must already be that
/// concatenation up to and excluding the nonce; `nonce` is appended here.
#[must_use]
pub fn compute_tag(key: &PeerKey, signed_prefix: &[u8], nonce: &[u8]) -> [u8; TAG_LEN] {
    #[allow(clippy::expect_used)]
    let mut mac =
        HmacSha256::new_from_slice(key.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(signed_prefix);
    mac.update(nonce);
    let digest = mac.finalize().into_bytes();
    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(&digest[..TAG_LEN]);
    tag
}

/// Recompute the tag and compare against `candidate` in constant time.
/// Returns [`CryptoError::TagMismatch`] on any mismatch, including a
/// truncated candidate.
pub fn verify_tag(
    key: &PeerKey,
    signed_prefix: &[u8],
    nonce: &[u8],
    candidate: &[u8; TAG_LEN],
) -> Result<(), CryptoError> {
    let expected = compute_tag(key, signed_prefix, nonce);
    if expected.ct_eq(candidate).into() {
        Ok(())
    } else {
        Err(CryptoError::TagMismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{derive_peer_key, DEPLOYMENT_SECRET_LEN};

    fn test_key() -> PeerKey {
        derive_peer_key(
            &[1u8; DEPLOYMENT_SECRET_LEN],
            &[2u8; DEPLOYMENT_SECRET_LEN],
            &[3u8; 16],
            &[4u8; DEPLOYMENT_SECRET_LEN],
        )
    }

    #[test]
    fn verify_accepts_matching_tag() {
        let key = test_key();
        let prefix = b"header+admission+payload";
        let nonce = [9u8; 6];
        let tag = compute_tag(&key, prefix, &nonce);
        assert!(verify_tag(&key, prefix, &nonce, &tag).is_ok());
    }

    #[test]
    fn verify_rejects_single_bit_flip() {
        let key = test_key();
        let prefix = b"header+admission+payload";
        let nonce = [9u8; 6];
        let mut tag = compute_tag(&key, prefix, &nonce);
        tag[0] ^= 0x01;
        assert_eq!(
            verify_tag(&key, prefix, &nonce, &tag),
            Err(CryptoError::TagMismatch)
        );
    }

    #[test]
    fn verify_rejects_wrong_key() {
        let key = test_key();
        let other_key = derive_peer_key(
            &[1u8; DEPLOYMENT_SECRET_LEN],
            &[2u8; DEPLOYMENT_SECRET_LEN],
            &[0xFFu8; 16],
            &[4u8; DEPLOYMENT_SECRET_LEN],
        );
        let prefix = b"header+admission+payload";
        let nonce = [9u8; 6];
        let tag = compute_tag(&key, prefix, &nonce);
        assert_eq!(
            verify_tag(&other_key, prefix, &nonce, &tag),
            Err(CryptoError::TagMismatch)
        );
    }

    #[test]
    fn different_nonce_changes_tag() {
        let key = test_key();
        let prefix = b"header+admission+payload";
        let tag_a = compute_tag(&key, prefix, &[1u8; 6]);
        let tag_b = compute_tag(&key, prefix, &[2u8; 6]);
        assert_ne!(tag_a, tag_b);
    }
}
