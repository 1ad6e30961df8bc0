//! Firmware-commit signature verification (spec.md §4.9).
//!
//! The deployment verification key(s) are assumed provisioned out of
//! band (spec.md §9 Open Question); this crate only verifies, it never
//! issues or distributes keys.

use ed25519_dalek::Verifier as _;

use crate::error::CryptoError;

/// Signature algorithm selectable at firmware commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// Ed25519.
    Ed25519,
    /// ECDSA over the NIST P-256 curve.
    EcdsaP256,
}

/// A collaborator capable of verifying a firmware commit signature. The
/// core calls this only at `FwCommit` (spec.md §4.9); it never calls it
/// for frame-level authentication, which uses HMAC.
pub trait SignatureVerifier {
    /// Verify `sig` over `digest` using the deployment key for `algo`.
    fn verify(
        &self,
        algo: SignatureAlgorithm,
        digest: &[u8; 32],
        sig: &[u8],
    ) -> Result<(), CryptoError>;
}

/// A [`SignatureVerifier`] backed by one statically provisioned key per
/// algorithm.
#[derive(Debug, Clone)]
pub struct DeploymentVerifier {
    ed25519_key: Option<ed25519_dalek::VerifyingKey>,
    ecdsa_p256_key: Option<p256::ecdsa::VerifyingKey>,
}

impl DeploymentVerifier {
    /// A verifier with no keys provisioned; every `verify` call fails
    /// with [`CryptoError::UnsupportedAlgorithm`].
    #[must_use]
    pub fn empty() -> Self {
        Self {
            ed25519_key: None,
            ecdsa_p256_key: None,
        }
    }

    /// Provision the Ed25519 deployment key.
    #[must_use]
    pub fn with_ed25519_key(mut self, key: ed25519_dalek::VerifyingKey) -> Self {
        self.ed25519_key = Some(key);
        self
    }

    /// Provision the ECDSA-P256 deployment key.
    #[must_use]
    pub fn with_ecdsa_p256_key(mut self, key: p256::ecdsa::VerifyingKey) -> Self {
        self.ecdsa_p256_key = Some(key);
        self
    }
}

impl SignatureVerifier for DeploymentVerifier {
    fn verify(
        &self,
        algo: SignatureAlgorithm,
        digest: &[u8; 32],
        sig: &[u8],
    ) -> Result<(), CryptoError> {
        match algo {
            SignatureAlgorithm::Ed25519 => {
                let key = self
                    .ed25519_key
                    .as_ref()
                    .ok_or(CryptoError::UnsupportedAlgorithm)?;
                let sig_bytes: &[u8; 64] =
                    sig.try_into().map_err(|_| CryptoError::MalformedSignature)?;
                let signature = ed25519_dalek::Signature::from_bytes(sig_bytes);
                key.verify(digest, &signature)
                    .map_err(|_| CryptoError::SignatureInvalid)
            }
            SignatureAlgorithm::EcdsaP256 => {
                let key = self
                    .ecdsa_p256_key
                    .as_ref()
                    .ok_or(CryptoError::UnsupportedAlgorithm)?;
                let signature = p256::ecdsa::Signature::from_slice(sig)
                    .map_err(|_| CryptoError::MalformedSignature)?;
                key.verify(digest, &signature)
                    .map_err(|_| CryptoError::SignatureInvalid)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::Signer as _;

    #[test]
    fn ed25519_round_trip() {
        let signing_key = ed25519_dalek::SigningKey::from_bytes(&[7u8; 32]);
        let verifying_key = signing_key.verifying_key();
        let digest = [9u8; 32];
        let sig = signing_key.sign(&digest);
        let verifier = DeploymentVerifier::empty().with_ed25519_key(verifying_key);
        assert!(verifier
            .verify(SignatureAlgorithm::Ed25519, &digest, &sig.to_bytes())
            .is_ok());
    }

    #[test]
    fn ed25519_rejects_tampered_digest() {
        let signing_key = ed25519_dalek::SigningKey::from_bytes(&[7u8; 32]);
        let verifying_key = signing_key.verifying_key();
        let digest = [9u8; 32];
        let sig = signing_key.sign(&digest);
        let verifier = DeploymentVerifier::empty().with_ed25519_key(verifying_key);
        let mut tampered = digest;
        tampered[0] ^= 1;
        assert_eq!(
            verifier.verify(SignatureAlgorithm::Ed25519, &tampered, &sig.to_bytes()),
            Err(CryptoError::SignatureInvalid)
        );
    }

    #[test]
    fn ecdsa_p256_round_trip() {
        let signing_key = p256::ecdsa::SigningKey::from_bytes(&[6u8; 32].into()).unwrap();
        let verifying_key = p256::ecdsa::VerifyingKey::from(&signing_key);
        let digest = [3u8; 32];
        let sig: p256::ecdsa::Signature = signing_key.sign(&digest);
        let verifier = DeploymentVerifier::empty().with_ecdsa_p256_key(verifying_key);
        assert!(verifier
            .verify(SignatureAlgorithm::EcdsaP256, &digest, &sig.to_bytes())
            .is_ok());
    }

    #[test]
    fn missing_key_is_unsupported() {
        let verifier = DeploymentVerifier::empty();
        assert_eq!(
            verifier.verify(SignatureAlgorithm::Ed25519, &[0; 32], &[0; 64]),
            Err(CryptoError::UnsupportedAlgorithm)
        );
    }
}
