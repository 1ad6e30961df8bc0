//! Crypto-layer error kinds.

/// Errors raised by key derivation, tag verification, or signature
/// verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    /// The supplied key material had the wrong length.
    #[error("invalid key material length: expected {expected}, got {got}")]
    InvalidKeyLength {
        /// Required length in bytes.
        expected: usize,
        /// Length actually supplied.
        got: usize,
    },

    /// HMAC tag verification failed (header, admission token, optional
    /// topology token, payload, or nonce did not match).
    #[error("HMAC tag verification failed")]
    TagMismatch,

    /// The requested signature algorithm has no verifier wired up.
    #[error("unsupported signature algorithm")]
    UnsupportedAlgorithm,

    /// Signature bytes were malformed for the claimed algorithm.
    #[error("malformed signature")]
    MalformedSignature,

    /// Signature verification ran but did not validate.
    #[error("signature verification failed")]
    SignatureInvalid,
}
