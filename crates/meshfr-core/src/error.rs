//! Core runtime error kinds (spec.md §7).

/// Error kinds surfaced by the core. Inbound errors are propagated to
/// callers for observability (logging, tests) but the router itself never
/// replies to a bad frame: propagation policy is *silent drop* on the
/// wire (spec.md §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// Structurally invalid frame (short, bad version, reserved set, …).
    #[error("malformed frame")]
    Malformed,
    /// HMAC verification failed.
    #[error("authentication failed")]
    AuthFail,
    /// Replay guard rejected the frame.
    #[error("replay rejected")]
    Replay,
    /// Topology-token check failed.
    #[error("topology mismatch")]
    TopologyMismatch,
    /// A bounded resource (outbound queue, replay table) is full.
    #[error("capacity exceeded")]
    CapacityExceeded,
    /// The transport could not accept a send right now.
    #[error("transport busy")]
    TransportBusy,
    /// A firmware frame referenced a session that does not exist or does
    /// not match.
    #[error("firmware session mismatch")]
    SessionMismatch,
    /// A firmware image's digest did not match the declared value.
    #[error("firmware digest mismatch")]
    DigestMismatch,
    /// A firmware commit signature failed verification.
    #[error("firmware signature verification failed")]
    SignatureFail,
    /// Sender role did not match what was required for this opcode.
    #[error("role mismatch")]
    RoleMismatch,
    /// An invariant the core assumes was violated internally.
    #[error("internal error")]
    Internal,
}

impl From<meshfr_wire::ProtocolError> for CoreError {
    fn from(_: meshfr_wire::ProtocolError) -> Self {
        Self::Malformed
    }
}

impl From<meshfr_crypto::CryptoError> for CoreError {
    fn from(err: meshfr_crypto::CryptoError) -> Self {
        match err {
            meshfr_crypto::CryptoError::TagMismatch => Self::AuthFail,
            meshfr_crypto::CryptoError::SignatureInvalid
            | meshfr_crypto::CryptoError::MalformedSignature
            | meshfr_crypto::CryptoError::UnsupportedAlgorithm => Self::SignatureFail,
            meshfr_crypto::CryptoError::InvalidKeyLength { .. } => Self::Internal,
        }
    }
}

impl CoreError {
    /// `true` for errors that do not indicate malicious or buggy input:
    /// callers may want to treat these differently when deciding whether
    /// to log at a lower severity.
    #[must_use]
    pub fn is_transient(self) -> bool {
        matches!(self, Self::TransportBusy | Self::CapacityExceeded)
    }
}
