//! System-time and randomness collaborator (spec.md §6 `clock`).

/// Decouples the core from wall-clock time and nonce generation so tests
/// can drive both deterministically.
pub trait Environment {
    /// Current monotonic time in milliseconds since an arbitrary epoch
    /// (typically boot).
    fn now_ms(&self) -> u64;

    /// Produce the next 48-bit nonce for an outbound frame. Must be
    /// strictly increasing across the lifetime of one `Environment`
    /// instance; strictly increasing across reboots is recommended but
    /// not required (spec.md §6: "a boot-time seed satisfies the
    /// contract").
    fn next_nonce(&mut self) -> u64;

    /// Fill `buf` with bytes suitable for use as a device token or
    /// similar non-predictable value.
    fn random_bytes(&mut self, buf: &mut [u8]);

    /// Convenience: a random 128-bit value, e.g. for device token
    /// issuance at pairing.
    fn random_u128(&mut self) -> u128 {
        let mut buf = [0u8; 16];
        self.random_bytes(&mut buf);
        u128::from_le_bytes(buf)
    }
}
