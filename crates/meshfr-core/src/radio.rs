//! Transport abstraction over the radio (spec.md §5, REDESIGN FLAGS:
//! "singleton radio callback" replaced by explicit trait + explicit
//! inbound delivery).

/// Outcome of a single [`Radio::send`] attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendResult {
    /// Accepted by the transport immediately.
    Ok,
    /// Accepted but queued by the transport for later delivery.
    Queued,
    /// The transport could not accept the send right now (e.g. its own
    /// queue is full); callers should retry later rather than treat this
    /// as a permanent failure.
    BusyOrError,
}

/// The radio surface the core drives. Inbound frames are not delivered
/// through this trait: the host passes them to `Core::on_frame` directly,
/// so there is no static callback or singleton to register.
pub trait Radio {
    /// Switch to `channel`, tearing down any encrypted peer entries the
    /// underlying transport keeps per-channel.
    fn set_channel(&mut self, channel: u8);

    /// Install (or replace) the link key material for `mac`. `pre_shared_key`
    /// and `per_link_key` are the two secrets combined in
    /// `meshfr_crypto::derive_peer_key`; the transport itself only needs to
    /// know a peer exists, not what these bytes mean.
    fn add_encrypted_peer(&mut self, mac: [u8; 6], per_link_key: [u8; 16], pre_shared_key: [u8; 16]);

    /// Drop all state associated with `mac`.
    fn remove_peer(&mut self, mac: [u8; 6]);

    /// Send `frame` to `mac`. Must not block.
    fn send(&mut self, mac: [u8; 6], frame: &[u8]) -> SendResult;
}
