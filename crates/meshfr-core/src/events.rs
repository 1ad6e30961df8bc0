//! Structured event reporting (REDESIGN FLAG: ad-hoc firmware logging
//! macros replaced with a sink trait the host wires to `tracing`).

use crate::error::CoreError;
use meshfr_wire::Opcode;

/// Events the core reports for observability. Kept small and enum-shaped
/// rather than free-text so hosts can filter or count them cheaply.
#[derive(Debug, Clone, Copy)]
pub enum CoreEvent<'a> {
    /// A frame was accepted and dispatched.
    FrameAccepted {
        /// Sender hardware address.
        mac: [u8; 6],
        /// Decoded opcode.
        opcode: Opcode,
    },
    /// A frame was dropped before dispatch.
    FrameRejected {
        /// Sender hardware address, if the header could be parsed at all.
        mac: Option<[u8; 6]>,
        /// Why it was dropped.
        reason: CoreError,
    },
    /// The firmware session moved to a new state.
    FirmwareStateChanged {
        /// Image identifier the session concerns.
        image_id: u32,
        /// Human-readable state name, e.g. `"Receiving"`.
        state: &'a str,
    },
    /// The topology store installed a new version.
    TopologyInstalled {
        /// The newly active version.
        version: u16,
    },
    /// The outbound scheduler dropped an item after exhausting retries.
    SendDropped {
        /// Destination hardware address.
        mac: [u8; 6],
        /// Opcode of the dropped item.
        opcode: Opcode,
    },
}

/// Receives [`CoreEvent`]s as they occur. The core never blocks on this
/// call; implementations must be cheap or buffer internally.
pub trait EventSink {
    /// Report one event.
    fn emit(&mut self, event: CoreEvent<'_>);
}

/// Default [`EventSink`] that forwards to `tracing` at a severity picked
/// per event kind.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&mut self, event: CoreEvent<'_>) {
        match event {
            CoreEvent::FrameAccepted { mac, opcode } => {
                tracing::debug!(mac = ?mac, opcode = ?opcode, "frame accepted");
            }
            CoreEvent::FrameRejected { mac, reason } => {
                if reason.is_transient() {
                    tracing::debug!(mac = ?mac, %reason, "frame rejected");
                } else {
                    tracing::warn!(mac = ?mac, %reason, "frame rejected");
                }
            }
            CoreEvent::FirmwareStateChanged { image_id, state } => {
                tracing::info!(image_id, state, "firmware session state changed");
            }
            CoreEvent::TopologyInstalled { version } => {
                tracing::info!(version, "topology installed");
            }
            CoreEvent::SendDropped { mac, opcode } => {
                tracing::warn!(mac = ?mac, opcode = ?opcode, "send dropped after retries exhausted");
            }
        }
    }
}
