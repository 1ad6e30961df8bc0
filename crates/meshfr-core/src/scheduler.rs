//! Paced outbound scheduler (spec.md §4.6): a bounded FIFO with a
//! per-opcode minimum inter-send interval and bounded retry-with-backoff.
//!
//! A close structural port of the original firmware's `espnow_scheduler.cpp`
//! (`TxItem`, `QCAP = 8`, `sched_tick`), adapted to enforce the minimum
//! inter-send interval across the whole queue rather than per entry: the
//! original relies on callers not enqueuing the same opcode faster than its
//! interval, which this port does not assume.

use meshfr_wire::{Opcode, MAX_FRAME_LEN};

use crate::radio::{Radio, SendResult};

/// Bounded FIFO capacity (spec.md §4.6 design constant).
const CAPACITY: usize = 8;

/// Default retry budget for a queue entry (spec.md §8 property 7).
const DEFAULT_RETRIES: u8 = 3;

/// Minimum spacing, in milliseconds, between two sends of the same
/// opcode (spec.md §4.6 table).
#[must_use]
pub fn interval_for(opcode: Opcode) -> u32 {
    match opcode {
        Opcode::Ping => 50,
        Opcode::PingReply => 0,
        Opcode::SensReport => 80,
        Opcode::RlyState => 40,
        Opcode::PmsStatus => 250,
        Opcode::CtrlRelay => 60,
        Opcode::ConfigWrite => 120,
        Opcode::TimeSync | Opcode::NetSetChan | Opcode::FwBegin | Opcode::FwCommit => 500,
        Opcode::FwChunk => 3,
        Opcode::FwAbort => 200,
        _ => 100,
    }
}

struct TxItem {
    mac: [u8; 6],
    opcode: Opcode,
    retries_left: u8,
    next_earliest_ms: u64,
    len: u16,
    buf: [u8; MAX_FRAME_LEN],
}

/// An item the scheduler dropped after its retry budget ran out, for
/// callers that want to surface this via [`crate::events::EventSink`].
#[derive(Debug, Clone, Copy)]
pub struct DroppedItem {
    /// Destination the item was addressed to.
    pub mac: [u8; 6],
    /// Opcode of the dropped item.
    pub opcode: Opcode,
}

/// The bounded outbound queue described in spec.md §4.6. `tick` drives
/// one send attempt per call; callers invoke it from the core's
/// cooperative loop.
pub struct OutboundScheduler {
    items: Vec<TxItem>,
    /// Last successful send time per opcode, used to enforce the
    /// minimum interval across separate queue entries.
    last_sent_ms: Vec<(Opcode, u64)>,
}

impl OutboundScheduler {
    /// An empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self { items: Vec::with_capacity(CAPACITY), last_sent_ms: Vec::new() }
    }

    /// Enqueue a fully encoded frame for `mac`. Returns `false` if the
    /// queue is full or `frame` exceeds the wire MTU.
    #[must_use]
    pub fn enqueue(&mut self, mac: [u8; 6], opcode: Opcode, frame: &[u8], now_ms: u64) -> bool {
        if self.items.len() >= CAPACITY || frame.len() > MAX_FRAME_LEN {
            return false;
        }
        let mut buf = [0u8; MAX_FRAME_LEN];
        buf[..frame.len()].copy_from_slice(frame);
        self.items.push(TxItem {
            mac,
            opcode,
            retries_left: DEFAULT_RETRIES,
            next_earliest_ms: now_ms,
            len: frame.len() as u16,
            buf,
        });
        true
    }

    fn last_sent(&self, opcode: Opcode) -> Option<u64> {
        self.last_sent_ms.iter().find(|(op, _)| *op == opcode).map(|(_, t)| *t)
    }

    fn record_sent(&mut self, opcode: Opcode, now_ms: u64) {
        if let Some(slot) = self.last_sent_ms.iter_mut().find(|(op, _)| *op == opcode) {
            slot.1 = now_ms;
        } else {
            self.last_sent_ms.push((opcode, now_ms));
        }
    }

    /// Attempt to send the head of the queue if its pacing interval has
    /// elapsed. Returns a dropped item if the retry budget was just
    /// exhausted.
    pub fn tick(&mut self, radio: &mut impl Radio, now_ms: u64) -> Option<DroppedItem> {
        let opcode = self.items.first()?.opcode;
        let interval = u64::from(interval_for(opcode));
        let paced_earliest =
            self.last_sent(opcode).map_or(0, |t| t.saturating_add(interval));
        let earliest = self.items[0].next_earliest_ms.max(paced_earliest);
        if now_ms < earliest {
            return None;
        }

        let mac = self.items[0].mac;
        let len = self.items[0].len as usize;
        let send_result = radio.send(mac, &self.items[0].buf[..len]);

        match send_result {
            SendResult::Ok | SendResult::Queued => {
                self.items.remove(0);
                self.record_sent(opcode, now_ms);
                None
            }
            SendResult::BusyOrError => {
                let head = &mut self.items[0];
                if head.retries_left == 0 {
                    let item = self.items.remove(0);
                    Some(DroppedItem { mac: item.mac, opcode: item.opcode })
                } else {
                    head.retries_left -= 1;
                    let backoff = 10 + (interval / 2);
                    head.next_earliest_ms = now_ms + backoff;
                    None
                }
            }
        }
    }

    /// Number of items currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// `true` if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for OutboundScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubRadio {
        fail_next: u32,
    }

    impl Radio for StubRadio {
        fn set_channel(&mut self, _channel: u8) {}
        fn add_encrypted_peer(&mut self, _mac: [u8; 6], _per_link_key: [u8; 16], _psk: [u8; 16]) {}
        fn remove_peer(&mut self, _mac: [u8; 6]) {}
        fn send(&mut self, _mac: [u8; 6], _frame: &[u8]) -> SendResult {
            if self.fail_next > 0 {
                self.fail_next -= 1;
                SendResult::BusyOrError
            } else {
                SendResult::Ok
            }
        }
    }

    const MAC: [u8; 6] = [9, 9, 9, 9, 9, 9];

    #[test]
    fn enqueue_rejects_oversized_frame() {
        let mut sched = OutboundScheduler::new();
        let huge = vec![0u8; MAX_FRAME_LEN + 1];
        assert!(!sched.enqueue(MAC, Opcode::Ping, &huge, 0));
    }

    #[test]
    fn queue_fills_to_capacity() {
        let mut sched = OutboundScheduler::new();
        for _ in 0..CAPACITY {
            assert!(sched.enqueue(MAC, Opcode::Ping, &[1, 2, 3], 0));
        }
        assert!(!sched.enqueue(MAC, Opcode::Ping, &[1, 2, 3], 0));
    }

    #[test]
    fn sends_head_immediately_when_due() {
        let mut sched = OutboundScheduler::new();
        let mut radio = StubRadio { fail_next: 0 };
        sched.enqueue(MAC, Opcode::Ping, &[1], 0);
        assert!(sched.tick(&mut radio, 0).is_none());
        assert!(sched.is_empty());
    }

    #[test]
    fn property_6_enforces_minimum_spacing_across_entries() {
        let mut sched = OutboundScheduler::new();
        let mut radio = StubRadio { fail_next: 0 };
        sched.enqueue(MAC, Opcode::SensReport, &[1], 0);
        sched.tick(&mut radio, 0);
        sched.enqueue(MAC, Opcode::SensReport, &[2], 0);
        assert!(sched.tick(&mut radio, 1).is_none());
        assert_eq!(sched.len(), 1);
        sched.tick(&mut radio, 100);
        assert!(sched.is_empty());
    }

    #[test]
    fn property_7_drops_after_retry_budget_exhausted() {
        let mut sched = OutboundScheduler::new();
        let mut radio = StubRadio { fail_next: 10 };
        sched.enqueue(MAC, Opcode::Ping, &[1], 0);
        let mut dropped = None;
        for t in (0..1000).step_by(5) {
            if let Some(d) = sched.tick(&mut radio, t) {
                dropped = Some(d);
                break;
            }
        }
        let dropped = dropped.expect("item should be dropped after 4 failed attempts");
        assert_eq!(dropped.mac, MAC);
        assert!(sched.is_empty());
    }
}
