//! Anti-replay window (spec.md §4.3).

use meshfr_wire::Opcode;

/// Bounded capacity of the replay state table. Eviction overwrites slot 0
/// (spec.md §4.3: "eviction overwrites slot 0").
const CAPACITY: usize = 12;

/// Default back-window width for nonce acceptance (spec.md §4.3 default).
pub const DEFAULT_WINDOW: u64 = 32;

#[derive(Debug, Clone, Copy)]
struct Entry {
    mac: [u8; 6],
    opcode: Opcode,
    last_seq: u16,
    last_nonce: u64,
}

/// Per-(peer MAC, opcode) sequence and nonce tracking, implementing the
/// acceptance rule in spec.md §4.3.
#[derive(Debug, Clone)]
pub struct ReplayGuard {
    window: u64,
    slots: Vec<Option<Entry>>,
}

impl ReplayGuard {
    /// A guard with the default back-window (32).
    #[must_use]
    pub fn new() -> Self {
        Self::with_window(DEFAULT_WINDOW)
    }

    /// A guard with an explicit back-window; `0` disables back-acceptance
    /// entirely.
    #[must_use]
    pub fn with_window(window: u64) -> Self {
        Self { window, slots: vec![None; CAPACITY] }
    }

    fn find(&self, mac: [u8; 6], opcode: Opcode) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| matches!(slot, Some(e) if e.mac == mac && e.opcode == opcode))
    }

    /// Evaluate and record a candidate (seq, nonce) for (mac, opcode).
    /// Returns `true` if the frame should be accepted.
    pub fn check(&mut self, mac: [u8; 6], opcode: Opcode, seq: u16, nonce: u64) -> bool {
        let Some(idx) = self.find(mac, opcode) else {
            self.insert_new(mac, opcode, seq, nonce);
            return true;
        };

        let entry = self.slots[idx].as_mut().expect("found index always holds Some");
        let forward_delta = seq.wrapping_sub(entry.last_seq);
        let seq_is_newer = forward_delta > 0 && forward_delta <= 0x8000;
        let nonce_is_newer = nonce > entry.last_nonce;
        let nonce_in_back_window = self.window > 0
            && nonce <= entry.last_nonce
            && nonce >= entry.last_nonce.saturating_sub(self.window);

        if !(seq_is_newer || nonce_is_newer || nonce_in_back_window) {
            return false;
        }

        entry.last_seq = seq;
        if nonce_is_newer {
            entry.last_nonce = nonce;
        }
        true
    }

    fn insert_new(&mut self, mac: [u8; 6], opcode: Opcode, seq: u16, nonce: u64) {
        let fresh = Entry { mac, opcode, last_seq: seq, last_nonce: nonce };
        if let Some(free) = self.slots.iter().position(Option::is_none) {
            self.slots[free] = Some(fresh);
        } else {
            self.slots[0] = Some(fresh);
        }
    }
}

impl Default for ReplayGuard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAC: [u8; 6] = [1, 2, 3, 4, 5, 6];
    const OP: Opcode = Opcode::Ping;

    #[test]
    fn first_frame_always_accepted() {
        let mut g = ReplayGuard::new();
        assert!(g.check(MAC, OP, 100, 0x0100_00));
    }

    #[test]
    fn exact_replay_rejected() {
        let mut g = ReplayGuard::new();
        assert!(g.check(MAC, OP, 100, 0x01_0000));
        assert!(!g.check(MAC, OP, 100, 0x01_0000));
    }

    #[test]
    fn scenario_s2_back_window_then_forward() {
        let mut g = ReplayGuard::new();
        assert!(g.check(MAC, OP, 100, 0x01_0000));
        assert!(g.check(MAC, OP, 101, 0x00_FFFF));
        assert!(g.check(MAC, OP, 102, 0x01_0001));
    }

    #[test]
    fn strictly_older_sequence_rejected_without_nonce_help() {
        let mut g = ReplayGuard::new();
        assert!(g.check(MAC, OP, 200, 1_000_000));
        assert!(!g.check(MAC, OP, 50, 1));
    }

    #[test]
    fn back_window_does_not_advance_last_nonce() {
        let mut g = ReplayGuard::new();
        assert!(g.check(MAC, OP, 100, 100));
        assert!(g.check(MAC, OP, 101, 90));
        assert!(!g.check(MAC, OP, 102, 90));
    }

    #[test]
    fn zero_window_disables_back_acceptance() {
        let mut g = ReplayGuard::with_window(0);
        assert!(g.check(MAC, OP, 100, 100));
        assert!(!g.check(MAC, OP, 101, 90));
    }

    #[test]
    fn distinct_opcodes_tracked_independently() {
        let mut g = ReplayGuard::new();
        assert!(g.check(MAC, Opcode::Ping, 1, 1));
        assert!(g.check(MAC, Opcode::SensReport, 1, 1));
    }

    #[test]
    fn table_evicts_slot_zero_when_full() {
        let mut g = ReplayGuard::new();
        for i in 0..CAPACITY {
            let mac = [0, 0, 0, 0, 0, i as u8];
            assert!(g.check(mac, OP, 1, 1));
        }
        let overflow_mac = [0, 0, 0, 0, 0, 99];
        assert!(g.check(overflow_mac, OP, 1, 1));
        let evicted_mac = [0, 0, 0, 0, 0, 0];
        assert!(g.check(evicted_mac, OP, 1, 1));
    }
}
