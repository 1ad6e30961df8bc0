//! In-memory shared medium connecting simulated nodes (spec.md §4.4
//! `radio`), grounded loosely on `lockframe-harness`'s deterministic
//! sim-network concept but re-expressed as a plain shared `RefCell`
//! rather than a `turmoil` network, since `meshfr_core` has nothing
//! async to schedule across.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use meshfr_core::{Radio, SendResult};

#[derive(Default)]
struct EtherState {
    channels: HashMap<[u8; 6], u8>,
    inboxes: HashMap<[u8; 6], Vec<Vec<u8>>>,
}

/// A shared medium every attached [`EtherRadio`] sends into and
/// receives from. Delivery succeeds only when sender and destination
/// share a channel, mirroring the real radio's channel-locked
/// broadcast domain (spec.md §4.4: "a node off-channel simply never
/// hears the frame").
#[derive(Clone, Default)]
pub struct Ether {
    state: Rc<RefCell<EtherState>>,
}

impl Ether {
    /// An empty medium with no nodes attached.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a node identified by `mac`, listening on `channel`.
    #[must_use]
    pub fn radio_for(&self, mac: [u8; 6], channel: u8) -> EtherRadio {
        let mut state = self.state.borrow_mut();
        state.channels.insert(mac, channel);
        state.inboxes.entry(mac).or_default();
        EtherRadio { ether: self.clone(), mac }
    }

    /// Drain every frame currently waiting for `mac`, in arrival order.
    pub fn drain(&self, mac: [u8; 6]) -> Vec<Vec<u8>> {
        self.state.borrow_mut().inboxes.get_mut(&mac).map(std::mem::take).unwrap_or_default()
    }

    /// Current channel a node is listening on, if attached.
    #[must_use]
    pub fn channel_of(&self, mac: [u8; 6]) -> Option<u8> {
        self.state.borrow().channels.get(&mac).copied()
    }
}

/// One node's handle onto an [`Ether`]; implements [`Radio`].
pub struct EtherRadio {
    ether: Ether,
    mac: [u8; 6],
}

impl Radio for EtherRadio {
    fn set_channel(&mut self, channel: u8) {
        self.ether.state.borrow_mut().channels.insert(self.mac, channel);
    }

    fn add_encrypted_peer(&mut self, _mac: [u8; 6], _per_link_key: [u8; 16], _pre_shared_key: [u8; 16]) {}

    fn remove_peer(&mut self, _mac: [u8; 6]) {}

    fn send(&mut self, mac: [u8; 6], frame: &[u8]) -> SendResult {
        let mut state = self.ether.state.borrow_mut();
        let same_channel = state.channels.get(&self.mac).copied() == state.channels.get(&mac).copied();
        if same_channel {
            state.inboxes.entry(mac).or_default().push(frame.to_vec());
        }
        // A frame sent off-channel is a silent miss on real hardware
        // too, not a transport error the scheduler should retry.
        SendResult::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivers_between_nodes_on_the_same_channel() {
        let ether = Ether::new();
        let mut a = ether.radio_for([1; 6], 6);
        let _b = ether.radio_for([2; 6], 6);

        a.send([2; 6], b"hello");
        assert_eq!(ether.drain([2; 6]), vec![b"hello".to_vec()]);
    }

    #[test]
    fn drops_frames_sent_to_a_node_on_a_different_channel() {
        let ether = Ether::new();
        let mut a = ether.radio_for([1; 6], 6);
        let _b = ether.radio_for([2; 6], 11);

        a.send([2; 6], b"hello");
        assert!(ether.drain([2; 6]).is_empty());
    }

    #[test]
    fn set_channel_rejoins_the_matching_domain() {
        let ether = Ether::new();
        let mut a = ether.radio_for([1; 6], 6);
        let mut b = ether.radio_for([2; 6], 11);

        a.send([2; 6], b"before");
        assert!(ether.drain([2; 6]).is_empty());

        b.set_channel(6);
        a.send([2; 6], b"after");
        assert_eq!(ether.drain([2; 6]), vec![b"after".to_vec()]);
    }
}
