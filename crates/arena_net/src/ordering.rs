//! # Packet Ordering
//!
//! Per-burst deduplication and ordering of inbound packets.
//!
//! The transport delivers datagrams unordered and possibly duplicated.
//! Everything drained in one tick is collected here, exact duplicates are
//! discarded, and the distinct packets come out in ascending
//! [`PacketKey`] order: sequence number first, then kind, sender and
//! payload bytes as tie-breaks between distinct packets.
//!
//! No state survives a drain. A duplicate arriving in a later tick is a
//! new packet as far as this module is concerned.

use std::collections::BTreeMap;

use crate::protocol::{Packet, PacketKey};

/// Collects one tick's worth of inbound packets.
#[derive(Debug, Default)]
pub struct PacketOrderer {
    pending: BTreeMap<PacketKey, Packet>,
    duplicates: u64,
}

impl PacketOrderer {
    /// Creates an empty orderer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a packet to the current burst.
    ///
    /// Returns false if an equal packet is already pending.
    pub fn push(&mut self, packet: Packet) -> bool {
        let key = packet.key();
        if self.pending.contains_key(&key) {
            self.duplicates += 1;
            return false;
        }
        self.pending.insert(key, packet);
        true
    }

    /// Takes every pending packet in dispatch order.
    pub fn drain_ordered(&mut self) -> Vec<Packet> {
        std::mem::take(&mut self.pending).into_values().collect()
    }

    /// Number of distinct packets pending.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Duplicates discarded since creation.
    #[must_use]
    pub const fn duplicates(&self) -> u64 {
        self.duplicates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{FireBody, HitBody, Payload};

    fn hit(sequence: u32, target_id: u8) -> Packet {
        Packet::new(sequence, 0, 0.0, Payload::Hit(HitBody { target_id, damage: 1 }))
    }

    #[test]
    fn test_drains_in_sequence_order() {
        let mut orderer = PacketOrderer::new();
        for sequence in [5, 1, 9, 3, 7] {
            assert!(orderer.push(hit(sequence, 1)));
        }

        let order: Vec<_> = orderer.drain_ordered().iter().map(|p| p.sequence).collect();
        assert_eq!(order, vec![1, 3, 5, 7, 9]);
        assert!(orderer.is_empty());
    }

    #[test]
    fn test_exact_duplicates_dropped() {
        let mut orderer = PacketOrderer::new();
        assert!(orderer.push(hit(4, 1)));
        assert!(!orderer.push(hit(4, 1)));

        // Same sequence, different timestamp: still the same packet
        let mut late_copy = hit(4, 1);
        late_copy.timestamp = 99.0;
        assert!(!orderer.push(late_copy));

        assert_eq!(orderer.len(), 1);
        assert_eq!(orderer.duplicates(), 2);
    }

    #[test]
    fn test_distinct_packets_sharing_sequence_both_kept() {
        let mut orderer = PacketOrderer::new();
        assert!(orderer.push(hit(2, 1)));
        assert!(orderer.push(hit(2, 3)));
        assert!(orderer.push(Packet::new(2, 5, 0.0, Payload::Fire(FireBody { instigator_id: 5 }))));

        let drained = orderer.drain_ordered();
        assert_eq!(drained.len(), 3);
        assert!(drained.iter().all(|p| p.sequence == 2));
    }

    #[test]
    fn test_no_memory_across_bursts() {
        let mut orderer = PacketOrderer::new();
        orderer.push(hit(1, 1));
        assert_eq!(orderer.drain_ordered().len(), 1);

        assert!(orderer.push(hit(1, 1)));
        assert_eq!(orderer.drain_ordered().len(), 1);
    }

    #[test]
    fn test_drain_is_deterministic_for_any_arrival_order() {
        let packets = [hit(3, 1), hit(1, 2), hit(2, 1), hit(1, 2), hit(3, 1)];

        let mut forward = PacketOrderer::new();
        packets.iter().for_each(|p| {
            forward.push(*p);
        });
        let mut backward = PacketOrderer::new();
        packets.iter().rev().for_each(|p| {
            backward.push(*p);
        });

        assert_eq!(forward.drain_ordered(), backward.drain_ordered());
    }
}
