//! # Reliability Layer
//!
//! Guaranteed delivery on top of an unreliable transport.
//!
//! ## Design
//!
//! - Every outbound packet gets the next sequence number from one counter
//! - Only guaranteed kinds are remembered, keyed by sequence number
//! - An ack or nak retires the entry; an unknown sequence is a no-op
//! - On timeout an entry is re-issued under a *new* sequence number and
//!   timestamp, and the old entry is forgotten
//! - Re-issues are capped; past the cap the peer is declared unreachable
//!
//! Time is passed in by the caller (seconds, monotonic). Nothing here reads
//! a clock.

use std::collections::BTreeMap;

use arena_shared::constants::{MAX_GUARANTEED_RESENDS, SECONDS_BEFORE_RESEND_GUARANTEED_PACKET};
use tracing::{debug, trace, warn};

use crate::protocol::{Packet, PacketKind, PacketSerializer, Payload, SequenceNumber};
use crate::transport::Transport;

/// Reliability tuning.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReliabilityConfig {
    /// Age (seconds) after which an unacknowledged packet is re-issued.
    pub resend_after: f64,
    /// Re-issues allowed per packet. `None` retries forever.
    pub max_resends: Option<u32>,
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            resend_after: SECONDS_BEFORE_RESEND_GUARANTEED_PACKET,
            max_resends: Some(MAX_GUARANTEED_RESENDS),
        }
    }
}

/// A sent guaranteed packet awaiting acknowledgement.
#[derive(Clone, Copy, Debug)]
pub struct OutstandingPacket {
    /// The packet as last sent; its timestamp is the send time.
    pub packet: Packet,
    /// Times this payload has been re-issued.
    pub resends: u32,
}

impl OutstandingPacket {
    /// Seconds since the packet was last sent.
    #[inline]
    #[must_use]
    pub fn age(&self, now: f64) -> f64 {
        now - self.packet.timestamp
    }
}

/// Something the host may want to know about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReliabilityEvent {
    /// A timed-out packet was sent again under a new sequence number.
    Resent {
        /// Kind of the packet.
        kind: PacketKind,
        /// Sequence number that was retired.
        old_sequence: SequenceNumber,
        /// Sequence number now awaiting acknowledgement.
        new_sequence: SequenceNumber,
    },
    /// The resend cap was reached; the packet was abandoned.
    PeerUnreachable {
        /// Kind of the abandoned packet.
        kind: PacketKind,
        /// Its last sequence number.
        sequence: SequenceNumber,
    },
}

/// Reliability statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReliabilityStats {
    /// Packets handed to the transport (first sends and resends).
    pub packets_sent: u64,
    /// Guaranteed packets first sent.
    pub guaranteed_sent: u64,
    /// Transport send failures (treated as loss).
    pub send_failures: u64,
    /// Re-issues after timeout.
    pub resends: u64,
    /// Entries retired by an ack.
    pub acks: u64,
    /// Entries retired by a nak.
    pub naks: u64,
    /// Acks/naks for unknown sequence numbers.
    pub stale_correlations: u64,
    /// Packets abandoned at the resend cap.
    pub abandoned: u64,
}

/// Guaranteed-delivery bookkeeping.
#[derive(Default)]
pub struct ReliabilityLayer {
    outstanding: BTreeMap<SequenceNumber, OutstandingPacket>,
    next_sequence: SequenceNumber,
    config: ReliabilityConfig,
    stats: ReliabilityStats,
    serializer: PacketSerializer,
}

impl ReliabilityLayer {
    /// Creates an empty layer.
    #[must_use]
    pub fn new(config: ReliabilityConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Stamps, encodes and sends a packet; remembers it if guaranteed.
    ///
    /// A transport failure is counted and otherwise treated as loss: a
    /// guaranteed packet stays outstanding and will be re-issued.
    pub fn send<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        sender_id: u8,
        payload: Payload,
        now: f64,
    ) -> SequenceNumber {
        let packet = Packet::new(self.allocate_sequence(), sender_id, now, payload);
        self.transmit(transport, &packet);

        if packet.is_guaranteed() {
            self.stats.guaranteed_sent += 1;
            self.outstanding
                .insert(packet.sequence, OutstandingPacket { packet, resends: 0 });
        }
        packet.sequence
    }

    /// Retires the entry acknowledged by the peer.
    ///
    /// Returns false (and changes nothing) if no such entry exists.
    pub fn on_ack(&mut self, sequence: SequenceNumber) -> bool {
        let retired = self.retire(sequence);
        if retired {
            self.stats.acks += 1;
        }
        retired
    }

    /// Retires the entry refused by the peer. A refusal is final; the
    /// packet is not re-issued.
    pub fn on_nak(&mut self, sequence: SequenceNumber) -> bool {
        let retired = self.retire(sequence);
        if retired {
            self.stats.naks += 1;
        }
        retired
    }

    /// Re-issues every entry older than the resend threshold, once.
    pub fn tick<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        now: f64,
    ) -> Vec<ReliabilityEvent> {
        let threshold = self.config.resend_after;
        let expired: Vec<SequenceNumber> = self
            .outstanding
            .iter()
            .filter(|(_, entry)| entry.age(now) > threshold)
            .map(|(&sequence, _)| sequence)
            .collect();

        let mut events = Vec::with_capacity(expired.len());
        for sequence in expired {
            let Some(entry) = self.outstanding.remove(&sequence) else {
                continue;
            };
            let kind = entry.packet.kind();
            let attempt = entry.resends + 1;

            if self.config.max_resends.is_some_and(|cap| attempt > cap) {
                warn!(?kind, sequence, resends = entry.resends, "peer unreachable, abandoning packet");
                self.stats.abandoned += 1;
                events.push(ReliabilityEvent::PeerUnreachable { kind, sequence });
                continue;
            }

            let packet = Packet::new(
                self.allocate_sequence(),
                entry.packet.sender_id,
                now,
                entry.packet.payload,
            );
            debug!(?kind, old = sequence, new = packet.sequence, attempt, "resending guaranteed packet");
            self.transmit(transport, &packet);
            self.stats.resends += 1;
            self.outstanding.insert(
                packet.sequence,
                OutstandingPacket {
                    packet,
                    resends: attempt,
                },
            );
            events.push(ReliabilityEvent::Resent {
                kind,
                old_sequence: sequence,
                new_sequence: packet.sequence,
            });
        }
        events
    }

    /// Forgets every outstanding packet.
    pub fn clear(&mut self) {
        self.outstanding.clear();
    }

    /// Number of packets awaiting acknowledgement.
    #[must_use]
    pub fn outstanding_len(&self) -> usize {
        self.outstanding.len()
    }

    /// Returns true if `sequence` awaits acknowledgement.
    #[must_use]
    pub fn is_outstanding(&self, sequence: SequenceNumber) -> bool {
        self.outstanding.contains_key(&sequence)
    }

    /// Outstanding packets in sequence order.
    pub fn outstanding(&self) -> impl Iterator<Item = &OutstandingPacket> {
        self.outstanding.values()
    }

    /// Sequence number the next send will use.
    #[must_use]
    pub const fn peek_sequence(&self) -> SequenceNumber {
        self.next_sequence
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &ReliabilityConfig {
        &self.config
    }

    /// Returns statistics.
    #[must_use]
    pub const fn stats(&self) -> &ReliabilityStats {
        &self.stats
    }

    fn allocate_sequence(&mut self) -> SequenceNumber {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        sequence
    }

    fn retire(&mut self, sequence: SequenceNumber) -> bool {
        if self.outstanding.remove(&sequence).is_some() {
            return true;
        }
        trace!(sequence, "correlation for unknown sequence ignored");
        self.stats.stale_correlations += 1;
        false
    }

    fn transmit<T: Transport + ?Sized>(&mut self, transport: &mut T, packet: &Packet) {
        let bytes = self.serializer.serialize(packet);
        match transport.send(bytes) {
            Ok(()) => self.stats.packets_sent += 1,
            Err(e) => {
                debug!(error = %e, kind = ?packet.kind(), sequence = packet.sequence, "send failed, treating as loss");
                self.stats.send_failures += 1;
            }
        }
    }
}
