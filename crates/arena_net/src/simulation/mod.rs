//! # Network Simulation
//!
//! Simulates bad network conditions for testing.
//!
//! ## Features
//!
//! - Packet loss simulation
//! - Duplicate delivery simulation
//! - Out-of-order delivery simulation
//!
//! All decisions come from a seeded RNG, so a failing run can be replayed
//! exactly by reusing its seed.

use std::net::SocketAddr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use crate::error::TransportError;
use crate::transport::{Transport, TransportStats};

/// Network conditions for simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NetworkConditions {
    /// Packet loss percentage (0-100).
    pub packet_loss_percent: u8,
    /// Duplicate packet percentage (0-100).
    pub duplicate_percent: u8,
    /// Out-of-order percentage (0-100).
    pub out_of_order_percent: u8,
}

impl NetworkConditions {
    /// Perfect network conditions (LAN).
    pub const PERFECT: Self = Self {
        packet_loss_percent: 0,
        duplicate_percent: 0,
        out_of_order_percent: 0,
    };

    /// Average network conditions (cable).
    pub const AVERAGE: Self = Self {
        packet_loss_percent: 1,
        duplicate_percent: 1,
        out_of_order_percent: 2,
    };

    /// Poor network conditions (mobile/wifi).
    pub const POOR: Self = Self {
        packet_loss_percent: 5,
        duplicate_percent: 2,
        out_of_order_percent: 5,
    };

    /// Hostile conditions for soak tests.
    pub const HOSTILE: Self = Self {
        packet_loss_percent: 30,
        duplicate_percent: 20,
        out_of_order_percent: 20,
    };

    /// Returns true if packet should be dropped.
    #[must_use]
    pub fn should_drop(&self, roll: u8) -> bool {
        roll < self.packet_loss_percent
    }

    /// Returns true if packet should be delivered twice.
    #[must_use]
    pub fn should_duplicate(&self, roll: u8) -> bool {
        roll < self.duplicate_percent
    }

    /// Returns true if packet should be held back behind the next one.
    #[must_use]
    pub fn should_reorder(&self, roll: u8) -> bool {
        roll < self.out_of_order_percent
    }
}

impl Default for NetworkConditions {
    fn default() -> Self {
        Self::AVERAGE
    }
}

/// What the simulator did to outbound traffic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SimulationStats {
    /// Datagrams silently discarded.
    pub dropped: u64,
    /// Datagrams delivered twice.
    pub duplicated: u64,
    /// Datagrams delivered after their successor.
    pub reordered: u64,
}

/// Transport decorator that impairs outbound traffic.
///
/// Wrap the sending side of a link; receives pass through untouched.
#[derive(Debug)]
pub struct LossyTransport<T> {
    inner: T,
    conditions: NetworkConditions,
    rng: StdRng,
    held: Option<Vec<u8>>,
    stats: SimulationStats,
}

impl<T: Transport> LossyTransport<T> {
    /// Wraps `inner` with the given conditions and RNG seed.
    #[must_use]
    pub fn new(inner: T, conditions: NetworkConditions, seed: u64) -> Self {
        Self {
            inner,
            conditions,
            rng: StdRng::seed_from_u64(seed),
            held: None,
            stats: SimulationStats::default(),
        }
    }

    /// Changes conditions mid-run (e.g. to heal the link).
    pub fn set_conditions(&mut self, conditions: NetworkConditions) {
        self.conditions = conditions;
    }

    /// Releases a held-back datagram, if any.
    ///
    /// # Errors
    ///
    /// Propagates the inner transport's send error.
    pub fn flush(&mut self) -> Result<(), TransportError> {
        match self.held.take() {
            Some(datagram) => self.inner.send(&datagram),
            None => Ok(()),
        }
    }

    /// Returns simulation statistics.
    #[must_use]
    pub const fn simulation_stats(&self) -> &SimulationStats {
        &self.stats
    }

    /// Returns the wrapped transport.
    #[must_use]
    pub const fn inner(&self) -> &T {
        &self.inner
    }

    /// Returns the wrapped transport mutably.
    pub fn inner_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    fn roll(&mut self) -> u8 {
        self.rng.gen_range(0..100)
    }
}

impl<T: Transport> Transport for LossyTransport<T> {
    fn connect(&mut self, endpoint: SocketAddr) -> Result<(), TransportError> {
        self.inner.connect(endpoint)
    }

    fn disconnect(&mut self) {
        self.held = None;
        self.inner.disconnect();
    }

    fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    fn send(&mut self, datagram: &[u8]) -> Result<(), TransportError> {
        if !self.inner.is_connected() {
            return Err(TransportError::NotConnected);
        }

        let roll = self.roll();
        if self.conditions.should_drop(roll) {
            trace!(len = datagram.len(), "simulated loss");
            self.stats.dropped += 1;
            return Ok(());
        }

        let roll = self.roll();
        if self.held.is_none() && self.conditions.should_reorder(roll) {
            self.stats.reordered += 1;
            self.held = Some(datagram.to_vec());
            return Ok(());
        }

        self.inner.send(datagram)?;
        let roll = self.roll();
        if self.conditions.should_duplicate(roll) {
            self.stats.duplicated += 1;
            self.inner.send(datagram)?;
        }
        self.flush()
    }

    fn try_receive(&mut self, buffer: &mut [u8]) -> Option<usize> {
        self.inner.try_receive(buffer)
    }

    fn stats(&self) -> &TransportStats {
        self.inner.stats()
    }
}
