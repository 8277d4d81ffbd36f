//! # Transport Layer
//!
//! Unreliable, unordered datagram delivery to a single endpoint.
//!
//! ## Design
//!
//! - [`Transport`] is the only seam between the sync engine and the network
//! - Receives never block; an empty queue is `None`, not an error
//! - Loss, duplication and reordering are all legal; the layers above cope

mod channel;
mod udp;

use std::net::SocketAddr;

pub use channel::ChannelTransport;
pub use udp::UdpTransport;

use crate::error::TransportError;

/// Maximum datagram size accepted from the network.
///
/// Anything longer is truncated to this length and then fails to decode.
pub const MAX_DATAGRAM_SIZE: usize = arena_shared::constants::MAX_DATAGRAM_SIZE;

/// Datagram send/receive with one configured endpoint.
pub trait Transport {
    /// Opens the transport towards `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns an error if the local socket cannot be opened.
    fn connect(&mut self, endpoint: SocketAddr) -> Result<(), TransportError>;

    /// Closes the transport. Idempotent.
    fn disconnect(&mut self);

    /// Returns true between a successful `connect` and `disconnect`.
    fn is_connected(&self) -> bool;

    /// Sends one datagram. Delivery is not guaranteed.
    ///
    /// # Errors
    ///
    /// [`TransportError::NotConnected`] before `connect`, otherwise any
    /// failure of the underlying medium.
    fn send(&mut self, datagram: &[u8]) -> Result<(), TransportError>;

    /// Copies the next pending datagram into `buffer` and returns its
    /// length, or `None` if nothing is pending.
    fn try_receive(&mut self, buffer: &mut [u8]) -> Option<usize>;

    /// Returns statistics.
    fn stats(&self) -> &TransportStats;
}

/// Transport statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Packets sent.
    pub packets_sent: u64,
    /// Packets received.
    pub packets_received: u64,
    /// Bytes sent.
    pub bytes_sent: u64,
    /// Bytes received.
    pub bytes_received: u64,
    /// Send errors.
    pub send_errors: u64,
    /// Receive errors.
    pub recv_errors: u64,
}

impl TransportStats {
    /// Records a successful send of `len` bytes.
    #[inline]
    pub fn record_sent(&mut self, len: usize) {
        self.packets_sent += 1;
        self.bytes_sent += len as u64;
    }

    /// Records a received datagram of `len` bytes.
    #[inline]
    pub fn record_received(&mut self, len: usize) {
        self.packets_received += 1;
        self.bytes_received += len as u64;
    }
}
