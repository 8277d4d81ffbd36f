//! In-process transport over a pair of crossbeam channels.
//!
//! Used by tests and by the network simulator to run two participants in
//! one process with deterministic delivery.

use std::net::SocketAddr;

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};

use super::{Transport, TransportStats};
use crate::error::TransportError;

/// One end of an in-process datagram pipe.
#[derive(Debug)]
pub struct ChannelTransport {
    outbound: Sender<Vec<u8>>,
    inbound: Receiver<Vec<u8>>,
    endpoint: Option<SocketAddr>,
    stats: TransportStats,
}

impl ChannelTransport {
    /// Creates two linked ends. Each must still be `connect`ed before it
    /// sends.
    #[must_use]
    pub fn pair() -> (Self, Self) {
        let (a_tx, b_rx) = unbounded();
        let (b_tx, a_rx) = unbounded();
        (Self::new(a_tx, a_rx), Self::new(b_tx, b_rx))
    }

    fn new(outbound: Sender<Vec<u8>>, inbound: Receiver<Vec<u8>>) -> Self {
        Self {
            outbound,
            inbound,
            endpoint: None,
            stats: TransportStats::default(),
        }
    }

    /// Endpoint passed to the last `connect`.
    #[must_use]
    pub const fn endpoint(&self) -> Option<SocketAddr> {
        self.endpoint
    }

    /// Number of datagrams waiting to be received.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inbound.len()
    }
}

impl Transport for ChannelTransport {
    fn connect(&mut self, endpoint: SocketAddr) -> Result<(), TransportError> {
        self.endpoint = Some(endpoint);
        Ok(())
    }

    fn disconnect(&mut self) {
        self.endpoint = None;
    }

    fn is_connected(&self) -> bool {
        self.endpoint.is_some()
    }

    fn send(&mut self, datagram: &[u8]) -> Result<(), TransportError> {
        if self.endpoint.is_none() {
            return Err(TransportError::NotConnected);
        }
        if self.outbound.send(datagram.to_vec()).is_err() {
            self.stats.send_errors += 1;
            return Err(TransportError::Disconnected);
        }
        self.stats.record_sent(datagram.len());
        Ok(())
    }

    fn try_receive(&mut self, buffer: &mut [u8]) -> Option<usize> {
        match self.inbound.try_recv() {
            Ok(datagram) => {
                // Oversized datagrams are truncated, as a socket would
                let len = datagram.len().min(buffer.len());
                buffer[..len].copy_from_slice(&datagram[..len]);
                self.stats.record_received(len);
                Some(len)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.stats.recv_errors += 1;
                None
            }
        }
    }

    fn stats(&self) -> &TransportStats {
        &self.stats
    }
}
