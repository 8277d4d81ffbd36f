//! UDP socket transport.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

use tracing::{debug, trace};

use super::{Transport, TransportStats};
use crate::error::TransportError;

/// UDP socket wrapper for game networking.
///
/// This is a thin wrapper around std UDP with:
/// - Non-blocking mode
/// - An ephemeral local port, connected to one remote endpoint
/// - Packet statistics
#[derive(Debug, Default)]
pub struct UdpTransport {
    /// The underlying socket, present while connected.
    socket: Option<UdpSocket>,
    /// Statistics.
    stats: TransportStats,
}

impl UdpTransport {
    /// Creates a disconnected transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the local address while connected.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|socket| socket.local_addr().ok())
    }
}

impl Transport for UdpTransport {
    fn connect(&mut self, endpoint: SocketAddr) -> Result<(), TransportError> {
        let unspecified: SocketAddr = match endpoint {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(unspecified)?;
        socket.set_nonblocking(true)?;
        socket.connect(endpoint)?;

        debug!(local = ?socket.local_addr().ok(), %endpoint, "UDP transport connected");
        self.socket = Some(socket);
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.socket.take().is_some() {
            debug!("UDP transport disconnected");
        }
    }

    fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    fn send(&mut self, datagram: &[u8]) -> Result<(), TransportError> {
        let socket = self.socket.as_ref().ok_or(TransportError::NotConnected)?;
        match socket.send(datagram) {
            Ok(n) => {
                self.stats.record_sent(n);
                Ok(())
            }
            Err(e) => {
                self.stats.send_errors += 1;
                Err(e.into())
            }
        }
    }

    fn try_receive(&mut self, buffer: &mut [u8]) -> Option<usize> {
        let socket = self.socket.as_ref()?;
        match socket.recv(buffer) {
            Ok(len) => {
                self.stats.record_received(len);
                Some(len)
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => None,
            Err(e) => {
                // ICMP port-unreachable surfaces here on connected sockets
                trace!(error = %e, "UDP receive error");
                self.stats.recv_errors += 1;
                None
            }
        }
    }

    fn stats(&self) -> &TransportStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MAX_DATAGRAM_SIZE;

    #[test]
    fn test_send_before_connect_fails() {
        let mut transport = UdpTransport::new();
        assert!(!transport.is_connected());
        assert!(matches!(transport.send(b"x"), Err(TransportError::NotConnected)));

        let mut buffer = [0u8; 8];
        assert_eq!(transport.try_receive(&mut buffer), None);
    }

    #[test]
    fn test_loopback_exchange() {
        let peer = UdpSocket::bind("127.0.0.1:0").unwrap();
        let peer_addr = peer.local_addr().unwrap();

        let mut transport = UdpTransport::new();
        transport.connect(peer_addr).unwrap();
        assert!(transport.is_connected());

        transport.send(b"ping").unwrap();
        let mut buffer = [0u8; MAX_DATAGRAM_SIZE];
        let (len, from) = peer.recv_from(&mut buffer).unwrap();
        assert_eq!(&buffer[..len], b"ping");

        peer.send_to(b"pong", from).unwrap();
        let mut received = None;
        for _ in 0..200 {
            received = transport.try_receive(&mut buffer);
            if received.is_some() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        assert_eq!(received, Some(4));
        assert_eq!(&buffer[..4], b"pong");

        assert_eq!(transport.stats().packets_sent, 1);
        assert_eq!(transport.stats().packets_received, 1);

        transport.disconnect();
        transport.disconnect();
        assert!(!transport.is_connected());
    }
}
