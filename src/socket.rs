use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};

use anyhow::Context;
use tracing::{error, info, warn};

#[cfg(test)]
use mockall::automock;

/// This is an abstraction for the non-blocking datagram socket the endpoint
///  drives, introduced to facilitate mocking the I/O part away for testing.
///
/// Implementations never block and never surface errors to the caller: a
///  datagram either goes out best-effort or is dropped with a log entry, and
///  the reliability layer above takes care of the rest.
#[cfg_attr(test, automock)]
pub trait DatagramSocket {
    /// Best-effort send of one datagram.
    fn send_packet(&self, to: SocketAddr, packet_buf: &[u8]);

    /// Non-blocking receive of one datagram into `buf`. `None` means nothing
    ///  is pending - the drain is complete.
    fn try_recv_packet(&self, buf: &mut [u8]) -> Option<(usize, SocketAddr)>;

    fn local_addr(&self) -> SocketAddr;
}

/// The production socket: a `std::net::UdpSocket` bound to all interfaces in
///  non-blocking mode. OS resources are released when it is dropped.
pub struct UdpDatagramSocket {
    socket: UdpSocket,
}

impl UdpDatagramSocket {
    pub fn bind(port: u16) -> anyhow::Result<UdpDatagramSocket> {
        let socket = UdpSocket::bind(("0.0.0.0", port))
            .with_context(|| format!("could not bind UDP socket on port {}", port))?;
        socket
            .set_nonblocking(true)
            .context("could not set non-blocking mode")?;

        info!("bound receive socket to {:?}", socket.local_addr()?);
        Ok(UdpDatagramSocket { socket })
    }
}

impl DatagramSocket for UdpDatagramSocket {
    fn send_packet(&self, to: SocketAddr, packet_buf: &[u8]) {
        match self.socket.send_to(packet_buf, to) {
            Ok(sent) if sent != packet_buf.len() => {
                warn!("short write sending UDP packet to {:?}: {} of {} bytes", to, sent, packet_buf.len());
            }
            Ok(_) => {}
            Err(e) => {
                error!("error sending UDP packet to {:?}: {}", to, e);
            }
        }
    }

    fn try_recv_packet(&self, buf: &mut [u8]) -> Option<(usize, SocketAddr)> {
        match self.socket.recv_from(buf) {
            Ok(x) => Some(x),
            Err(e) if e.kind() == ErrorKind::WouldBlock => None,
            Err(e) => {
                error!("socket error: {}", e);
                None
            }
        }
    }

    fn local_addr(&self) -> SocketAddr {
        self.socket
            .local_addr()
            .expect("a bound UdpSocket has a local addr")
    }
}
