//! Datagram transport seam between the engine and the network.
//!
//! The engine never touches a socket directly; it drives a
//! [`DatagramTransport`]. Production uses [`UdpTransport`], tests use
//! [`mock::MockTransport`].

pub mod mock;
pub mod udp;

pub use mock::MockTransport;
pub use udp::{TransportError, UdpTransport};

use std::io;

/// A connected, non-blocking datagram channel to one switcher.
///
/// `send` targets the connected peer; `recv` yields only its datagrams
/// and never blocks, returning `None` when nothing is waiting.
pub trait DatagramTransport: Send + Sync {
    /// Sends one datagram to the peer.
    fn send(&self, frame: &[u8]) -> io::Result<()>;

    /// Receives one datagram into `buf` if one is waiting, returning its
    /// length.
    fn recv(&self, buf: &mut [u8]) -> io::Result<Option<usize>>;
}
