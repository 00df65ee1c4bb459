//! UDP transport connected to one switcher.

use std::io;
use std::net::{SocketAddr, UdpSocket};

use thiserror::Error;
use tracing::debug;

use super::DatagramTransport;

/// Errors raised while bringing the socket up.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The local UDP socket could not be bound.
    #[error("failed to bind local socket on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// The socket could not be connected to the switcher address.
    #[error("failed to connect socket to {addr}: {source}")]
    ConnectFailed {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// The socket refused non-blocking mode.
    #[error("failed to set socket non-blocking: {0}")]
    Nonblocking(#[source] io::Error),
}

/// Non-blocking UDP socket connected to one switcher.
///
/// Connecting the socket lets the engine `send` without an address and
/// makes the OS drop datagrams from anything that is not the switcher.
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    /// Binds an ephemeral local port and connects it to the switcher.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the bind, connect, or non-blocking
    /// setup fails.
    pub fn connect(switcher: SocketAddr) -> Result<UdpTransport, TransportError> {
        let local = SocketAddr::from(([0, 0, 0, 0], 0));
        let socket = UdpSocket::bind(local)
            .map_err(|source| TransportError::BindFailed { addr: local, source })?;
        socket
            .connect(switcher)
            .map_err(|source| TransportError::ConnectFailed {
                addr: switcher,
                source,
            })?;
        socket
            .set_nonblocking(true)
            .map_err(TransportError::Nonblocking)?;
        debug!(%switcher, "udp transport connected");
        Ok(UdpTransport { socket })
    }

    /// The OS-assigned local address, for logs and diagnostics.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

impl DatagramTransport for UdpTransport {
    fn send(&self, frame: &[u8]) -> io::Result<()> {
        self.socket.send(frame).map(|_| ())
    }

    fn recv(&self, buf: &mut [u8]) -> io::Result<Option<usize>> {
        match self.socket.recv(buf) {
            Ok(len) => Ok(Some(len)),
            Err(e) if is_timeout_error(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Returns `true` for OS timeout / would-block errors that mean "nothing
/// waiting" rather than a real failure.
fn is_timeout_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
