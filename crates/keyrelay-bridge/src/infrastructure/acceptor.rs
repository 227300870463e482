//! Connection Acceptor: single-shot TCP listener.
//!
//! The bridge serves exactly one client per process.  The listener is created
//! with a backlog of one, and [`Acceptor::accept_one`] consumes the acceptor,
//! so once a client has been accepted there is no listener left to accept a
//! second one.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tracing::debug;

/// Pending-connection queue length passed to `listen(2)`.
pub const LISTEN_BACKLOG: u32 = 1;

/// Errors raised while setting up the client connection.
#[derive(Debug, Error)]
pub enum AcceptError {
    /// The listening socket could not be created.
    #[error("socket creation failed: {0}")]
    Socket(#[source] io::Error),

    /// `bind(2)` failed (port in use, no permission, ...).
    #[error("bind failed on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// `listen(2)` failed.
    #[error("listen failed on {addr}: {source}")]
    Listen {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// `accept(2)` failed.
    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),
}

/// A bound, listening socket waiting for its one client.
#[derive(Debug)]
pub struct Acceptor {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Acceptor {
    /// Binds `addr` and starts listening with a backlog of [`LISTEN_BACKLOG`].
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns the [`AcceptError`] variant for the step that failed.
    pub fn bind(addr: SocketAddr) -> Result<Self, AcceptError> {
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(AcceptError::Socket)?;

        socket
            .bind(addr)
            .map_err(|source| AcceptError::Bind { addr, source })?;

        let listener = socket
            .listen(LISTEN_BACKLOG)
            .map_err(|source| AcceptError::Listen { addr, source })?;

        // Port 0 binds an ephemeral port; report the real one.
        let local_addr = listener
            .local_addr()
            .map_err(|source| AcceptError::Listen { addr, source })?;

        debug!("listening on {local_addr} (backlog {LISTEN_BACKLOG})");
        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accepts one client and closes the listener.
    ///
    /// # Errors
    ///
    /// Returns [`AcceptError::Accept`] with the OS error.
    pub async fn accept_one(self) -> Result<(TcpStream, SocketAddr), AcceptError> {
        let (stream, peer) = self.listener.accept().await.map_err(AcceptError::Accept)?;
        // Keystrokes are 2-byte writes; do not let Nagle hold them back.
        if let Err(e) = stream.set_nodelay(true) {
            debug!("could not disable Nagle on connection from {peer}: {e}");
        }
        Ok((stream, peer))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn loopback_any_port() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    #[tokio::test]
    async fn test_bind_port_zero_reports_ephemeral_port() {
        let acceptor = Acceptor::bind(loopback_any_port()).unwrap();
        assert_ne!(acceptor.local_addr().port(), 0);
    }

    #[tokio::test]
    async fn test_bind_port_in_use_reports_bind_error() {
        // Arrange: occupy a port
        let first = Acceptor::bind(loopback_any_port()).unwrap();

        // Act
        let second = Acceptor::bind(first.local_addr());

        // Assert
        assert!(matches!(second, Err(AcceptError::Bind { .. })));
    }

    #[tokio::test]
    async fn test_accept_one_returns_connected_stream() {
        // Arrange
        let acceptor = Acceptor::bind(loopback_any_port()).unwrap();
        let addr = acceptor.local_addr();

        // Act
        let client = tokio::spawn(async move {
            let mut s = TcpStream::connect(addr).await.unwrap();
            s.write_all(&[254, 30]).await.unwrap();
            s
        });
        let (mut server_side, peer) = acceptor.accept_one().await.unwrap();
        let client_stream = client.await.unwrap();

        // Assert
        assert_eq!(peer, client_stream.local_addr().unwrap());
        let mut buf = [0u8; 2];
        server_side.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, [254, 30]);
    }

    #[tokio::test]
    async fn test_listener_is_closed_after_first_accept() {
        // Arrange: accept one client
        let acceptor = Acceptor::bind(loopback_any_port()).unwrap();
        let addr = acceptor.local_addr();
        let first = tokio::spawn(async move { TcpStream::connect(addr).await.unwrap() });
        let (_server_side, _) = acceptor.accept_one().await.unwrap();
        let _first = first.await.unwrap();

        // Act: a second client tries to connect
        let second = tokio::time::timeout(Duration::from_secs(2), TcpStream::connect(addr))
            .await
            .expect("connect must not hang once the listener is gone");

        // Assert: nobody is listening any more
        assert!(second.is_err(), "second connection must be refused");
    }
}
