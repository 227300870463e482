//! Connection to the bridge.
//!
//! The bridge listens on IPv4 only, so name resolution keeps IPv4 results and
//! the client connects to the first one.  There is no retry: a failed connect
//! is fatal.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::{lookup_host, TcpStream};
use tracing::{debug, warn};

/// Errors that can occur while connecting to the bridge.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Name resolution failed (unknown host, non-numeric port, ...).
    #[error("failed to resolve {target}: {source}")]
    Resolve {
        target: String,
        #[source]
        source: io::Error,
    },

    /// The host resolved, but not to any IPv4 address.
    #[error("{target} has no IPv4 address")]
    NoIpv4Address { target: String },

    /// TCP connection to the resolved address failed.
    #[error("connection to {addr} failed: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}

/// Resolves `host:port` and connects to the first IPv4 address.
///
/// # Errors
///
/// Returns the [`ConnectError`] variant for the step that failed.
pub async fn connect(host: &str, port: &str) -> Result<TcpStream, ConnectError> {
    let target = format!("{host}:{port}");
    let addr = lookup_host(target.as_str())
        .await
        .map_err(|source| ConnectError::Resolve {
            target: target.clone(),
            source,
        })?
        .find(SocketAddr::is_ipv4)
        .ok_or_else(|| ConnectError::NoIpv4Address {
            target: target.clone(),
        })?;

    debug!("{target} resolved to {addr}");
    let stream = TcpStream::connect(addr)
        .await
        .map_err(|source| ConnectError::Connect { addr, source })?;

    // Each key message is a 2-byte write.
    if let Err(e) = stream.set_nodelay(true) {
        warn!("could not disable Nagle on connection to {addr}: {e}");
    }
    Ok(stream)
}
