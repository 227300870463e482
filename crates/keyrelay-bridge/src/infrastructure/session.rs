//! One bridge session: serial device + one TCP client + the forwarding engine.
//!
//! ```text
//! Bridge::prepare()
//!  ├─ SerialDevice::open        O_NOCTTY | O_SYNC | O_NONBLOCK
//!  ├─ SerialDevice::configure   raw 8N1 at the configured baud
//!  ├─ SerialDevice::into_split  reactor registration
//!  └─ Acceptor::bind            backlog 1
//! Bridge::run()
//!  ├─ Acceptor::accept_one      listener closed afterwards
//!  └─ forward()                 both directions until the session ends
//! ```
//!
//! Every descriptor is owned by a local in [`Bridge::run`] and dropped when it
//! returns, so the device and the socket are released before the process exits.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::io::AsyncWrite;
use tracing::{debug, info};

use crate::application::forward::{forward, ForwardReport};
use crate::domain::config::BridgeConfig;
use crate::infrastructure::acceptor::{AcceptError, Acceptor};
use crate::infrastructure::serial::{
    LineConfigError, SerialDevice, SerialError, SerialReader, SerialWriter,
};

/// Errors raised while setting up a session.  All of them are fatal.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Serial(#[from] SerialError),

    #[error("failed to configure serial port {path}: {source}")]
    Line {
        path: PathBuf,
        #[source]
        source: LineConfigError,
    },

    #[error(transparent)]
    Accept(#[from] AcceptError),
}

/// A configured serial device and a listening socket, ready for one client.
#[derive(Debug)]
pub struct Bridge {
    config: BridgeConfig,
    serial_rx: SerialReader,
    serial_tx: SerialWriter,
    acceptor: Acceptor,
}

impl Bridge {
    /// Opens and configures the serial device, then starts listening.
    ///
    /// The device is set up before the socket is bound, so a bad device path
    /// or baud rate is reported without ever accepting a client.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] for the step that failed.
    pub fn prepare(config: BridgeConfig) -> Result<Self, SessionError> {
        let device = SerialDevice::open(&config.device)?;
        device
            .configure(config.baud_rate)
            .map_err(|source| SessionError::Line {
                path: config.device.clone(),
                source,
            })?;
        match device.line_state() {
            Ok(state) => debug!("serial line {}: {state:?}", config.device.display()),
            Err(e) => debug!("could not read back serial line state: {e}"),
        }
        let (serial_rx, serial_tx) = device.into_split()?;

        let acceptor = Acceptor::bind(config.listen_addr)?;
        info!(
            "Server listening on port {} and forwarding to {}",
            acceptor.local_addr().port(),
            config.device.display()
        );

        Ok(Self {
            config,
            serial_rx,
            serial_tx,
            acceptor,
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.acceptor.local_addr()
    }

    /// Serial device path.
    pub fn device_path(&self) -> &Path {
        &self.config.device
    }

    /// Accepts one client and forwards until the session ends.
    ///
    /// Serial output is written to `output` (stdout in the binary).  The
    /// returned report carries any transport error; it is not turned into an
    /// `Err` here so the caller can log both directions first.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Accept`] if no client could be accepted.
    pub async fn run<O>(self, output: O) -> Result<ForwardReport, SessionError>
    where
        O: AsyncWrite + Unpin,
    {
        let Bridge {
            config,
            serial_rx,
            serial_tx,
            acceptor,
        } = self;

        let (stream, peer) = acceptor.accept_one().await?;
        info!("Connection accepted from {peer}. Starting forwarding...");

        // The write half stays alive for the whole session: the peer must not
        // see a half-close just because nothing is sent back to it.
        let (conn_rx, conn_tx) = stream.into_split();

        let report = forward(conn_rx, serial_tx, serial_rx, output, &config.forward).await;
        drop(conn_tx);

        info!(
            "Connection closed ({} bytes to serial, {} bytes from serial)",
            report.inbound.bytes, report.outbound.bytes
        );
        Ok(report)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
