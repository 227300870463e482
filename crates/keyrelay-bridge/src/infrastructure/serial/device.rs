//! Serial device handle and its async read/write halves.
//!
//! The device is opened non-blocking and registered with the tokio reactor
//! through [`AsyncFd`].  A pending read therefore never pins an OS thread, and
//! the forwarding engine can drop a blocked read the moment the session ends.
//!
//! # Split ownership
//!
//! [`SerialDevice::into_split`] hands out a [`SerialReader`] and a
//! [`SerialWriter`] that refer to the same descriptor.  Each half only ever
//! issues its own syscalls (`read(2)` or `write(2)`), so the two forwarding
//! directions share the descriptor but no mutable state.  The descriptor is
//! closed when the last half is dropped.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};

use nix::fcntl::OFlag;
use thiserror::Error;
use tokio::io::unix::AsyncFd;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use super::line::{configure_line, read_line_state, LineConfigError, LineState};

/// Errors produced while opening or registering the serial device.
#[derive(Debug, Error)]
pub enum SerialError {
    /// `open(2)` failed (missing device, permission denied, ...).
    #[error("error opening serial port {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The descriptor could not be registered with the async reactor.
    #[error("failed to register serial port {path} with the reactor: {source}")]
    Register {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// An open serial device, exclusively owned by the bridge.
#[derive(Debug)]
pub struct SerialDevice {
    file: File,
    path: PathBuf,
}

impl SerialDevice {
    /// Opens `path` for reading and writing.
    ///
    /// Flags: `O_NOCTTY` so the device never becomes the controlling terminal,
    /// `O_SYNC` so writes reach the driver before returning, and `O_NONBLOCK`
    /// for reactor-driven I/O.
    ///
    /// # Errors
    ///
    /// Returns [`SerialError::Open`] with the OS error.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SerialError> {
        let path = path.as_ref().to_path_buf();
        let flags = OFlag::O_NOCTTY | OFlag::O_SYNC | OFlag::O_NONBLOCK;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(flags.bits())
            .open(&path)
            .map_err(|source| SerialError::Open {
                path: path.clone(),
                source,
            })?;
        Ok(Self { file, path })
    }

    /// Path the device was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Programs the line into raw 8N1 mode at `baud_rate`.
    ///
    /// # Errors
    ///
    /// See [`LineConfigError`].
    pub fn configure(&self, baud_rate: u32) -> Result<(), LineConfigError> {
        configure_line(&self.file, baud_rate)
    }

    /// Reads back the current line settings.
    ///
    /// # Errors
    ///
    /// See [`LineConfigError`].
    pub fn line_state(&self) -> Result<LineState, LineConfigError> {
        read_line_state(&self.file)
    }

    /// Registers the descriptor with the reactor and splits it into halves.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`SerialError::Register`] if the descriptor cannot be polled.
    pub fn into_split(self) -> Result<(SerialReader, SerialWriter), SerialError> {
        let path = self.path;
        let inner = AsyncFd::new(self.file).map_err(|source| SerialError::Register {
            path: path.clone(),
            source,
        })?;
        let inner = Arc::new(inner);
        Ok((
            SerialReader {
                inner: Arc::clone(&inner),
            },
            SerialWriter { inner },
        ))
    }
}

/// Read half of a [`SerialDevice`].
#[derive(Debug)]
pub struct SerialReader {
    inner: Arc<AsyncFd<File>>,
}

/// Write half of a [`SerialDevice`].
#[derive(Debug)]
pub struct SerialWriter {
    inner: Arc<AsyncFd<File>>,
}

impl AsyncRead for SerialReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        loop {
            let mut guard = ready!(self.inner.poll_read_ready(cx))?;
            let unfilled = buf.initialize_unfilled();
            let result = guard.try_io(|inner| {
                let mut file: &File = inner.get_ref();
                file.read(unfilled)
            });
            match result {
                Ok(Ok(n)) => {
                    buf.advance(n);
                    return Poll::Ready(Ok(()));
                }
                Ok(Err(e)) => return Poll::Ready(Err(e)),
                // Spurious readiness; the guard cleared it, poll again.
                Err(_would_block) => continue,
            }
        }
    }
}

impl AsyncWrite for SerialWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        loop {
            let mut guard = ready!(self.inner.poll_write_ready(cx))?;
            match guard.try_io(|inner| {
                let mut file: &File = inner.get_ref();
                file.write(buf)
            }) {
                Ok(result) => return Poll::Ready(result),
                Err(_would_block) => continue,
            }
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        // O_SYNC: every write has already reached the driver.
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
