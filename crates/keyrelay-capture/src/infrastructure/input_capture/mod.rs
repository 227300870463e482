//! Input capture infrastructure for the capture client.
//!
//! On Linux, key events come from an evdev character device
//! (`/dev/input/eventN`).  Each `read(2)` on the device yields whole
//! `struct input_event` records; [`EventStreamSource`] decodes them one at a
//! time from any async byte stream, so the same code reads the real device and
//! in-memory test data.
//!
//! # Testability
//!
//! The [`InputSource`] trait is the seam between the capture use case and the
//! device.  Unit tests use the `mockall`-generated `MockInputSource` or the
//! scripted [`mock::ScriptedInputSource`].

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use keyrelay_core::{InputEvent, INPUT_EVENT_SIZE};
use nix::unistd::{access, AccessFlags};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

pub mod mock;

/// Error type for input capture operations.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The device path does not exist.
    #[error("device '{0}' does not exist")]
    NotFound(PathBuf),

    /// The process may not read the device.
    #[error(
        "no read permission for device '{0}'; try running with sudo or adding your user to the input group"
    )]
    PermissionDenied(PathBuf),

    /// `open(2)` failed for another reason.
    #[error("failed to open input device '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Reading the next record failed.
    #[error("error reading input event: {0}")]
    Read(#[source] io::Error),
}

/// Trait abstracting input event production.
///
/// The production implementation reads the evdev device; tests use mocks.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InputSource: Send {
    /// Returns the next event, or `None` once the source is exhausted.
    async fn next_event(&mut self) -> Result<Option<InputEvent>, SourceError>;
}

/// Checks that `path` exists and is readable by this process.
///
/// Run before connecting so a missing device or a missing `input` group
/// membership is reported without touching the network.
///
/// # Errors
///
/// Returns [`SourceError::NotFound`] or [`SourceError::PermissionDenied`].
pub fn check_device_access(path: &Path) -> Result<(), SourceError> {
    if !path.exists() {
        return Err(SourceError::NotFound(path.to_path_buf()));
    }
    access(path, AccessFlags::R_OK).map_err(|_| SourceError::PermissionDenied(path.to_path_buf()))
}

/// Decodes fixed-size input records from a byte stream.
///
/// End-of-stream, including one in the middle of a record, ends the source.
#[derive(Debug)]
pub struct EventStreamSource<R> {
    reader: R,
    buf: [u8; INPUT_EVENT_SIZE],
}

impl<R> EventStreamSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: [0u8; INPUT_EVENT_SIZE],
        }
    }
}

impl EventStreamSource<tokio::fs::File> {
    /// Opens an evdev device read-only.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Open`] with the OS error.
    pub async fn open(path: &Path) -> Result<Self, SourceError> {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|source| SourceError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::new(file))
    }
}

#[async_trait]
impl<R> InputSource for EventStreamSource<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn next_event(&mut self) -> Result<Option<InputEvent>, SourceError> {
        let mut filled = 0;
        while filled < INPUT_EVENT_SIZE {
            let n = self
                .reader
                .read(&mut self.buf[filled..])
                .await
                .map_err(SourceError::Read)?;
            if n == 0 {
                if filled > 0 {
                    debug!("input stream ended inside a record ({filled} of {INPUT_EVENT_SIZE} bytes)");
                }
                return Ok(None);
            }
            filled += n;
        }
        Ok(Some(InputEvent::from_bytes(&self.buf)))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
