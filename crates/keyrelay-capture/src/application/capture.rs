//! CaptureUseCase: turns input events into wire messages and sends them.
//!
//! ```text
//! InputSource ──InputEvent──▶ encode_key_event ──[kind, code]──▶ sink (TCP)
//! ```
//!
//! Each message is sent with exactly one write.  A write that accepts fewer
//! than two bytes is fatal; a partial message is never completed, because the
//! bridge would already have forwarded the half it received.

use std::io;

use keyrelay_core::{encode_key_event, InputEvent, KeyTransition, SkipReason, WireMessage};
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{info, trace, warn};

use crate::infrastructure::input_capture::{InputSource, SourceError};

/// Error type for the capture use case.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("failed to send data: {0}")]
    Send(#[source] io::Error),

    #[error("failed to send complete data ({written} of {expected} bytes)")]
    ShortSend { written: usize, expected: usize },
}

/// Counters reported when the capture loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    /// Records read from the source.
    pub events: u64,
    /// Wire messages sent.
    pub sent: u64,
    /// Key events dropped because of an unknown value or an oversized code.
    pub rejected: u64,
}

/// Reads events from `S` and writes wire messages to `W`.
pub struct CaptureUseCase<S, W> {
    source: S,
    sink: W,
    verbose: bool,
    stats: CaptureStats,
}

impl<S, W> CaptureUseCase<S, W>
where
    S: InputSource,
    W: AsyncWrite + Unpin,
{
    pub fn new(source: S, sink: W, verbose: bool) -> Self {
        Self {
            source,
            sink,
            verbose,
            stats: CaptureStats::default(),
        }
    }

    /// Counters so far.
    pub fn stats(&self) -> CaptureStats {
        self.stats
    }

    /// Processes one event.  Returns the message sent, if any.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::Send`] or [`CaptureError::ShortSend`].
    pub async fn handle_event(
        &mut self,
        event: &InputEvent,
    ) -> Result<Option<WireMessage>, CaptureError> {
        self.stats.events += 1;

        let message = match encode_key_event(event) {
            Ok(message) => message,
            Err(reason @ (SkipReason::UnknownValue(_) | SkipReason::CodeOutOfRange(_))) => {
                warn!("{reason}");
                self.stats.rejected += 1;
                return Ok(None);
            }
            Err(reason) => {
                trace!("skipping event: {reason}");
                return Ok(None);
            }
        };

        if self.verbose {
            match message.kind {
                KeyTransition::Press => info!("Key Down: {}", message.code),
                KeyTransition::Release => info!("Key Up: {}", message.code),
            }
        }

        self.send(message).await?;
        Ok(Some(message))
    }

    /// Runs until the source is exhausted or an error occurs.
    ///
    /// # Errors
    ///
    /// Any [`CaptureError`] ends the loop.
    pub async fn run(&mut self) -> Result<CaptureStats, CaptureError> {
        while let Some(event) = self.source.next_event().await? {
            self.handle_event(&event).await?;
        }
        Ok(self.stats)
    }

    async fn send(&mut self, message: WireMessage) -> Result<(), CaptureError> {
        let bytes = message.to_bytes();
        let written = self.sink.write(&bytes).await.map_err(CaptureError::Send)?;
        if written != bytes.len() {
            return Err(CaptureError::ShortSend {
                written,
                expected: bytes.len(),
            });
        }
        self.sink.flush().await.map_err(CaptureError::Send)?;
        self.stats.sent += 1;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
