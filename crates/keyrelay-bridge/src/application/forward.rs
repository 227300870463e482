//! Forwarding Engine: two independent byte-copy directions.
//!
//! ```text
//!  TCP connection ──(Inbound)──▶ serial device
//!  serial device  ──(Outbound)─▶ local output (stdout)
//! ```
//!
//! Each direction is a plain copy loop ([`copy_direction`]) that owns its own
//! source, sink and buffer.  The two loops never exchange data; they are polled
//! concurrently by [`forward`], which returns only after both have stopped.
//!
//! # Failure semantics
//!
//! - A read of zero bytes is end-of-stream.
//! - A read error ends the direction with [`TransportError::Read`].
//! - Each chunk is written with exactly one `write` call.  If the sink accepts
//!   fewer bytes than were read, the direction ends with
//!   [`TransportError::ShortWrite`]; partial writes are never retried.
//!
//! # Shutdown
//!
//! With [`ShutdownPolicy::CancelPeer`] the first direction to stop cancels the
//! other one at its next (or current) read.  With [`ShutdownPolicy::JoinBoth`]
//! a direction that reaches end-of-stream leaves the other one running, but a
//! direction that fails still cancels its peer: transport errors are fatal to
//! the whole session under either policy.  Cancellation is only observed while
//! a direction waits on its source, so a chunk is never half-written.

use std::fmt;
use std::io;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::domain::config::{ForwardConfig, ShutdownPolicy};

/// One half of the bidirectional relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// TCP connection → serial device.
    Inbound,
    /// Serial device → local output.
    Outbound,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Inbound => f.write_str("socket→serial"),
            Direction::Outbound => f.write_str("serial→output"),
        }
    }
}

/// Errors that end a forwarding direction.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The source returned an error.
    #[error("{direction}: read failed: {source}")]
    Read {
        direction: Direction,
        #[source]
        source: io::Error,
    },

    /// The sink returned an error.
    #[error("{direction}: write failed: {source}")]
    Write {
        direction: Direction,
        #[source]
        source: io::Error,
    },

    /// The sink accepted only part of a chunk.
    #[error("{direction}: short write ({written} of {requested} bytes)")]
    ShortWrite {
        direction: Direction,
        requested: usize,
        written: usize,
    },
}

/// Why a direction stopped.
#[derive(Debug)]
pub enum DirectionOutcome {
    /// The source reported end-of-stream.
    EndOfStream,
    /// The other direction ended first and this one was stopped.
    Cancelled,
    /// A transport error ended the direction.
    Failed(TransportError),
}

/// Final state of one direction.
#[derive(Debug)]
pub struct DirectionSummary {
    pub direction: Direction,
    /// Bytes fully written to the sink.
    pub bytes: u64,
    pub outcome: DirectionOutcome,
}

impl DirectionSummary {
    /// Returns the transport error, if the direction failed.
    pub fn error(&self) -> Option<&TransportError> {
        match &self.outcome {
            DirectionOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Result of a whole forwarding session.
#[derive(Debug)]
pub struct ForwardReport {
    pub inbound: DirectionSummary,
    pub outbound: DirectionSummary,
}

impl ForwardReport {
    /// Returns the first transport error, checking the inbound direction first.
    pub fn first_error(&self) -> Option<&TransportError> {
        self.inbound.error().or_else(|| self.outbound.error())
    }

    /// Converts the report into an error if either direction failed.
    ///
    /// # Errors
    ///
    /// Returns the inbound error if there is one, otherwise the outbound error.
    pub fn into_result(self) -> Result<(u64, u64), TransportError> {
        let ForwardReport { inbound, outbound } = self;
        match (inbound.outcome, outbound.outcome) {
            (DirectionOutcome::Failed(e), _) | (_, DirectionOutcome::Failed(e)) => Err(e),
            _ => Ok((inbound.bytes, outbound.bytes)),
        }
    }
}

/// Copies `src` to `dst` in chunks of at most `chunk` bytes until
/// end-of-stream, error, or `stop` is cancelled.
///
/// When `log_chunks` is set, every chunk's raw bytes are logged before they
/// are written.
pub async fn copy_direction<R, W>(
    direction: Direction,
    mut src: R,
    mut dst: W,
    chunk: usize,
    log_chunks: bool,
    stop: CancellationToken,
) -> DirectionSummary
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; chunk.max(1)];
    let mut bytes: u64 = 0;

    let outcome = loop {
        let read = tokio::select! {
            biased;
            _ = stop.cancelled() => break DirectionOutcome::Cancelled,
            read = src.read(&mut buf) => read,
        };

        let n = match read {
            Ok(0) => break DirectionOutcome::EndOfStream,
            Ok(n) => n,
            Err(source) => break DirectionOutcome::Failed(TransportError::Read { direction, source }),
        };

        let data = &buf[..n];
        if log_chunks {
            info!("{direction}: {}", hex_bytes(data));
        }

        match dst.write(data).await {
            Ok(written) if written == n => {}
            Ok(written) => {
                break DirectionOutcome::Failed(TransportError::ShortWrite {
                    direction,
                    requested: n,
                    written,
                })
            }
            Err(source) => {
                break DirectionOutcome::Failed(TransportError::Write { direction, source })
            }
        }
        if let Err(source) = dst.flush().await {
            break DirectionOutcome::Failed(TransportError::Write { direction, source });
        }

        bytes += n as u64;
    };

    debug!("{direction}: stopped after {bytes} bytes ({outcome:?})");
    DirectionSummary {
        direction,
        bytes,
        outcome,
    }
}

/// Runs both forwarding directions concurrently and waits for both to stop.
///
/// - `conn_rx` → `serial_tx` is the inbound direction (`config.inbound_chunk`).
/// - `serial_rx` → `output` is the outbound direction (`config.outbound_chunk`).
///
/// Each direction receives its own halves by value; nothing is shared between
/// them except the shutdown signal described by `config.shutdown`.
pub async fn forward<CR, SW, SR, O>(
    conn_rx: CR,
    serial_tx: SW,
    serial_rx: SR,
    output: O,
    config: &ForwardConfig,
) -> ForwardReport
where
    CR: AsyncRead + Unpin,
    SW: AsyncWrite + Unpin,
    SR: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
{
    let stop = CancellationToken::new();
    let cancel_peer = config.shutdown == ShutdownPolicy::CancelPeer;

    let inbound = async {
        let summary = copy_direction(
            Direction::Inbound,
            conn_rx,
            serial_tx,
            config.inbound_chunk,
            config.verbose,
            stop.clone(),
        )
        .await;
        if cancel_peer || summary.error().is_some() {
            stop.cancel();
        }
        summary
    };

    let outbound = async {
        let summary = copy_direction(
            Direction::Outbound,
            serial_rx,
            output,
            config.outbound_chunk,
            false,
            stop.clone(),
        )
        .await;
        if cancel_peer || summary.error().is_some() {
            stop.cancel();
        }
        summary
    };

    let (inbound, outbound) = tokio::join!(inbound, outbound);
    ForwardReport { inbound, outbound }
}

fn hex_bytes(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use std::time::Duration;
    use tokio::io::{duplex, AsyncWriteExt};

    /// Sink that accepts at most `limit` bytes per write call.
    struct ShortWriter {
        limit: usize,
        accepted: Vec<u8>,
    }

    impl AsyncWrite for ShortWriter {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            let n = buf.len().min(self.limit);
            self.accepted.extend_from_slice(&buf[..n]);
            Poll::Ready(Ok(n))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    /// Source that fails on the first read.
    struct FailingReader;

    impl AsyncRead for FailingReader {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut tokio::io::ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "device gone")))
        }
    }

    /// Runs one direction over an in-memory source preloaded with `input`.
    async fn copy_all(input: &[u8], chunk: usize) -> (DirectionSummary, Vec<u8>) {
        let mut sink = Vec::new();
        let summary = copy_direction(
            Direction::Inbound,
            input,
            &mut sink,
            chunk,
            false,
            CancellationToken::new(),
        )
        .await;
        (summary, sink)
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 + 3) as u8).collect()
    }

    #[tokio::test]
    async fn test_copy_empty_stream_ends_immediately() {
        let (summary, sink) = copy_all(&[], 2).await;
        assert!(matches!(summary.outcome, DirectionOutcome::EndOfStream));
        assert_eq!(summary.bytes, 0);
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_copy_single_byte() {
        let (summary, sink) = copy_all(&[0xAB], 2).await;
        assert_eq!(summary.bytes, 1);
        assert_eq!(sink, vec![0xAB]);
    }

    #[tokio::test]
    async fn test_copy_exactly_one_chunk() {
        let (summary, sink) = copy_all(&[254, 30], 2).await;
        assert_eq!(summary.bytes, 2);
        assert_eq!(sink, vec![254, 30]);
    }

    #[tokio::test]
    async fn test_copy_517_bytes_across_many_chunks_preserves_order() {
        // 517 is odd, so the final 2-byte chunk is a single byte.
        let input = pattern(517);
        let (summary, sink) = copy_all(&input, 2).await;
        assert!(matches!(summary.outcome, DirectionOutcome::EndOfStream));
        assert_eq!(summary.bytes, 517);
        assert_eq!(sink, input);
    }

    #[tokio::test]
    async fn test_copy_writes_each_read_with_one_write_call() {
        // Arrange: the client's bytes arrive in uneven segments
        let src = tokio_test::io::Builder::new()
            .read(&[254, 30, 255])
            .read(&[30])
            .build();
        let dst = tokio_test::io::Builder::new()
            .write(&[254, 30])
            .write(&[255])
            .write(&[30])
            .build();

        // Act
        let summary = copy_direction(
            Direction::Inbound,
            src,
            dst,
            2,
            true,
            CancellationToken::new(),
        )
        .await;

        // Assert: chunking follows the reads, capped at the chunk size
        assert!(matches!(summary.outcome, DirectionOutcome::EndOfStream));
        assert_eq!(summary.bytes, 4);
    }

    #[tokio::test]
    async fn test_copy_short_write_is_fatal_and_not_retried() {
        // Arrange: sink swallows only 1 byte per call
        let mut sink = ShortWriter {
            limit: 1,
            accepted: Vec::new(),
        };

        // Act
        let summary = copy_direction(
            Direction::Outbound,
            &[1u8, 2, 3, 4][..],
            &mut sink,
            2,
            false,
            CancellationToken::new(),
        )
        .await;

        // Assert: one partial chunk, then stop
        assert!(matches!(
            summary.error(),
            Some(TransportError::ShortWrite {
                direction: Direction::Outbound,
                requested: 2,
                written: 1
            })
        ));
        assert_eq!(summary.bytes, 0);
        assert_eq!(sink.accepted, vec![1]);
    }

    #[tokio::test]
    async fn test_copy_read_error_is_reported() {
        let mut sink = Vec::new();
        let summary = copy_direction(
            Direction::Outbound,
            FailingReader,
            &mut sink,
            256,
            false,
            CancellationToken::new(),
        )
        .await;
        assert!(matches!(summary.error(), Some(TransportError::Read { .. })));
    }

    #[tokio::test]
    async fn test_copy_stops_when_cancelled_while_waiting() {
        // Arrange: a source that never produces data
        let (_keep_open, idle) = duplex(64);
        let stop = CancellationToken::new();
        let mut sink = Vec::new();
        stop.cancel();

        // Act
        let summary = copy_direction(Direction::Outbound, idle, &mut sink, 256, false, stop).await;

        // Assert
        assert!(matches!(summary.outcome, DirectionOutcome::Cancelled));
    }

    #[tokio::test]
    async fn test_forward_inbound_and_outbound_are_independent() {
        // Arrange
        let inbound_input = pattern(517);
        let outbound_input = b"serial says hello\r\n".to_vec();
        let mut serial_sink = Vec::new();
        let mut output_sink = Vec::new();
        let config = ForwardConfig {
            shutdown: ShutdownPolicy::JoinBoth,
            ..ForwardConfig::default()
        };

        // Act
        let report = forward(
            &inbound_input[..],
            &mut serial_sink,
            &outbound_input[..],
            &mut output_sink,
            &config,
        )
        .await;

        // Assert: each sink received exactly its own stream
        assert_eq!(report.inbound.bytes, 517);
        assert_eq!(report.outbound.bytes, outbound_input.len() as u64);
        assert_eq!(serial_sink, inbound_input);
        assert_eq!(output_sink, outbound_input);
        assert!(report.first_error().is_none());
    }

    #[tokio::test]
    async fn test_forward_cancel_peer_stops_idle_direction_when_client_leaves() {
        // Arrange: client sends one message then closes; serial stays silent
        let (mut client, conn_rx) = duplex(64);
        let (_serial_peer, serial_rx) = duplex(64);
        let mut serial_sink = Vec::new();
        let mut output_sink = Vec::new();
        client.write_all(&[254, 30]).await.unwrap();
        drop(client);

        // Act
        let report = tokio::time::timeout(
            Duration::from_secs(5),
            forward(
                conn_rx,
                &mut serial_sink,
                serial_rx,
                &mut output_sink,
                &ForwardConfig::default(),
            ),
        )
        .await
        .expect("forward must return once the client disconnects");

        // Assert
        assert!(matches!(report.inbound.outcome, DirectionOutcome::EndOfStream));
        assert!(matches!(report.outbound.outcome, DirectionOutcome::Cancelled));
        assert_eq!(serial_sink, vec![254, 30]);
    }

    #[tokio::test]
    async fn test_forward_join_both_waits_for_second_direction() {
        // Arrange
        let (client, conn_rx) = duplex(64);
        let (mut serial_peer, serial_rx) = duplex(64);
        let config = ForwardConfig {
            shutdown: ShutdownPolicy::JoinBoth,
            ..ForwardConfig::default()
        };
        drop(client);

        let task = tokio::spawn(async move {
            let mut serial_sink = Vec::new();
            let mut output_sink = Vec::new();
            let report = forward(conn_rx, &mut serial_sink, serial_rx, &mut output_sink, &config).await;
            (report, output_sink)
        });

        // Act / Assert: inbound has ended, but forward is still running
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!task.is_finished(), "join-both must wait for the outbound direction");

        serial_peer.write_all(b"ok").await.unwrap();
        drop(serial_peer);
        let (report, output_sink) = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("forward must finish once both directions end")
            .unwrap();

        assert!(matches!(report.inbound.outcome, DirectionOutcome::EndOfStream));
        assert!(matches!(report.outbound.outcome, DirectionOutcome::EndOfStream));
        assert_eq!(output_sink, b"ok");
    }

    #[tokio::test]
    async fn test_forward_join_both_still_stops_peer_after_short_write() {
        // Arrange: serial accepts one byte per write, serial never answers
        let (mut client, conn_rx) = duplex(64);
        let (_serial_peer, serial_rx) = duplex(64);
        let config = ForwardConfig {
            shutdown: ShutdownPolicy::JoinBoth,
            ..ForwardConfig::default()
        };
        let mut serial_sink = ShortWriter {
            limit: 1,
            accepted: Vec::new(),
        };
        let mut output_sink = Vec::new();
        client.write_all(&[254, 30]).await.unwrap();

        // Act
        let report = tokio::time::timeout(
            Duration::from_secs(5),
            forward(conn_rx, &mut serial_sink, serial_rx, &mut output_sink, &config),
        )
        .await
        .expect("a short write must end the session under join-both");

        // Assert
        assert!(matches!(
            report.first_error(),
            Some(TransportError::ShortWrite {
                direction: Direction::Inbound,
                ..
            })
        ));
        assert!(matches!(report.outbound.outcome, DirectionOutcome::Cancelled));
        assert_eq!(serial_sink.accepted, vec![254]);
        drop(client);
    }

    #[tokio::test]
    async fn test_forward_join_both_still_stops_peer_after_write_error() {
        // Arrange: the serial side sends data the client cannot take
        let (mut client, conn_rx) = duplex(64);
        let (mut serial_peer, serial_rx) = duplex(64);
        let config = ForwardConfig {
            shutdown: ShutdownPolicy::JoinBoth,
            ..ForwardConfig::default()
        };
        let mut serial_sink = Vec::new();
        let mut output_sink = tokio_test::io::Builder::new()
            .write_error(io::Error::new(io::ErrorKind::BrokenPipe, "client gone"))
            .build();
        serial_peer.write_all(b"hi").await.unwrap();

        // Act
        let report = tokio::time::timeout(
            Duration::from_secs(5),
            forward(conn_rx, &mut serial_sink, serial_rx, &mut output_sink, &config),
        )
        .await
        .expect("a write error must end the session under join-both");

        // Assert
        assert!(report.outbound.error().is_some());
        assert!(matches!(report.inbound.outcome, DirectionOutcome::Cancelled));
        client.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_forward_short_write_ends_session_and_is_reported() {
        // Arrange: the serial sink accepts only one byte per write
        let (mut client, conn_rx) = duplex(64);
        let (_serial_peer, serial_rx) = duplex(64);
        let mut serial_sink = ShortWriter {
            limit: 1,
            accepted: Vec::new(),
        };
        let mut output_sink = Vec::new();
        client.write_all(&[254, 30, 255, 30]).await.unwrap();

        // Act
        let report = tokio::time::timeout(
            Duration::from_secs(5),
            forward(
                conn_rx,
                &mut serial_sink,
                serial_rx,
                &mut output_sink,
                &ForwardConfig::default(),
            ),
        )
        .await
        .expect("a short write must end the session");

        // Assert: both directions stopped, the short write is the session error
        assert!(matches!(
            report.first_error(),
            Some(TransportError::ShortWrite { direction: Direction::Inbound, .. })
        ));
        assert!(matches!(report.outbound.outcome, DirectionOutcome::Cancelled));
        assert!(report.into_result().is_err());
        drop(client);
    }

    #[test]
    fn test_hex_bytes_formatting() {
        assert_eq!(hex_bytes(&[0xFE, 0x1E]), "fe 1e");
        assert_eq!(hex_bytes(&[]), "");
    }

    #[test]
    fn test_direction_display() {
        assert_eq!(Direction::Inbound.to_string(), "socket→serial");
        assert_eq!(Direction::Outbound.to_string(), "serial→output");
    }
}
