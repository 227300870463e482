//! keyrelay-capture: forward key events from a Linux input device to a bridge.
//!
//! # Usage
//!
//! ```text
//! keyrelay-capture [OPTIONS]
//!
//! Options:
//!   -H, --host <HOST>      Bridge host [default: 127.0.0.1]
//!   -p, --port <PORT>      Bridge port [default: 65432]
//!   -d, --device <PATH>    Input device [default: /dev/input/event0]
//!   -v, --verbose          Log every key transition sent
//! ```
//!
//! Reading `/dev/input/eventN` usually requires root or membership in the
//! `input` group.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use keyrelay_capture::application::CaptureUseCase;
use keyrelay_capture::domain::config::{CaptureConfig, DEFAULT_DEVICE, DEFAULT_HOST, DEFAULT_PORT};
use keyrelay_capture::infrastructure::{check_device_access, connect, EventStreamSource};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Forward key presses and releases from a Linux input device to a keyrelay
/// bridge.
#[derive(Debug, Parser)]
#[command(
    name = "keyrelay-capture",
    about = "Send key events from a Linux input device to a keyrelay bridge",
    version
)]
struct Cli {
    /// Bridge host name or IPv4 address.
    #[arg(short = 'H', long, default_value = DEFAULT_HOST, env = "KEYRELAY_HOST")]
    host: String,

    /// Bridge port.
    #[arg(short, long, default_value = DEFAULT_PORT, env = "KEYRELAY_PORT")]
    port: String,

    /// Input event device.
    #[arg(short, long, default_value = DEFAULT_DEVICE, env = "KEYRELAY_INPUT")]
    device: PathBuf,

    /// Log every key transition that is sent.
    #[arg(short, long, env = "KEYRELAY_VERBOSE")]
    verbose: bool,
}

impl Cli {
    fn into_capture_config(self) -> CaptureConfig {
        CaptureConfig {
            host: self.host,
            port: self.port,
            device: self.device,
            verbose: self.verbose,
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_capture_config();

    let default_level = if config.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    check_device_access(&config.device)?;
    let source = EventStreamSource::open(&config.device).await?;

    let stream = connect(&config.host, &config.port)
        .await
        .with_context(|| format!("could not connect to bridge at {}", config.endpoint()))?;
    info!(
        "Connected to {}, reading from {}",
        config.endpoint(),
        config.device.display()
    );
    if config.verbose {
        info!("Verbose mode enabled");
    }

    let mut capture = CaptureUseCase::new(source, stream, config.verbose);
    let stats = capture.run().await.context("capture stopped")?;
    info!(
        "input device closed: {} events read, {} messages sent, {} rejected",
        stats.events, stats.sent, stats.rejected
    );
    Ok(())
}

// ── Unit tests ────────────────────────────────────────────────────────────────
