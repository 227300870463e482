//! keyrelay-bridge: single-session TCP-to-serial bridge.
//!
//! Listens for one TCP client, writes every byte it sends to a serial device
//! in raw 8N1 mode, and mirrors everything the device sends to stdout.  The
//! process exits when the session ends.
//!
//! # Usage
//!
//! ```text
//! keyrelay-bridge [OPTIONS]
//!
//! Options:
//!   -p, --port <PORT>            TCP port to listen on [default: 65432]
//!   -d, --device <PATH>          Serial device [default: /dev/ttyUSB0]
//!   -b, --baud <RATE>            Line speed [default: 115200]
//!   -v, --verbose                Log every received chunk
//!       --bind <IP>              Listen address [default: 0.0.0.0]
//!       --inbound-chunk <N>      Bytes per socket read [default: 2]
//!       --outbound-chunk <N>     Bytes per serial read [default: 256]
//!       --shutdown <POLICY>      cancel-peer or join-both [default: cancel-peer]
//!   -c, --config <PATH>          TOML settings file
//! ```
//!
//! # Precedence
//!
//! Command-line flags and `KEYRELAY_*` environment variables override the
//! settings file, which overrides the built-in defaults.
//!
//! Logs go to stderr; stdout carries only the serial device's output.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use keyrelay_bridge::domain::{load_settings_file, BridgeConfig, BridgeSettings, ShutdownPolicy};
use keyrelay_bridge::infrastructure::Bridge;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Forward keystroke bytes from one TCP client to a serial device.
///
/// Every value is optional here so that an unset flag falls through to the
/// settings file and then to the defaults.
#[derive(Debug, Parser)]
#[command(
    name = "keyrelay-bridge",
    about = "Single-session TCP-to-serial bridge for keyrelay",
    version
)]
struct Cli {
    /// TCP port to listen on [default: 65432].
    #[arg(short, long, env = "KEYRELAY_PORT")]
    port: Option<u16>,

    /// Serial device path [default: /dev/ttyUSB0].
    #[arg(short, long, env = "KEYRELAY_DEVICE")]
    device: Option<PathBuf>,

    /// Serial line speed in baud [default: 115200].
    #[arg(short, long, env = "KEYRELAY_BAUD")]
    baud: Option<u32>,

    /// Log the raw bytes of every chunk received from the client.
    #[arg(short, long, env = "KEYRELAY_VERBOSE")]
    verbose: bool,

    /// IP address to listen on [default: 0.0.0.0].
    #[arg(long, env = "KEYRELAY_BIND")]
    bind: Option<String>,

    /// Bytes per read on the socket→serial direction [default: 2].
    #[arg(long)]
    inbound_chunk: Option<usize>,

    /// Bytes per read on the serial→stdout direction [default: 256].
    #[arg(long)]
    outbound_chunk: Option<usize>,

    /// What happens to the other direction when one side ends
    /// [default: cancel-peer].
    #[arg(long, value_enum, env = "KEYRELAY_SHUTDOWN")]
    shutdown: Option<ShutdownArg>,

    /// TOML settings file.
    #[arg(short, long, env = "KEYRELAY_CONFIG")]
    config: Option<PathBuf>,
}

/// Command-line spelling of [`ShutdownPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum ShutdownArg {
    CancelPeer,
    JoinBoth,
}

impl From<ShutdownArg> for ShutdownPolicy {
    fn from(arg: ShutdownArg) -> Self {
        match arg {
            ShutdownArg::CancelPeer => ShutdownPolicy::CancelPeer,
            ShutdownArg::JoinBoth => ShutdownPolicy::JoinBoth,
        }
    }
}

impl Cli {
    /// The settings layer given on the command line (and environment).
    fn to_settings(&self) -> BridgeSettings {
        BridgeSettings {
            port: self.port,
            bind: self.bind.clone(),
            device: self.device.clone(),
            baud: self.baud,
            verbose: self.verbose.then_some(true),
            inbound_chunk: self.inbound_chunk,
            outbound_chunk: self.outbound_chunk,
            shutdown: self.shutdown.map(ShutdownPolicy::from),
        }
    }

    /// Resolves the final configuration: CLI over file over defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings file cannot be read or parsed, or if
    /// the combined settings are invalid.
    fn into_bridge_config(self) -> anyhow::Result<BridgeConfig> {
        let file = match &self.config {
            Some(path) => load_settings_file(path)
                .with_context(|| format!("failed to load config file {}", path.display()))?,
            None => BridgeSettings::default(),
        };
        file.overlay(self.to_settings())
            .resolve()
            .context("invalid configuration")
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_bridge_config()?;

    // `RUST_LOG` wins; otherwise `info`, or `debug` with --verbose.
    let default_level = if config.forward.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(
        "keyrelay-bridge {} starting ({:?})",
        env!("CARGO_PKG_VERSION"),
        config
    );

    let bridge = Bridge::prepare(config).context("failed to start bridge")?;
    let report = bridge
        .run(tokio::io::stdout())
        .await
        .context("failed to accept a client")?;

    if let Some(e) = report.first_error() {
        error!("session ended with an error: {e}");
    }
    report.into_result().context("forwarding failed")?;
    info!("Exiting.");
    Ok(())
}

// ── Unit tests ────────────────────────────────────────────────────────────────
