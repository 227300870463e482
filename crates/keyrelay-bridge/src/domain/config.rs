//! Bridge configuration types.
//!
//! [`BridgeConfig`] is the single source of truth for all runtime settings.
//! It is resolved from up to three layers, highest precedence first:
//!
//! 1. command-line flags and `KEYRELAY_*` environment variables,
//! 2. an optional TOML file (`--config bridge.toml`),
//! 3. the built-in defaults.
//!
//! Each layer is a [`BridgeSettings`] whose fields are all optional; layers are
//! combined with [`BridgeSettings::overlay`] and turned into a validated
//! [`BridgeConfig`] with [`BridgeSettings::resolve`].
//!
//! ```toml
//! port = 65432
//! bind = "0.0.0.0"
//! device = "/dev/ttyUSB0"
//! baud = 115200
//! verbose = false
//! inbound_chunk = 2
//! outbound_chunk = 256
//! shutdown = "cancel-peer"   # or "join-both"
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default TCP listen port.
pub const DEFAULT_PORT: u16 = 65432;
/// Default serial device.
pub const DEFAULT_DEVICE: &str = "/dev/ttyUSB0";
/// Default line speed.
pub const DEFAULT_BAUD_RATE: u32 = 115200;
/// Default read size for the socket→serial direction (one wire message).
pub const DEFAULT_INBOUND_CHUNK: usize = 2;
/// Default read size for the serial→stdout direction.
pub const DEFAULT_OUTBOUND_CHUNK: usize = 256;

/// Error type for configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A chunk size of zero would make every read return end-of-stream.
    #[error("{name} must be at least 1 byte")]
    InvalidChunk { name: &'static str },

    /// The bind address is not an IP address.
    #[error("invalid bind address: '{0}'")]
    InvalidBind(String),
}

/// What the forwarding engine does when one direction finishes first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShutdownPolicy {
    /// Stop the other direction as soon as one ends, so the session tears
    /// down promptly when either peer goes away.
    #[default]
    CancelPeer,
    /// Let the other direction run on when one reaches end-of-stream.
    /// A transport error still stops both.
    JoinBoth,
}

/// Settings for one forwarding session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardConfig {
    /// Bytes per read on the socket→serial direction.
    pub inbound_chunk: usize,
    /// Bytes per read on the serial→stdout direction.
    pub outbound_chunk: usize,
    /// Log every inbound chunk's raw bytes.
    pub verbose: bool,
    /// Cross-direction shutdown behavior.
    pub shutdown: ShutdownPolicy,
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            inbound_chunk: DEFAULT_INBOUND_CHUNK,
            outbound_chunk: DEFAULT_OUTBOUND_CHUNK,
            verbose: false,
            shutdown: ShutdownPolicy::default(),
        }
    }
}

/// All runtime configuration for the bridge.
///
/// # Example
///
/// ```rust
/// use keyrelay_bridge::domain::BridgeConfig;
///
/// let cfg = BridgeConfig::default();
/// assert_eq!(cfg.listen_addr.port(), 65432);
/// assert_eq!(cfg.baud_rate, 115200);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Address the single-shot listener binds to (all interfaces by default).
    pub listen_addr: SocketAddr,
    /// Serial device path.
    pub device: PathBuf,
    /// Requested line speed; validated by the line configurator.
    pub baud_rate: u32,
    /// Forwarding engine settings.
    pub forward: ForwardConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            device: PathBuf::from(DEFAULT_DEVICE),
            baud_rate: DEFAULT_BAUD_RATE,
            forward: ForwardConfig::default(),
        }
    }
}

/// One configuration layer; `None` means "not set at this layer".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeSettings {
    pub port: Option<u16>,
    pub bind: Option<String>,
    pub device: Option<PathBuf>,
    pub baud: Option<u32>,
    pub verbose: Option<bool>,
    pub inbound_chunk: Option<usize>,
    pub outbound_chunk: Option<usize>,
    pub shutdown: Option<ShutdownPolicy>,
}

impl BridgeSettings {
    /// Returns `self` with every field that `upper` sets replaced by `upper`'s value.
    pub fn overlay(self, upper: BridgeSettings) -> BridgeSettings {
        BridgeSettings {
            port: upper.port.or(self.port),
            bind: upper.bind.or(self.bind),
            device: upper.device.or(self.device),
            baud: upper.baud.or(self.baud),
            verbose: upper.verbose.or(self.verbose),
            inbound_chunk: upper.inbound_chunk.or(self.inbound_chunk),
            outbound_chunk: upper.outbound_chunk.or(self.outbound_chunk),
            shutdown: upper.shutdown.or(self.shutdown),
        }
    }

    /// Fills unset fields with defaults and validates the result.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBind`] or [`ConfigError::InvalidChunk`].
    pub fn resolve(self) -> Result<BridgeConfig, ConfigError> {
        let defaults = BridgeConfig::default();

        let ip = match self.bind {
            Some(bind) => bind
                .parse::<IpAddr>()
                .map_err(|_| ConfigError::InvalidBind(bind))?,
            None => defaults.listen_addr.ip(),
        };
        let port = self.port.unwrap_or(DEFAULT_PORT);

        let forward = ForwardConfig {
            inbound_chunk: non_zero(
                "inbound_chunk",
                self.inbound_chunk.unwrap_or(DEFAULT_INBOUND_CHUNK),
            )?,
            outbound_chunk: non_zero(
                "outbound_chunk",
                self.outbound_chunk.unwrap_or(DEFAULT_OUTBOUND_CHUNK),
            )?,
            verbose: self.verbose.unwrap_or(false),
            shutdown: self.shutdown.unwrap_or_default(),
        };

        Ok(BridgeConfig {
            listen_addr: SocketAddr::new(ip, port),
            device: self.device.unwrap_or(defaults.device),
            baud_rate: self.baud.unwrap_or(DEFAULT_BAUD_RATE),
            forward,
        })
    }
}

/// Reads one settings layer from a TOML file.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read and
/// [`ConfigError::Parse`] if it is not valid TOML for [`BridgeSettings`].
pub fn load_settings_file(path: &Path) -> Result<BridgeSettings, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&text)?)
}

fn non_zero(name: &'static str, value: usize) -> Result<usize, ConfigError> {
    if value == 0 {
        Err(ConfigError::InvalidChunk { name })
    } else {
        Ok(value)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
