//! Capture client configuration.

use std::path::PathBuf;

/// Default bridge host.
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default bridge port.  Kept as text: it is handed to name resolution as-is.
pub const DEFAULT_PORT: &str = "65432";
/// Default evdev device.
pub const DEFAULT_DEVICE: &str = "/dev/input/event0";

/// All runtime configuration for the capture client.
///
/// # Example
///
/// ```rust
/// use keyrelay_capture::domain::CaptureConfig;
///
/// let cfg = CaptureConfig::default();
/// assert_eq!(cfg.endpoint(), "127.0.0.1:65432");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Bridge host name or IPv4 address.
    pub host: String,
    /// Bridge port.
    pub port: String,
    /// Input device to read key events from.
    pub device: PathBuf,
    /// Log every key transition that is sent.
    pub verbose: bool,
}

impl CaptureConfig {
    /// `host:port` as shown in log lines.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT.to_string(),
            device: PathBuf::from(DEFAULT_DEVICE),
            verbose: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_bridge_defaults() {
        let cfg = CaptureConfig::default();
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.port, "65432");
        assert_eq!(cfg.device, PathBuf::from("/dev/input/event0"));
        assert!(!cfg.verbose);
    }

    #[test]
    fn test_endpoint_joins_host_and_port() {
        let cfg = CaptureConfig {
            host: "pi.local".to_string(),
            port: "7000".to_string(),
            ..CaptureConfig::default()
        };
        assert_eq!(cfg.endpoint(), "pi.local:7000");
    }
}
