//! Domain layer: bridge configuration types.
//!
//! Nothing in this module performs I/O other than reading the optional TOML
//! settings file; sockets and serial devices live in `infrastructure`.

pub mod config;

pub use config::{
    load_settings_file, BridgeConfig, BridgeSettings, ConfigError, ForwardConfig, ShutdownPolicy,
};
