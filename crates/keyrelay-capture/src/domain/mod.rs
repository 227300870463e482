//! Domain layer: capture client configuration.

pub mod config;

pub use config::CaptureConfig;
