//! keyrelay-bridge library crate.
//!
//! Accepts one TCP client and relays its bytes to a serial device configured
//! for raw 8N1 operation, while mirroring everything the device sends to the
//! local output.
//!
//! # Architecture
//!
//! ```text
//! TCP client (2-byte key messages)
//!         ↓
//! [keyrelay-bridge]
//!   ├── domain/           BridgeConfig, settings layers, shutdown policy
//!   ├── application/      Forwarding engine (two copy loops)
//!   └── infrastructure/
//!         ├── acceptor    Single-shot TCP listener
//!         ├── serial/     termios line setup + async device halves
//!         └── session     Opens, accepts, forwards, reports
//!         ↓
//! Serial device (raw 8N1)  ──▶  stdout
//! ```
//!
//! # Layer rules
//!
//! - `domain` performs no I/O apart from reading the optional settings file.
//! - `application` depends on `domain` and tokio's I/O traits only.
//! - `infrastructure` owns every descriptor.

/// Domain layer: configuration types.
pub mod domain;

/// Application layer: the forwarding engine.
pub mod application;

/// Infrastructure layer: serial device, TCP acceptor, session wiring.
pub mod infrastructure;
