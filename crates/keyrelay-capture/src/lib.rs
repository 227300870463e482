//! keyrelay-capture library crate.
//!
//! Reads key transitions from a Linux input device and sends each one to a
//! keyrelay bridge as a 2-byte wire message.
//!
//! # Architecture
//!
//! ```text
//! /dev/input/eventN (struct input_event records)
//!         ↓
//! [keyrelay-capture]
//!   ├── domain/           CaptureConfig
//!   ├── application/      CaptureUseCase: filter, encode, send
//!   └── infrastructure/
//!         ├── input_capture/  InputSource trait, evdev stream decoder
//!         └── network         IPv4 connect to the bridge
//!         ↓
//! keyrelay-bridge (TCP)
//! ```

/// Domain layer: configuration.
pub mod domain;

/// Application layer: the capture loop.
pub mod application;

/// Infrastructure layer: input device and bridge connection.
pub mod infrastructure;
