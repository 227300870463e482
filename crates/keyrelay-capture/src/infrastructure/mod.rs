//! Infrastructure layer for keyrelay-capture.
//!
//! # Responsibilities
//!
//! - Checking and opening the evdev input device
//! - Decoding raw `input_event` records from the device
//! - Resolving the bridge address and opening the TCP connection
//!
//! # What does NOT belong here?
//!
//! - Deciding which events become wire messages (that is the application layer)
//! - Argument parsing (that is done in `main.rs`)

pub mod input_capture;
pub mod network;

pub use input_capture::{check_device_access, EventStreamSource, InputSource, SourceError};
pub use network::{connect, ConnectError};
