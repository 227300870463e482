//! Application layer for the capture client.
//!
//! The capture use case depends only on the [`InputSource`] trait and on
//! tokio's `AsyncWrite`, so it runs unchanged against the evdev device and a
//! TCP socket in production, and against scripted sources and in-memory sinks
//! in tests.
//!
//! [`InputSource`]: crate::infrastructure::input_capture::InputSource

pub mod capture;

pub use capture::{CaptureError, CaptureStats, CaptureUseCase};
