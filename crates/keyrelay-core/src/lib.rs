//! # keyrelay-core
//!
//! Shared library for keyrelay containing the 2-byte key wire protocol and the
//! codec for Linux input-event records.
//!
//! This crate is used by both the capture client and the serial bridge.
//! It has no dependencies on OS APIs, sockets, or serial devices.
//!
//! # Architecture overview (for beginners)
//!
//! keyrelay forwards keystrokes from one machine to a serial device attached
//! to another.  The capture client reads key transitions from a Linux input
//! device (`/dev/input/eventN`), shrinks each one to two bytes, and sends it
//! over TCP.  The bridge copies those bytes, untouched, to a serial line.
//!
//! - **`protocol::wire`** – The only wire format in the system: a fixed
//!   `[kind, code]` record where `kind` says "key down" or "key up".
//!
//! - **`protocol::input_event`** – The fixed-size `struct input_event` record
//!   the kernel hands out, and the filter that turns a record into a wire
//!   message (or explains why it was dropped).

pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `keyrelay_core::WireMessage` instead of `keyrelay_core::protocol::wire::WireMessage`.
pub use protocol::input_event::{encode_key_event, InputEvent, SkipReason, INPUT_EVENT_SIZE};
pub use protocol::wire::{KeyTransition, WireError, WireMessage, PRESS_SENTINEL, RELEASE_SENTINEL};
