//! Linux input-event records and the key-transition filter.
//!
//! The kernel delivers events from `/dev/input/eventN` as fixed-size
//! `struct input_event` records (see `linux/input.h`):
//!
//! ```text
//! [tv_sec:long][tv_usec:long][type:u16][code:u16][value:i32]
//! ```
//!
//! `long` is 8 bytes on 64-bit targets, giving a 24-byte record.  All fields
//! are in native byte order because the record never leaves the machine that
//! produced it.

use std::os::raw::c_long;

use thiserror::Error;

use crate::protocol::wire::WireMessage;

/// Size of one `timeval` member (`tv_sec` or `tv_usec`).
const TIME_FIELD_SIZE: usize = std::mem::size_of::<c_long>();

/// Size in bytes of one `struct input_event` record on this target.
pub const INPUT_EVENT_SIZE: usize = 2 * TIME_FIELD_SIZE + 8;

/// Event type for key and button state changes.
pub const EV_KEY: u16 = 0x01;

/// `value` of an `EV_KEY` event when the key is released.
pub const KEY_RELEASE: i32 = 0;
/// `value` of an `EV_KEY` event when the key is pressed.
pub const KEY_PRESS: i32 = 1;
/// `value` of an `EV_KEY` event generated by keyboard auto-repeat.
pub const KEY_REPEAT: i32 = 2;

/// One decoded `struct input_event`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputEvent {
    /// Timestamp seconds.
    pub seconds: i64,
    /// Timestamp microseconds.
    pub microseconds: i64,
    /// Event type (`EV_KEY`, `EV_SYN`, `EV_MSC`, ...).
    pub event_type: u16,
    /// Type-specific code; for `EV_KEY` this is the key code.
    pub code: u16,
    /// Type-specific value; for `EV_KEY` 0 = release, 1 = press, 2 = repeat.
    pub value: i32,
}

/// Why an input event produced no wire message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SkipReason {
    /// The record is not a key transition (sync, scan-code, relative axis, ...).
    #[error("event type 0x{event_type:02X} is not a key event")]
    NotAKeyEvent { event_type: u16 },

    /// Auto-repeat events are never forwarded.
    #[error("key auto-repeat")]
    AutoRepeat,

    /// The key event carries a value other than 0, 1 or 2.
    #[error("unknown key event value: {0}")]
    UnknownValue(i32),

    /// The key code cannot be represented in the 1-byte wire field.
    #[error("key code {0} too large, skipping")]
    CodeOutOfRange(u16),
}

impl InputEvent {
    /// Builds an `EV_KEY` event with a zero timestamp.
    pub fn key(code: u16, value: i32) -> Self {
        Self {
            event_type: EV_KEY,
            code,
            value,
            ..Self::default()
        }
    }

    /// Decodes one record from its raw kernel representation.
    pub fn from_bytes(bytes: &[u8; INPUT_EVENT_SIZE]) -> Self {
        let mut at = 0;
        let seconds = read_long(bytes, &mut at);
        let microseconds = read_long(bytes, &mut at);
        let event_type = u16::from_ne_bytes(field(bytes, &mut at));
        let code = u16::from_ne_bytes(field(bytes, &mut at));
        let value = i32::from_ne_bytes(field(bytes, &mut at));
        Self {
            seconds,
            microseconds,
            event_type,
            code,
            value,
        }
    }

    /// Encodes the record into its raw kernel representation.
    ///
    /// Timestamps wider than the target's `long` are truncated.
    pub fn to_bytes(&self) -> [u8; INPUT_EVENT_SIZE] {
        let mut out = [0u8; INPUT_EVENT_SIZE];
        let mut at = 0;
        write_long(&mut out, &mut at, self.seconds);
        write_long(&mut out, &mut at, self.microseconds);
        put(&mut out, &mut at, &self.event_type.to_ne_bytes());
        put(&mut out, &mut at, &self.code.to_ne_bytes());
        put(&mut out, &mut at, &self.value.to_ne_bytes());
        out
    }

    /// Returns `true` if this record describes a key or button change.
    pub fn is_key_event(&self) -> bool {
        self.event_type == EV_KEY
    }
}

/// Turns an input event into the wire message the capture client sends.
///
/// Rules, applied in order:
/// 1. Non-`EV_KEY` records are skipped.
/// 2. Value 1 is a press, value 0 a release, value 2 (auto-repeat) is skipped,
///    any other value is skipped as unknown.
/// 3. Codes above 255 are skipped rather than silently truncated.
///
/// # Errors
///
/// Returns the [`SkipReason`] when the event must not be forwarded.
///
/// # Examples
///
/// ```rust
/// use keyrelay_core::{encode_key_event, InputEvent, SkipReason, WireMessage};
///
/// assert_eq!(encode_key_event(&InputEvent::key(30, 1)), Ok(WireMessage::press(30)));
/// assert_eq!(encode_key_event(&InputEvent::key(30, 2)), Err(SkipReason::AutoRepeat));
/// ```
pub fn encode_key_event(event: &InputEvent) -> Result<WireMessage, SkipReason> {
    if !event.is_key_event() {
        return Err(SkipReason::NotAKeyEvent {
            event_type: event.event_type,
        });
    }

    let press = match event.value {
        KEY_PRESS => true,
        KEY_RELEASE => false,
        KEY_REPEAT => return Err(SkipReason::AutoRepeat),
        other => return Err(SkipReason::UnknownValue(other)),
    };

    let code = u8::try_from(event.code).map_err(|_| SkipReason::CodeOutOfRange(event.code))?;

    Ok(if press {
        WireMessage::press(code)
    } else {
        WireMessage::release(code)
    })
}

// ── Byte helpers ──────────────────────────────────────────────────────────────

fn field<const N: usize>(bytes: &[u8], at: &mut usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[*at..*at + N]);
    *at += N;
    out
}

fn put(out: &mut [u8], at: &mut usize, bytes: &[u8]) {
    out[*at..*at + bytes.len()].copy_from_slice(bytes);
    *at += bytes.len();
}

fn read_long(bytes: &[u8], at: &mut usize) -> i64 {
    if TIME_FIELD_SIZE == 8 {
        i64::from_ne_bytes(field(bytes, at))
    } else {
        i64::from(i32::from_ne_bytes(field(bytes, at)))
    }
}

fn write_long(out: &mut [u8], at: &mut usize, value: i64) {
    if TIME_FIELD_SIZE == 8 {
        put(out, at, &value.to_ne_bytes());
    } else {
        put(out, at, &(value as i32).to_ne_bytes());
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
