//! The keyrelay wire format.
//!
//! Wire format:
//! ```text
//! [kind:1][code:1]
//! ```
//! Total message size: 2 bytes.  `kind` is [`PRESS_SENTINEL`] (key down) or
//! [`RELEASE_SENTINEL`] (key up); `code` is the Linux key code truncated to a
//! single byte.  There is no framing beyond the fixed record length, no
//! acknowledgment and no heartbeat: the sender cannot tell whether the bridge
//! is keeping up.
//!
//! The bridge never parses this format; it forwards the bytes to the serial
//! device as opaque payload.  Decoding lives here so both ends of the system
//! (and the tests) agree on one definition.

use thiserror::Error;

/// First byte of a "key down" message.
pub const PRESS_SENTINEL: u8 = 254;

/// First byte of a "key up" message.
pub const RELEASE_SENTINEL: u8 = 255;

/// Size in bytes of one encoded [`WireMessage`].
pub const WIRE_MESSAGE_SIZE: usize = 2;

/// Errors that can occur when decoding wire bytes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    /// The first byte is neither the press nor the release sentinel.
    #[error("unknown message kind: 0x{0:02X}")]
    UnknownKind(u8),
}

/// Direction of a key transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum KeyTransition {
    /// The key went down.
    Press = PRESS_SENTINEL,
    /// The key came back up.
    Release = RELEASE_SENTINEL,
}

impl KeyTransition {
    /// Returns the sentinel byte for this transition.
    pub fn sentinel(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for KeyTransition {
    type Error = WireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            PRESS_SENTINEL => Ok(KeyTransition::Press),
            RELEASE_SENTINEL => Ok(KeyTransition::Release),
            other => Err(WireError::UnknownKind(other)),
        }
    }
}

/// One key transition as it travels over TCP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WireMessage {
    /// Press or release.
    pub kind: KeyTransition,
    /// Key code, already known to fit in one byte.
    pub code: u8,
}

impl WireMessage {
    /// Builds a key-down message.
    pub fn press(code: u8) -> Self {
        Self {
            kind: KeyTransition::Press,
            code,
        }
    }

    /// Builds a key-up message.
    pub fn release(code: u8) -> Self {
        Self {
            kind: KeyTransition::Release,
            code,
        }
    }

    /// Encodes the message into its 2-byte wire form.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use keyrelay_core::WireMessage;
    ///
    /// assert_eq!(WireMessage::press(30).to_bytes(), [254, 30]);
    /// assert_eq!(WireMessage::release(30).to_bytes(), [255, 30]);
    /// ```
    pub fn to_bytes(self) -> [u8; WIRE_MESSAGE_SIZE] {
        [self.kind.sentinel(), self.code]
    }

    /// Decodes a message from its 2-byte wire form.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::UnknownKind`] if the first byte is not a sentinel.
    pub fn from_bytes(bytes: [u8; WIRE_MESSAGE_SIZE]) -> Result<Self, WireError> {
        Ok(Self {
            kind: KeyTransition::try_from(bytes[0])?,
            code: bytes[1],
        })
    }
}

/// Splits a byte stream into complete wire messages.
///
/// Returns the decoded messages and the number of bytes consumed.  A trailing
/// odd byte is left unconsumed so the caller can prepend it to the next read.
///
/// # Errors
///
/// Returns [`WireError`] on the first record with an unknown kind byte.
pub fn decode_stream(bytes: &[u8]) -> Result<(Vec<WireMessage>, usize), WireError> {
    let mut messages = Vec::with_capacity(bytes.len() / WIRE_MESSAGE_SIZE);
    let mut chunks = bytes.chunks_exact(WIRE_MESSAGE_SIZE);
    for chunk in &mut chunks {
        messages.push(WireMessage::from_bytes([chunk[0], chunk[1]])?);
    }
    let consumed = bytes.len() - chunks.remainder().len();
    Ok((messages, consumed))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
