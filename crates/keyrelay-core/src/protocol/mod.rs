//! Protocol module containing the wire message type and the input-event codec.

pub mod input_event;
pub mod wire;

pub use input_event::{encode_key_event, InputEvent, SkipReason, EV_KEY, INPUT_EVENT_SIZE};
pub use wire::{decode_stream, KeyTransition, WireError, WireMessage, WIRE_MESSAGE_SIZE};
