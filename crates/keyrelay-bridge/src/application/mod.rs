//! Application layer for the bridge.
//!
//! The only use case here is the forwarding engine: given the two halves of a
//! client connection and the two halves of the serial device, copy bytes in
//! both directions until the session ends.
//!
//! The engine is generic over `AsyncRead`/`AsyncWrite`, so it knows nothing
//! about sockets or termios.  Tests drive it with in-memory pipes.

pub mod forward;

pub use forward::{
    copy_direction, forward, Direction, DirectionOutcome, DirectionSummary, ForwardReport,
    TransportError,
};
