//! Serial line infrastructure: termios configuration and the async device handle.

pub mod device;
pub mod line;

pub use device::{SerialDevice, SerialError, SerialReader, SerialWriter};
pub use line::{baud_to_speed, configure_line, LineConfigError, LineState, SUPPORTED_BAUD_RATES};
