//! Line Configurator: baud-rate mapping and raw-mode termios programming.
//!
//! The serial line is programmed exactly once, before any byte is forwarded.
//! All changes are made on an in-memory copy of the current attributes and
//! committed with a single `tcsetattr(TCSANOW)` call, so the device never sees
//! a half-configured line.
//!
//! # Resulting line discipline
//!
//! | Group   | Setting                                                         |
//! |---------|-----------------------------------------------------------------|
//! | framing | 8 data bits, no parity, 1 stop bit (8N1)                        |
//! | control | `CREAD \| CLOCAL`, no `CRTSCTS`                                  |
//! | local   | `ICANON ECHO ECHOE ECHONL ISIG` off                             |
//! | input   | `IXON IXOFF IXANY IGNBRK BRKINT PARMRK ISTRIP INLCR IGNCR ICRNL` off |
//! | output  | `OPOST ONLCR` off                                               |
//! | timing  | `VMIN = 1`, `VTIME = 10` (block for 1 byte, 1 s inter-byte timer) |

use std::os::fd::AsFd;

use nix::sys::termios::{
    self, BaudRate, ControlFlags, InputFlags, LocalFlags, OutputFlags, SetArg,
    SpecialCharacterIndices, Termios,
};
use thiserror::Error;

/// Minimum number of bytes a read waits for.
pub const READ_MIN_BYTES: u8 = 1;

/// Inter-byte read timeout in tenths of a second.
pub const READ_TIMEOUT_DECISECONDS: u8 = 10;

/// Every line speed the configurator accepts, paired with its termios constant.
pub const SUPPORTED_BAUD_RATES: [(u32, BaudRate); 30] = [
    (50, BaudRate::B50),
    (75, BaudRate::B75),
    (110, BaudRate::B110),
    (134, BaudRate::B134),
    (150, BaudRate::B150),
    (200, BaudRate::B200),
    (300, BaudRate::B300),
    (600, BaudRate::B600),
    (1200, BaudRate::B1200),
    (1800, BaudRate::B1800),
    (2400, BaudRate::B2400),
    (4800, BaudRate::B4800),
    (9600, BaudRate::B9600),
    (19200, BaudRate::B19200),
    (38400, BaudRate::B38400),
    (57600, BaudRate::B57600),
    (115200, BaudRate::B115200),
    (230400, BaudRate::B230400),
    (460800, BaudRate::B460800),
    (500000, BaudRate::B500000),
    (576000, BaudRate::B576000),
    (921600, BaudRate::B921600),
    (1000000, BaudRate::B1000000),
    (1152000, BaudRate::B1152000),
    (1500000, BaudRate::B1500000),
    (2000000, BaudRate::B2000000),
    (2500000, BaudRate::B2500000),
    (3000000, BaudRate::B3000000),
    (3500000, BaudRate::B3500000),
    (4000000, BaudRate::B4000000),
];

/// Errors produced while programming the serial line.
///
/// Every variant is fatal: the bridge must not forward bytes over a line in an
/// unknown state.
#[derive(Debug, Error)]
pub enum LineConfigError {
    /// The requested rate is not in [`SUPPORTED_BAUD_RATES`].
    #[error("invalid or unsupported baud rate: {0}")]
    UnsupportedBaudRate(u32),

    /// `tcgetattr` failed (not a terminal, bad descriptor, ...).
    #[error("failed to read serial line attributes: {0}")]
    GetAttributes(#[source] nix::Error),

    /// The device refused the requested speed.
    #[error("serial line rejected speed {baud}: {source}")]
    SetSpeed {
        baud: u32,
        #[source]
        source: nix::Error,
    },

    /// `tcsetattr` failed to commit the new attributes.
    #[error("failed to apply serial line attributes: {0}")]
    SetAttributes(#[source] nix::Error),
}

/// Snapshot of the line attributes that matter to the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineState {
    /// Output speed in baud, or `None` if it is not one of the supported rates.
    pub baud_rate: Option<u32>,
    /// `true` when every raw-mode setting from the module table is in effect.
    pub raw: bool,
    /// Current `VMIN`.
    pub read_min_bytes: u8,
    /// Current `VTIME`.
    pub read_timeout_deciseconds: u8,
}

/// Maps a plain integer rate (e.g. `115200`) to its termios speed constant.
///
/// # Errors
///
/// Returns [`LineConfigError::UnsupportedBaudRate`] for any value outside
/// [`SUPPORTED_BAUD_RATES`]; there is no fallback to a default speed.
pub fn baud_to_speed(baud_rate: u32) -> Result<BaudRate, LineConfigError> {
    SUPPORTED_BAUD_RATES
        .iter()
        .find(|(rate, _)| *rate == baud_rate)
        .map(|(_, speed)| *speed)
        .ok_or(LineConfigError::UnsupportedBaudRate(baud_rate))
}

/// Reverse of [`baud_to_speed`].
pub fn speed_to_baud(speed: BaudRate) -> Option<u32> {
    SUPPORTED_BAUD_RATES
        .iter()
        .find(|(_, s)| *s == speed)
        .map(|(rate, _)| *rate)
}

/// Programs the line behind `fd` into raw 8N1 mode at `baud_rate`.
///
/// The rate is validated before the device is touched, so an unsupported rate
/// leaves the line exactly as it was.
///
/// # Errors
///
/// See [`LineConfigError`]; each failing step has its own variant.
pub fn configure_line<Fd: AsFd>(fd: Fd, baud_rate: u32) -> Result<(), LineConfigError> {
    let speed = baud_to_speed(baud_rate)?;

    let mut tty = termios::tcgetattr(fd.as_fd()).map_err(LineConfigError::GetAttributes)?;

    termios::cfsetospeed(&mut tty, speed).map_err(|source| LineConfigError::SetSpeed {
        baud: baud_rate,
        source,
    })?;
    termios::cfsetispeed(&mut tty, speed).map_err(|source| LineConfigError::SetSpeed {
        baud: baud_rate,
        source,
    })?;

    apply_raw_mode(&mut tty);

    termios::tcsetattr(fd.as_fd(), SetArg::TCSANOW, &tty).map_err(LineConfigError::SetAttributes)
}

/// Reads back the current line attributes.
///
/// # Errors
///
/// Returns [`LineConfigError::GetAttributes`] if `fd` is not a terminal.
pub fn read_line_state<Fd: AsFd>(fd: Fd) -> Result<LineState, LineConfigError> {
    let tty = termios::tcgetattr(fd.as_fd()).map_err(LineConfigError::GetAttributes)?;
    Ok(LineState {
        baud_rate: speed_to_baud(termios::cfgetospeed(&tty)),
        raw: is_raw_mode(&tty),
        read_min_bytes: tty.control_chars[SpecialCharacterIndices::VMIN as usize],
        read_timeout_deciseconds: tty.control_chars[SpecialCharacterIndices::VTIME as usize],
    })
}

fn apply_raw_mode(tty: &mut Termios) {
    tty.control_flags
        .remove(ControlFlags::PARENB | ControlFlags::CSTOPB | ControlFlags::CSIZE);
    tty.control_flags.insert(ControlFlags::CS8);
    tty.control_flags.remove(ControlFlags::CRTSCTS);
    tty.control_flags
        .insert(ControlFlags::CREAD | ControlFlags::CLOCAL);

    tty.local_flags.remove(raw_local_flags());
    tty.input_flags.remove(raw_input_flags());
    tty.output_flags.remove(raw_output_flags());

    tty.control_chars[SpecialCharacterIndices::VMIN as usize] = READ_MIN_BYTES;
    tty.control_chars[SpecialCharacterIndices::VTIME as usize] = READ_TIMEOUT_DECISECONDS;
}

fn is_raw_mode(tty: &Termios) -> bool {
    let cflag = tty.control_flags;
    (cflag & ControlFlags::CSIZE) == ControlFlags::CS8
        && !cflag.intersects(ControlFlags::PARENB | ControlFlags::CSTOPB | ControlFlags::CRTSCTS)
        && cflag.contains(ControlFlags::CREAD | ControlFlags::CLOCAL)
        && !tty.local_flags.intersects(raw_local_flags())
        && !tty.input_flags.intersects(raw_input_flags())
        && !tty.output_flags.intersects(raw_output_flags())
        && tty.control_chars[SpecialCharacterIndices::VMIN as usize] == READ_MIN_BYTES
        && tty.control_chars[SpecialCharacterIndices::VTIME as usize] == READ_TIMEOUT_DECISECONDS
}

fn raw_local_flags() -> LocalFlags {
    LocalFlags::ICANON | LocalFlags::ECHO | LocalFlags::ECHOE | LocalFlags::ECHONL | LocalFlags::ISIG
}

fn raw_input_flags() -> InputFlags {
    InputFlags::IXON
        | InputFlags::IXOFF
        | InputFlags::IXANY
        | InputFlags::IGNBRK
        | InputFlags::BRKINT
        | InputFlags::PARMRK
        | InputFlags::ISTRIP
        | InputFlags::INLCR
        | InputFlags::IGNCR
        | InputFlags::ICRNL
}

fn raw_output_flags() -> OutputFlags {
    OutputFlags::OPOST | OutputFlags::ONLCR
}

// ── Tests ─────────────────────────────────────────────────────────────────────
