//! Unified error types for the module drivers.
//!
//! A single `Error` enum that every layer converts into: socket/pin
//! allocation at construction time, caller parameter checks, HAL pin
//! failures, and device-level sensing anomalies. All variants are `Copy`
//! so they pass through the bus and device layers without allocation.

use core::fmt;

use embedded_hal::digital;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The mainboard could not provide the socket or pins a driver needs.
    Socket(SocketError),
    /// A caller-supplied width, channel, position or speed is out of range.
    InvalidParameter(&'static str),
    /// The HAL reported a failure driving or sampling a line.
    Line(digital::ErrorKind),
    /// A device produced no usable reading.
    Sensor(SensorError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Socket(e) => write!(f, "socket: {e}"),
            Self::InvalidParameter(msg) => write!(f, "invalid parameter: {msg}"),
            Self::Line(kind) => write!(f, "line: {kind}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
        }
    }
}

impl core::error::Error for Error {}

impl embedded_hal::spi::Error for Error {
    fn kind(&self) -> embedded_hal::spi::ErrorKind {
        embedded_hal::spi::ErrorKind::Other
    }
}

/// Map any HAL pin error into [`Error::Line`].
pub(crate) fn line<E: digital::Error>(e: E) -> Error {
    Error::Line(e.kind())
}

// ---------------------------------------------------------------------------
// Socket errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketError {
    /// The mainboard has no socket with this number.
    NoSuchSocket(u8),
    /// The socket does not carry any of the types the driver requires.
    UnsupportedType {
        socket: u8,
        driver: &'static str,
    },
    /// The pin is already owned by another driver.
    PinInUse { socket: u8, pin: u8 },
    /// The socket type lists the pin but the board does not route it.
    PinNotRouted { socket: u8, pin: u8 },
    /// The board failed to configure the pin (platform error code).
    PinConfigFailed { socket: u8, pin: u8, code: i32 },
}

impl fmt::Display for SocketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSuchSocket(n) => write!(f, "no socket {n}"),
            Self::UnsupportedType { socket, driver } => {
                write!(f, "socket {socket} lacks a type required by {driver}")
            }
            Self::PinInUse { socket, pin } => write!(f, "socket {socket} pin {pin} in use"),
            Self::PinNotRouted { socket, pin } => {
                write!(f, "socket {socket} pin {pin} not routed")
            }
            Self::PinConfigFailed { socket, pin, code } => {
                write!(f, "socket {socket} pin {pin} config failed (rc={code})")
            }
        }
    }
}

impl From<SocketError> for Error {
    fn from(e: SocketError) -> Self {
        Self::Socket(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// Too many samples without an echo (or with an implausible one).
    NoEcho,
    /// Reading is outside the physically plausible range.
    OutOfRange,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoEcho => write!(f, "no echo"),
            Self::OutOfRange => write!(f, "reading out of range"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T, E = Error> = core::result::Result<T, E>;
