//! Mainboard port: the boundary between module drivers and the board
//! that owns the physical sockets.
//!
//! ```text
//!   Driver::from_socket ──▶ Reservation ──▶ Mainboard (adapter)
//!                                             ├─ sim::SimBoard
//!                                             └─ esp_board::EspMainboard
//! ```
//!
//! A driver never names a GPIO number. It asks for a socket by number,
//! states which socket types it can live on, and receives one `Line`
//! (an `embedded-hal` pin) per socket pin it uses. The socket type check
//! happens before any pin is handed out.

pub mod reservation;

use embedded_hal::digital::{InputPin, OutputPin};

use crate::error::SocketError;

pub use reservation::{Reservation, SpiLines};

// ───────────────────────────────────────────────────────────────
// Socket types and pins
// ───────────────────────────────────────────────────────────────

/// Capability letters printed next to each socket on the mainboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketType {
    /// Three GPIO (pin 3 interrupt capable).
    X,
    /// Seven GPIO (pin 3 interrupt capable).
    Y,
    /// Analog inputs on pins 3–5.
    A,
    /// I²C on pins 8/9.
    I,
    /// UART with hardware handshake.
    K,
    /// PWM on pins 7–9.
    P,
    /// Hardware SPI on pins 7–9, chip select on 6.
    S,
    /// UART on pins 4/5.
    U,
    /// Manufacturer specific.
    Z,
}

impl SocketType {
    pub const fn letter(self) -> char {
        match self {
            Self::X => 'X',
            Self::Y => 'Y',
            Self::A => 'A',
            Self::I => 'I',
            Self::K => 'K',
            Self::P => 'P',
            Self::S => 'S',
            Self::U => 'U',
            Self::Z => 'Z',
        }
    }
}

/// Usable pins on a socket (1 and 2 are power rails, 10 is ground).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum SocketPin {
    Three = 3,
    Four = 4,
    Five = 5,
    Six = 6,
    Seven = 7,
    Eight = 8,
    Nine = 9,
}

impl SocketPin {
    pub const ALL: [SocketPin; 7] = [
        Self::Three,
        Self::Four,
        Self::Five,
        Self::Six,
        Self::Seven,
        Self::Eight,
        Self::Nine,
    ];

    pub const fn number(self) -> u8 {
        self as u8
    }

    /// Index into a 7-entry per-socket pin table.
    pub const fn index(self) -> usize {
        self as usize - 3
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Three => "P3",
            Self::Four => "P4",
            Self::Five => "P5",
            Self::Six => "P6",
            Self::Seven => "P7",
            Self::Eight => "P8",
            Self::Nine => "P9",
        }
    }
}

/// Fixed four-wire layout used by every bit-banged bus module.
pub mod spi_pins {
    use super::SocketPin;

    pub const CS: SocketPin = SocketPin::Six;
    pub const MOSI: SocketPin = SocketPin::Seven;
    pub const MISO: SocketPin = SocketPin::Eight;
    pub const SCK: SocketPin = SocketPin::Nine;
}

// ───────────────────────────────────────────────────────────────
// Socket descriptor
// ───────────────────────────────────────────────────────────────

/// A socket as reported by the mainboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Socket {
    number: u8,
    types: heapless::Vec<SocketType, 9>,
}

impl Socket {
    /// Duplicate letters are dropped; the set holds at most one of each type.
    pub fn new(number: u8, types: &[SocketType]) -> Self {
        let mut set = heapless::Vec::new();
        for &t in types {
            if !set.contains(&t) {
                // Capacity equals the number of variants, so this cannot fail.
                let _ = set.push(t);
            }
        }
        Self { number, types: set }
    }

    pub fn number(&self) -> u8 {
        self.number
    }

    pub fn types(&self) -> &[SocketType] {
        &self.types
    }

    pub fn supports(&self, t: SocketType) -> bool {
        self.types.contains(&t)
    }

    /// Succeeds when the socket carries at least one of `required`.
    pub fn ensure_type_supported(
        &self,
        required: &[SocketType],
        driver: &'static str,
    ) -> Result<(), SocketError> {
        if required.iter().any(|&t| self.supports(t)) {
            Ok(())
        } else {
            Err(SocketError::UnsupportedType {
                socket: self.number,
                driver,
            })
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Mainboard port (driven adapter: driver → board)
// ───────────────────────────────────────────────────────────────

/// Capability provider handing out exclusively-owned lines.
///
/// Implementations track which pins are reserved and must reject a second
/// reservation of the same pin with [`SocketError::PinInUse`].
pub trait Mainboard {
    type Output: OutputPin;
    type Input: InputPin;

    /// Describe a socket, or fail if the board has no such socket.
    fn socket(&self, number: u8) -> Result<Socket, SocketError>;

    /// Reserve a pin as a push-pull output driven to `initial`.
    fn reserve_output(
        &mut self,
        socket: &Socket,
        pin: SocketPin,
        initial: bool,
    ) -> Result<Self::Output, SocketError>;

    /// Reserve a pin as a floating input.
    fn reserve_input(&mut self, socket: &Socket, pin: SocketPin)
    -> Result<Self::Input, SocketError>;

    /// Return a pin to the free pool. Releasing a free pin is a no-op.
    fn release(&mut self, socket: &Socket, pin: SocketPin);
}
