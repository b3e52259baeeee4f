//! HD44780 character LCD over the 4-bit nibble interface.
//!
//! Each byte goes out as two nibbles, high first. For each nibble RS and
//! D4..D7 are set, then E is strobed high and back low; the controller
//! latches on the falling edge. E is driven through a [`BitClock`] in
//! idle-low mode, so the strobe is the clock's pulse-then-settle cycle.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{OutputPin, PinState};
use log::{debug, info};

use crate::board::{Mainboard, Reservation, SocketPin, SocketType};
use crate::bus::clock::{BitClock, ClockMode};
use crate::error::{self, Error, Result};

pub const SOCKET_TYPES: &[SocketType] = &[SocketType::Y];

pub const E_PIN: SocketPin = SocketPin::Three;
pub const RS_PIN: SocketPin = SocketPin::Four;
/// D4, D5, D6, D7 in nibble bit order.
pub const DATA_PINS: [SocketPin; 4] = [
    SocketPin::Five,
    SocketPin::Seven,
    SocketPin::Nine,
    SocketPin::Six,
];
pub const BACKLIGHT_PIN: SocketPin = SocketPin::Eight;

/// E high/low hold time (ns).
const STROBE_NS: u32 = 1_000;
/// Typical instruction execution time (µs).
const EXEC_US: u32 = 50;
/// Clear and home take much longer (ms).
const SLOW_EXEC_MS: u32 = 2;

/// DDRAM address of column 0 for each row.
pub const ROW_OFFSETS: [u8; 4] = [0x00, 0x40, 0x14, 0x54];

/// Power-on sequence: force 8-bit mode twice, drop to 4-bit, 2 lines 5x8,
/// display on, left-to-right entry, clear.
pub const INIT_SEQUENCE: [u8; 6] = [0x33, 0x32, 0x28, 0x0C, 0x06, 0x01];

mod cmd {
    pub const CLEAR: u8 = 0x01;
    pub const HOME: u8 = 0x02;
    pub const DISPLAY_CONTROL: u8 = 0x08;
    pub const DISPLAY_ON: u8 = 0x04;
    pub const CURSOR_ON: u8 = 0x02;
    pub const BLINK_ON: u8 = 0x01;
    pub const SET_DDRAM: u8 = 0x80;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub rows: u8,
    pub cols: u8,
}

impl Default for Geometry {
    fn default() -> Self {
        Self { rows: 2, cols: 16 }
    }
}

impl Geometry {
    pub fn validate(&self) -> Result<()> {
        if !(1..=4).contains(&self.rows) {
            return Err(Error::InvalidParameter("rows must be 1..=4"));
        }
        if !(1..=40).contains(&self.cols) {
            return Err(Error::InvalidParameter("cols must be 1..=40"));
        }
        Ok(())
    }
}

pub struct CharLcd<O, D> {
    enable: BitClock<O, D>,
    rs: O,
    data: [O; 4],
    backlight: Option<O>,
    geometry: Geometry,
    display_control: u8,
}

impl<O: OutputPin, D: DelayNs> CharLcd<O, D> {
    /// Open on a Y socket with the backlight on. Call [`init`](Self::init)
    /// before writing.
    pub fn from_socket<B>(board: &mut B, socket: u8, delay: D, geometry: Geometry) -> Result<Self>
    where
        B: Mainboard<Output = O>,
    {
        geometry.validate()?;
        let mut reservation = Reservation::open(board, socket, SOCKET_TYPES, "CharLcd")?;
        let enable = reservation.output(E_PIN, false)?;
        let rs = reservation.output(RS_PIN, false)?;
        let [d4, d5, d6, d7] = DATA_PINS;
        let data = [
            reservation.output(d4, false)?,
            reservation.output(d5, false)?,
            reservation.output(d6, false)?,
            reservation.output(d7, false)?,
        ];
        let backlight = reservation.output(BACKLIGHT_PIN, true)?;
        let enable = BitClock::new(enable, delay, ClockMode::MODE_0, STROBE_NS)?;
        let socket = reservation.commit();
        info!(
            "CharLcd: {}x{} on socket {}",
            geometry.rows,
            geometry.cols,
            socket.number()
        );
        Ok(Self::with_clock(enable, rs, data, Some(backlight), geometry))
    }

    pub fn new(
        enable: O,
        rs: O,
        data: [O; 4],
        backlight: Option<O>,
        delay: D,
        geometry: Geometry,
    ) -> Result<Self> {
        geometry.validate()?;
        let enable = BitClock::new(enable, delay, ClockMode::MODE_0, STROBE_NS)?;
        Ok(Self::with_clock(enable, rs, data, backlight, geometry))
    }

    fn with_clock(
        enable: BitClock<O, D>,
        rs: O,
        data: [O; 4],
        backlight: Option<O>,
        geometry: Geometry,
    ) -> Self {
        Self {
            enable,
            rs,
            data,
            backlight,
            geometry,
            display_control: cmd::DISPLAY_CONTROL | cmd::DISPLAY_ON,
        }
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn init(&mut self) -> Result<()> {
        self.enable.delay_mut().delay_ms(50);
        for (i, &byte) in INIT_SEQUENCE.iter().enumerate() {
            self.command(byte)?;
            // The two mode-forcing bytes need the long wait.
            if i < 2 {
                self.enable.delay_mut().delay_ms(5);
            }
        }
        self.enable.delay_mut().delay_ms(SLOW_EXEC_MS);
        debug!("lcd: initialised");
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        self.command(cmd::CLEAR)?;
        self.enable.delay_mut().delay_ms(SLOW_EXEC_MS);
        Ok(())
    }

    pub fn home(&mut self) -> Result<()> {
        self.command(cmd::HOME)?;
        self.enable.delay_mut().delay_ms(SLOW_EXEC_MS);
        Ok(())
    }

    /// Zero-based row and column.
    pub fn set_cursor(&mut self, row: u8, col: u8) -> Result<()> {
        if row >= self.geometry.rows || col >= self.geometry.cols {
            return Err(Error::InvalidParameter("cursor outside display"));
        }
        self.command(cmd::SET_DDRAM | (ROW_OFFSETS[usize::from(row)] + col))
    }

    /// Characters outside ASCII print as `?`.
    pub fn put_char(&mut self, c: char) -> Result<()> {
        let byte = if c.is_ascii() { c as u8 } else { b'?' };
        self.write_byte(true, byte)
    }

    pub fn print(&mut self, text: &str) -> Result<()> {
        for c in text.chars() {
            self.put_char(c)?;
        }
        Ok(())
    }

    pub fn cursor(&mut self, on: bool, blink: bool) -> Result<()> {
        let mut control = cmd::DISPLAY_CONTROL | (self.display_control & cmd::DISPLAY_ON);
        if on {
            control |= cmd::CURSOR_ON;
        }
        if blink {
            control |= cmd::BLINK_ON;
        }
        self.display_control = control;
        self.command(control)
    }

    /// Blank or restore the display; DDRAM and cursor settings are kept.
    pub fn display(&mut self, on: bool) -> Result<()> {
        if on {
            self.display_control |= cmd::DISPLAY_ON;
        } else {
            self.display_control &= !cmd::DISPLAY_ON;
        }
        self.command(self.display_control)
    }

    /// No-op when the backlight is not wired.
    pub fn backlight(&mut self, on: bool) -> Result<()> {
        if let Some(line) = self.backlight.as_mut() {
            line.set_state(PinState::from(on)).map_err(error::line)?;
        }
        Ok(())
    }

    fn command(&mut self, byte: u8) -> Result<()> {
        self.write_byte(false, byte)
    }

    fn write_byte(&mut self, data: bool, byte: u8) -> Result<()> {
        self.rs.set_state(PinState::from(data)).map_err(error::line)?;
        self.write_nibble(byte >> 4)?;
        self.write_nibble(byte & 0x0F)?;
        self.enable.delay_mut().delay_us(EXEC_US);
        Ok(())
    }

    fn write_nibble(&mut self, nibble: u8) -> Result<()> {
        for (bit, line) in self.data.iter_mut().enumerate() {
            line.set_state(PinState::from(nibble & (1 << bit) != 0))
                .map_err(error::line)?;
        }
        self.enable.pulse()
    }
}
