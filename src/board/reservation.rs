//! All-or-nothing pin reservation for driver construction.
//!
//! A [`Reservation`] checks the socket type first, then records every pin
//! it takes from the board. If construction bails out (any `?` before
//! [`Reservation::commit`]), dropping the reservation hands every pin back,
//! so a failed driver never leaves half a socket claimed.

use log::{debug, warn};

use super::{Mainboard, Socket, SocketPin, SocketType, spi_pins};
use crate::bus::clock::ClockMode;
use crate::bus::select::Polarity;
use crate::error::SocketError;

/// The four lines of a bit-banged bus, freshly reserved.
pub struct SpiLines<O, I> {
    pub sck: O,
    pub mosi: O,
    pub miso: I,
    pub cs: O,
}

pub struct Reservation<'b, B: Mainboard> {
    board: &'b mut B,
    socket: Socket,
    taken: heapless::Vec<SocketPin, 7>,
    committed: bool,
}

impl<'b, B: Mainboard> Reservation<'b, B> {
    /// Look up the socket and verify its type. No pin is touched on failure.
    pub fn open(
        board: &'b mut B,
        socket: u8,
        required: &[SocketType],
        driver: &'static str,
    ) -> Result<Self, SocketError> {
        let socket = board.socket(socket)?;
        socket.ensure_type_supported(required, driver)?;
        debug!("reservation: socket {} opened for {}", socket.number(), driver);
        Ok(Self {
            board,
            socket,
            taken: heapless::Vec::new(),
            committed: false,
        })
    }

    pub fn socket(&self) -> &Socket {
        &self.socket
    }

    pub fn output(&mut self, pin: SocketPin, initial: bool) -> Result<B::Output, SocketError> {
        let line = self.board.reserve_output(&self.socket, pin, initial)?;
        self.record(pin);
        Ok(line)
    }

    pub fn input(&mut self, pin: SocketPin) -> Result<B::Input, SocketError> {
        let line = self.board.reserve_input(&self.socket, pin)?;
        self.record(pin);
        Ok(line)
    }

    /// Reserve CS, SCK, MOSI and MISO with CS and SCK already at idle.
    pub fn spi_lines(
        &mut self,
        mode: ClockMode,
        select: Polarity,
    ) -> Result<SpiLines<B::Output, B::Input>, SocketError> {
        let cs = self.output(spi_pins::CS, select.idle().is_high())?;
        let sck = self.output(spi_pins::SCK, mode.idle.is_high())?;
        let mosi = self.output(spi_pins::MOSI, false)?;
        let miso = self.input(spi_pins::MISO)?;
        Ok(SpiLines { sck, mosi, miso, cs })
    }

    /// Keep every reserved pin and return the socket descriptor.
    pub fn commit(mut self) -> Socket {
        self.committed = true;
        self.socket.clone()
    }

    fn record(&mut self, pin: SocketPin) {
        // Seven slots, one per socket pin; the board refuses duplicates.
        let _ = self.taken.push(pin);
    }
}

impl<B: Mainboard> Drop for Reservation<'_, B> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if !self.taken.is_empty() {
            warn!(
                "reservation: rolling back {} pin(s) on socket {}",
                self.taken.len(),
                self.socket.number()
            );
        }
        while let Some(pin) = self.taken.pop() {
            self.board.release(&self.socket, pin);
        }
    }
}
