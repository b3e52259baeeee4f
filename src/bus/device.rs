//! A bit-banged bus bound to one chip select.
//!
//! Every bus module on a socket owns one of these. [`BusDevice::open`]
//! performs the whole construction sequence: socket type check, pin
//! reservation at idle levels, bus setup, commit. Any failure leaves the
//! board with nothing reserved.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::{self, Operation, SpiBus};
use log::info;

use super::select::ChipSelect;
use super::shifter::{MAX_FRAME_WORDS, SoftSpi};
use crate::board::{Mainboard, Reservation, SocketType};
use crate::config::BusConfig;
use crate::error::{Error, Result};

pub struct BusDevice<SCK, MOSI, MISO, CS, D> {
    spi: SoftSpi<SCK, MOSI, MISO, D>,
    cs: ChipSelect<CS>,
}

/// Device type produced when opening on a mainboard socket.
pub type SocketDevice<B, D> = BusDevice<
    <B as Mainboard>::Output,
    <B as Mainboard>::Output,
    <B as Mainboard>::Input,
    <B as Mainboard>::Output,
    D,
>;

impl<O, I, D> BusDevice<O, O, I, O, D>
where
    O: OutputPin,
    I: InputPin,
    D: DelayNs,
{
    /// Reserve the standard bus pins of `socket` and bring the bus up idle.
    pub fn open<B>(
        board: &mut B,
        socket: u8,
        required: &[SocketType],
        driver: &'static str,
        config: &BusConfig,
        delay: D,
    ) -> Result<Self>
    where
        B: Mainboard<Output = O, Input = I>,
    {
        config.validate()?;
        let mut reservation = Reservation::open(board, socket, required, driver)?;
        let lines = reservation.spi_lines(config.mode(), config.select_polarity)?;
        let cs = ChipSelect::new(lines.cs, config.select_polarity)?;
        let spi = SoftSpi::from_config(lines.sck, lines.mosi, lines.miso, delay, config)?;
        let socket = reservation.commit();
        info!(
            "{}: on socket {} ({:?}, {:?})",
            driver,
            socket.number(),
            config.mode(),
            config.select_polarity
        );
        Ok(Self { spi, cs })
    }
}

impl<SCK, MOSI, MISO, CS, D> BusDevice<SCK, MOSI, MISO, CS, D>
where
    SCK: OutputPin,
    MOSI: OutputPin,
    MISO: InputPin,
    CS: OutputPin,
    D: DelayNs,
{
    pub fn new(spi: SoftSpi<SCK, MOSI, MISO, D>, cs: ChipSelect<CS>) -> Self {
        Self { spi, cs }
    }

    /// One word in one select frame.
    pub fn exchange(&mut self, word: u32, width: u8) -> Result<u32> {
        let replies = self.spi.transaction(&mut self.cs, &[word], width)?;
        Ok(replies.first().copied().unwrap_or(0))
    }

    pub fn transaction(
        &mut self,
        words: &[u32],
        width: u8,
    ) -> Result<heapless::Vec<u32, MAX_FRAME_WORDS>> {
        self.spi.transaction(&mut self.cs, words, width)
    }

    /// Run `body` inside one select frame.
    pub fn with_select<T, E, F>(&mut self, body: F) -> Result<T, E>
    where
        E: From<Error>,
        F: FnOnce(&mut SoftSpi<SCK, MOSI, MISO, D>) -> Result<T, E>,
    {
        self.spi.with_select(&mut self.cs, body)
    }

    pub fn delay_mut(&mut self) -> &mut D {
        self.spi.delay_mut()
    }

    pub fn release(self) -> (SoftSpi<SCK, MOSI, MISO, D>, ChipSelect<CS>) {
        (self.spi, self.cs)
    }
}

// ── embedded-hal SpiDevice ────────────────────────────────────

impl<SCK, MOSI, MISO, CS, D> spi::ErrorType for BusDevice<SCK, MOSI, MISO, CS, D> {
    type Error = Error;
}

impl<SCK, MOSI, MISO, CS, D> spi::SpiDevice<u8> for BusDevice<SCK, MOSI, MISO, CS, D>
where
    SCK: OutputPin,
    MOSI: OutputPin,
    MISO: InputPin,
    CS: OutputPin,
    D: DelayNs,
{
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<()> {
        self.spi.with_select(&mut self.cs, |spi| {
            for op in operations.iter_mut() {
                match op {
                    Operation::Read(buf) => spi.read(buf)?,
                    Operation::Write(buf) => spi.write(buf)?,
                    Operation::Transfer(read, write) => spi.transfer(read, write)?,
                    Operation::TransferInPlace(buf) => spi.transfer_in_place(buf)?,
                    Operation::DelayNs(ns) => spi.delay_mut().delay_ns(*ns),
                }
            }
            Ok(())
        })
    }
}
