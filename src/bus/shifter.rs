//! Word shifter: N-bit words over a [`BitClock`], most significant bit
//! first, always full duplex.
//!
//! Bit `width - 1` goes out first; the same mask `1 << index` selects the
//! outgoing bit and places the incoming one, so a loopback wire returns
//! the word unchanged.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::{ErrorType, SpiBus};
use log::trace;

use super::clock::{BitClock, ClockMode};
use super::select::{ChipSelect, Selected};
use crate::config::BusConfig;
use crate::error::{Error, Result};

/// Widest word a single shift can carry.
pub const MAX_WIDTH: u8 = 32;

/// Most words [`SoftSpi::transaction`] exchanges under one select.
pub const MAX_FRAME_WORDS: usize = 8;

/// Reject widths the shifter cannot represent.
pub const fn check_width(width: u8) -> Result<()> {
    if width == 0 || width > MAX_WIDTH {
        Err(Error::InvalidParameter("word width must be 1..=32"))
    } else {
        Ok(())
    }
}

pub struct SoftSpi<SCK, MOSI, MISO, D> {
    clock: BitClock<SCK, D>,
    mosi: MOSI,
    miso: MISO,
}

impl<SCK, MOSI, MISO, D> SoftSpi<SCK, MOSI, MISO, D>
where
    SCK: OutputPin,
    MOSI: OutputPin,
    MISO: InputPin,
    D: DelayNs,
{
    pub fn new(
        sck: SCK,
        mosi: MOSI,
        miso: MISO,
        delay: D,
        mode: ClockMode,
        settle_ns: u32,
    ) -> Result<Self> {
        let clock = BitClock::new(sck, delay, mode, settle_ns)?;
        Ok(Self { clock, mosi, miso })
    }

    /// Build from a validated, possibly persisted, bus profile.
    pub fn from_config(
        sck: SCK,
        mosi: MOSI,
        miso: MISO,
        delay: D,
        config: &BusConfig,
    ) -> Result<Self> {
        config.validate()?;
        Self::new(sck, mosi, miso, delay, config.mode(), config.settle_ns)
    }

    pub fn mode(&self) -> ClockMode {
        self.clock.mode()
    }

    pub fn delay_mut(&mut self) -> &mut D {
        self.clock.delay_mut()
    }

    pub fn shift_out_bit(&mut self, value: bool) -> Result<()> {
        self.clock.shift_out_bit(&mut self.mosi, value)
    }

    pub fn shift_in_bit(&mut self) -> Result<bool> {
        self.clock.shift_in_bit(&mut self.miso)
    }

    /// Send `out` and return whatever the device shifted back.
    pub fn shift_word(&mut self, out: u32, width: u8) -> Result<u32> {
        check_width(width)?;
        let mut inbound = 0u32;
        for index in (0..width).rev() {
            let mask = 1u32 << index;
            if self
                .clock
                .transfer_bit(&mut self.mosi, &mut self.miso, out & mask != 0)?
            {
                inbound |= mask;
            }
        }
        trace!("shift: out={:#x} in={:#x} width={}", out, inbound, width);
        Ok(inbound)
    }

    pub fn write_word(&mut self, out: u32, width: u8) -> Result<()> {
        self.shift_word(out, width).map(|_| ())
    }

    /// Clock a word in while transmitting zeros.
    pub fn read_word(&mut self, width: u8) -> Result<u32> {
        self.shift_word(0, width)
    }

    /// Run `body` with the device selected.
    ///
    /// Select is asserted before the first clock edge and deasserted after
    /// the last, whichever way `body` exits.
    pub fn with_select<CS, T, E, F>(&mut self, cs: &mut ChipSelect<CS>, body: F) -> Result<T, E>
    where
        CS: OutputPin,
        E: From<Error>,
        F: FnOnce(&mut Self) -> Result<T, E>,
    {
        let guard = Selected::assert(cs)?;
        match body(self) {
            Ok(value) => {
                guard.finish()?;
                Ok(value)
            }
            Err(e) => {
                drop(guard);
                Err(e)
            }
        }
    }

    /// One transaction exchanging every word of `words` in place.
    pub fn transfer_words<CS: OutputPin>(
        &mut self,
        cs: &mut ChipSelect<CS>,
        words: &mut [u32],
        width: u8,
    ) -> Result<()> {
        check_width(width)?;
        self.with_select(cs, |spi| {
            for word in words.iter_mut() {
                *word = spi.shift_word(*word, width)?;
            }
            Ok(())
        })
    }

    /// One transaction sending `words` and collecting the replies.
    pub fn transaction<CS: OutputPin>(
        &mut self,
        cs: &mut ChipSelect<CS>,
        words: &[u32],
        width: u8,
    ) -> Result<heapless::Vec<u32, MAX_FRAME_WORDS>> {
        check_width(width)?;
        if words.len() > MAX_FRAME_WORDS {
            return Err(Error::InvalidParameter("too many words for one transaction"));
        }
        self.with_select(cs, |spi| {
            let mut replies = heapless::Vec::new();
            for &word in words {
                let reply = spi.shift_word(word, width)?;
                replies
                    .push(reply)
                    .map_err(|_| Error::InvalidParameter("too many words for one transaction"))?;
            }
            Ok(replies)
        })
    }

    pub fn release(self) -> (SCK, MOSI, MISO, D) {
        let (sck, delay) = self.clock.release();
        (sck, self.mosi, self.miso, delay)
    }
}

// ── embedded-hal SpiBus (8-bit words, no chip select) ────────

impl<SCK, MOSI, MISO, D> ErrorType for SoftSpi<SCK, MOSI, MISO, D> {
    type Error = Error;
}

impl<SCK, MOSI, MISO, D> SpiBus<u8> for SoftSpi<SCK, MOSI, MISO, D>
where
    SCK: OutputPin,
    MOSI: OutputPin,
    MISO: InputPin,
    D: DelayNs,
{
    fn read(&mut self, words: &mut [u8]) -> Result<()> {
        for word in words.iter_mut() {
            *word = self.read_word(8)? as u8;
        }
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> Result<()> {
        for &word in words {
            self.write_word(u32::from(word), 8)?;
        }
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<()> {
        let len = read.len().max(write.len());
        for i in 0..len {
            let out = write.get(i).copied().unwrap_or(0);
            let inbound = self.shift_word(u32::from(out), 8)? as u8;
            if let Some(slot) = read.get_mut(i) {
                *slot = inbound;
            }
        }
        Ok(())
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<()> {
        for word in words.iter_mut() {
            *word = self.shift_word(u32::from(*word), 8)? as u8;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}
