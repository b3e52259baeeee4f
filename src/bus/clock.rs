//! Bit clock driver.
//!
//! Owns the clock line and the delay source. Every transfer is one full
//! clock cycle that starts and ends at the idle level. Where the data line
//! is driven and where the input is sampled depends on [`ClockMode`]:
//!
//! ```text
//! sample on leading edge   data ─ settle ─ lead ─ settle ─ SAMPLE ─ trail ─ settle
//! sample on trailing edge  lead ─ data ─ settle ─ trail ─ settle ─ SAMPLE
//! ```

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin, PinState};
use serde::{Deserialize, Serialize};

use crate::error::{self, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub const fn is_high(self) -> bool {
        matches!(self, Self::High)
    }

    pub const fn inverted(self) -> Self {
        match self {
            Self::Low => Self::High,
            Self::High => Self::Low,
        }
    }

    pub const fn from_bool(high: bool) -> Self {
        if high { Self::High } else { Self::Low }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Edge {
    Rising,
    Falling,
}

/// Clock idle level plus the edge on which the receiver samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockMode {
    pub idle: Level,
    pub sample: Edge,
}

impl ClockMode {
    /// Idle low, sample rising.
    pub const MODE_0: Self = Self {
        idle: Level::Low,
        sample: Edge::Rising,
    };
    /// Idle low, sample falling.
    pub const MODE_1: Self = Self {
        idle: Level::Low,
        sample: Edge::Falling,
    };
    /// Idle high, sample falling.
    pub const MODE_2: Self = Self {
        idle: Level::High,
        sample: Edge::Falling,
    };
    /// Idle high, sample rising.
    pub const MODE_3: Self = Self {
        idle: Level::High,
        sample: Edge::Rising,
    };

    /// The leading edge leaves idle: rising when idle is low.
    pub const fn samples_on_leading_edge(self) -> bool {
        matches!(
            (self.idle, self.sample),
            (Level::Low, Edge::Rising) | (Level::High, Edge::Falling)
        )
    }
}

pub struct BitClock<SCK, D> {
    sck: SCK,
    delay: D,
    mode: ClockMode,
    settle_ns: u32,
}

impl<SCK, D> BitClock<SCK, D>
where
    SCK: OutputPin,
    D: DelayNs,
{
    /// Take the clock line and park it at the idle level.
    pub fn new(mut sck: SCK, delay: D, mode: ClockMode, settle_ns: u32) -> Result<Self> {
        sck.set_state(PinState::from(mode.idle.is_high()))
            .map_err(error::line)?;
        Ok(Self {
            sck,
            delay,
            mode,
            settle_ns,
        })
    }

    pub fn mode(&self) -> ClockMode {
        self.mode
    }

    pub fn settle_ns(&self) -> u32 {
        self.settle_ns
    }

    /// Borrow the delay source for device-level waits (reset pulses,
    /// conversion times).
    pub fn delay_mut(&mut self) -> &mut D {
        &mut self.delay
    }

    /// Drive `value` onto `mosi` and clock it out. Nothing is sampled.
    pub fn shift_out_bit<MOSI: OutputPin>(&mut self, mosi: &mut MOSI, value: bool) -> Result<()> {
        self.cycle(
            || mosi.set_state(PinState::from(value)).map_err(error::line),
            || Ok(false),
        )?;
        Ok(())
    }

    /// Clock one bit in from `miso`, leaving the output line untouched.
    pub fn shift_in_bit<MISO: InputPin>(&mut self, miso: &mut MISO) -> Result<bool> {
        self.cycle(|| Ok(()), || miso.is_high().map_err(error::line))
    }

    /// Full-duplex: drive `value` and sample the reply in the same cycle.
    pub fn transfer_bit<MOSI, MISO>(
        &mut self,
        mosi: &mut MOSI,
        miso: &mut MISO,
        value: bool,
    ) -> Result<bool>
    where
        MOSI: OutputPin,
        MISO: InputPin,
    {
        self.cycle(
            || mosi.set_state(PinState::from(value)).map_err(error::line),
            || miso.is_high().map_err(error::line),
        )
    }

    /// Strobe: leading edge, settle, trailing edge, settle.
    ///
    /// Used as a latch enable by parallel-data devices.
    pub fn pulse(&mut self) -> Result<()> {
        self.leading()?;
        self.settle();
        self.trailing()?;
        self.settle();
        Ok(())
    }

    pub fn release(self) -> (SCK, D) {
        (self.sck, self.delay)
    }

    fn cycle(
        &mut self,
        put: impl FnOnce() -> Result<()>,
        get: impl FnOnce() -> Result<bool>,
    ) -> Result<bool> {
        if self.mode.samples_on_leading_edge() {
            put()?;
            self.settle();
            self.leading()?;
            self.settle();
            let bit = get()?;
            self.trailing()?;
            self.settle();
            Ok(bit)
        } else {
            self.leading()?;
            put()?;
            self.settle();
            self.trailing()?;
            self.settle();
            get()
        }
    }

    fn leading(&mut self) -> Result<()> {
        self.drive(self.mode.idle.inverted())
    }

    fn trailing(&mut self) -> Result<()> {
        self.drive(self.mode.idle)
    }

    fn drive(&mut self, level: Level) -> Result<()> {
        self.sck
            .set_state(PinState::from(level.is_high()))
            .map_err(error::line)
    }

    fn settle(&mut self) {
        if self.settle_ns > 0 {
            self.delay.delay_ns(self.settle_ns);
        }
    }
}
