//! Chip-select line and the scoped transaction guard.
//!
//! The guard asserts select on creation and deasserts it when dropped, so
//! the line returns to idle on every exit path out of a transaction body:
//! normal return, an `Err` propagated with `?`, or an unwinding panic.

use embedded_hal::digital::{OutputPin, PinState};
use log::trace;
use serde::{Deserialize, Serialize};

use super::clock::Level;
use crate::error::{self, Result};

/// Which level selects the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Polarity {
    ActiveLow,
    ActiveHigh,
}

impl Polarity {
    pub const fn asserted(self) -> Level {
        match self {
            Self::ActiveLow => Level::Low,
            Self::ActiveHigh => Level::High,
        }
    }

    pub const fn idle(self) -> Level {
        self.asserted().inverted()
    }
}

pub struct ChipSelect<CS> {
    pin: CS,
    polarity: Polarity,
}

impl<CS: OutputPin> ChipSelect<CS> {
    /// Take the line and drive it to the idle level.
    pub fn new(mut pin: CS, polarity: Polarity) -> Result<Self> {
        pin.set_state(PinState::from(polarity.idle().is_high()))
            .map_err(error::line)?;
        Ok(Self { pin, polarity })
    }

    pub fn active_low(pin: CS) -> Result<Self> {
        Self::new(pin, Polarity::ActiveLow)
    }

    pub fn active_high(pin: CS) -> Result<Self> {
        Self::new(pin, Polarity::ActiveHigh)
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    pub fn select(&mut self) -> Result<()> {
        self.drive(self.polarity.asserted())
    }

    pub fn deselect(&mut self) -> Result<()> {
        self.drive(self.polarity.idle())
    }

    pub fn release(self) -> CS {
        self.pin
    }

    fn drive(&mut self, level: Level) -> Result<()> {
        self.pin
            .set_state(PinState::from(level.is_high()))
            .map_err(error::line)
    }
}

/// Live transaction. Deselects on drop unless [`Selected::finish`] already did.
pub(crate) struct Selected<'a, CS: OutputPin> {
    cs: &'a mut ChipSelect<CS>,
    armed: bool,
}

impl<'a, CS: OutputPin> Selected<'a, CS> {
    pub(crate) fn assert(cs: &'a mut ChipSelect<CS>) -> Result<Self> {
        cs.select()?;
        trace!("select: asserted");
        Ok(Self { cs, armed: true })
    }

    /// Deselect and report a failure to do so.
    pub(crate) fn finish(mut self) -> Result<()> {
        self.armed = false;
        trace!("select: released");
        self.cs.deselect()
    }
}

impl<CS: OutputPin> Drop for Selected<'_, CS> {
    fn drop(&mut self) {
        if self.armed {
            // Error path: the body's failure is what the caller sees.
            let _ = self.cs.deselect();
        }
    }
}
