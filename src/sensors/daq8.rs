//! Eight-channel 12-bit data acquisition module.
//!
//! The converter takes a 16-bit command word selecting a channel (code in
//! bits 9..=12) and returns the conversion in the following 16-bit word,
//! both inside one select frame. Result code sits in bits 0..=11.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use log::trace;

use crate::board::{Mainboard, SocketType};
use crate::bus::clock::{Edge, Level};
use crate::bus::device::BusDevice;
use crate::bus::register::{Field, Scale};
use crate::bus::select::Polarity;
use crate::config::BusConfig;
use crate::error::{Error, Result};

pub const FRAME_WIDTH: u8 = 16;

/// Channel select code in the command word.
pub const CHANNEL: Field = Field::new(9, 4);
/// Conversion result in the response word.
pub const RESULT: Field = Field::new(0, 12);

pub const SCALE: Scale = Scale::new(4.096, 0x0FFF);

/// Idle-low clock, sampled on the rising edge; select active low.
pub const BUS: BusConfig = BusConfig {
    clock_idle: Level::Low,
    sample_edge: Edge::Rising,
    select_polarity: Polarity::ActiveLow,
    settle_ns: 1_000,
};

pub const SOCKET_TYPES: &[SocketType] = &[SocketType::Y];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    P1 = 1,
    P2,
    P3,
    P4,
    P5,
    P6,
    P7,
    P8,
}

impl Channel {
    pub const ALL: [Channel; 8] = [
        Self::P1,
        Self::P2,
        Self::P3,
        Self::P4,
        Self::P5,
        Self::P6,
        Self::P7,
        Self::P8,
    ];

    /// Channels are numbered 1..=8 as printed on the module.
    pub fn from_index(index: u8) -> Result<Self> {
        match index {
            1..=8 => Ok(Self::ALL[usize::from(index - 1)]),
            _ => Err(Error::InvalidParameter("channel must be 1..=8")),
        }
    }

    /// Command word that starts a conversion on this channel.
    pub const fn command(self) -> u32 {
        (self as u32) << CHANNEL.offset
    }
}

pub struct Daq8<SCK, MOSI, MISO, CS, D> {
    bus: BusDevice<SCK, MOSI, MISO, CS, D>,
}

impl<O, I, D> Daq8<O, O, I, O, D>
where
    O: OutputPin,
    I: InputPin,
    D: DelayNs,
{
    /// Open the module on a Y socket.
    pub fn from_socket<B>(board: &mut B, socket: u8, delay: D) -> Result<Self>
    where
        B: Mainboard<Output = O, Input = I>,
    {
        let bus = BusDevice::open(board, socket, SOCKET_TYPES, "Daq8", &BUS, delay)?;
        Ok(Self { bus })
    }
}

impl<SCK, MOSI, MISO, CS, D> Daq8<SCK, MOSI, MISO, CS, D>
where
    SCK: OutputPin,
    MOSI: OutputPin,
    MISO: InputPin,
    CS: OutputPin,
    D: DelayNs,
{
    pub fn new(bus: BusDevice<SCK, MOSI, MISO, CS, D>) -> Self {
        Self { bus }
    }

    /// Raw 12-bit conversion code.
    pub fn read_raw(&mut self, channel: Channel) -> Result<u16> {
        let replies = self
            .bus
            .transaction(&[channel.command(), 0], FRAME_WIDTH)?;
        let word = replies.get(1).copied().unwrap_or(0);
        let code = RESULT.extract(word) as u16;
        trace!("daq8: {:?} -> {:#05x}", channel, code);
        Ok(code)
    }

    pub fn read_voltage(&mut self, channel: Channel) -> Result<f32> {
        Ok(SCALE.decode(u32::from(self.read_raw(channel)?)))
    }

    /// Voltages for P1..=P8, in order.
    pub fn read_all(&mut self) -> Result<[f32; 8]> {
        let mut volts = [0.0; 8];
        for (slot, channel) in volts.iter_mut().zip(Channel::ALL) {
            *slot = self.read_voltage(channel)?;
        }
        Ok(volts)
    }

    pub fn release(self) -> BusDevice<SCK, MOSI, MISO, CS, D> {
        self.bus
    }
}
