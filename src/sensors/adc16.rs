//! Single-channel 14-bit ADC module with a 16-bit output frame.
//!
//! Each select frame clocks one conversion out: two status bits, then the
//! 14-bit code MSB first. The module ignores MOSI.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use log::{trace, warn};

use crate::board::{Mainboard, SocketType};
use crate::bus::clock::{Edge, Level};
use crate::bus::device::BusDevice;
use crate::bus::register::{Field, Scale};
use crate::bus::select::Polarity;
use crate::config::BusConfig;
use crate::error::{Error, Result};

pub const FRAME_WIDTH: u8 = 16;

pub const CODE: Field = Field::new(0, 14);
pub const STATUS: Field = Field::new(14, 2);

pub const SCALE: Scale = Scale::new(4.096, 0x3FFF);

pub const BUS: BusConfig = BusConfig {
    clock_idle: Level::Low,
    sample_edge: Edge::Rising,
    select_polarity: Polarity::ActiveLow,
    settle_ns: 500,
};

pub const SOCKET_TYPES: &[SocketType] = &[SocketType::Y];

pub struct Adc16<SCK, MOSI, MISO, CS, D> {
    bus: BusDevice<SCK, MOSI, MISO, CS, D>,
}

impl<O, I, D> Adc16<O, O, I, O, D>
where
    O: OutputPin,
    I: InputPin,
    D: DelayNs,
{
    pub fn from_socket<B>(board: &mut B, socket: u8, delay: D) -> Result<Self>
    where
        B: Mainboard<Output = O, Input = I>,
    {
        let bus = BusDevice::open(board, socket, SOCKET_TYPES, "Adc16", &BUS, delay)?;
        Ok(Self { bus })
    }
}

impl<SCK, MOSI, MISO, CS, D> Adc16<SCK, MOSI, MISO, CS, D>
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

    pub fn read_raw(&mut self) -> Result<u16> {
        let frame = self.bus.exchange(0, FRAME_WIDTH)?;
        let status = STATUS.extract(frame);
        if status != 0 {
            trace!("adc16: status bits {:#04b}", status);
        }
        Ok(CODE.extract(frame) as u16)
    }

    pub fn read_voltage(&mut self) -> Result<f32> {
        Ok(SCALE.decode(u32::from(self.read_raw()?)))
    }

    /// Mean voltage over `samples` conversions.
    pub fn read_average(&mut self, samples: u16) -> Result<f32> {
        if samples == 0 {
            return Err(Error::InvalidParameter("samples must be at least 1"));
        }
        let mut total: u32 = 0;
        for _ in 0..samples {
            total += u32::from(self.read_raw()?);
        }
        let mean = total as f32 / f32::from(samples);
        if mean >= SCALE.max_code as f32 {
            warn!("adc16: input at full scale");
        }
        Ok(mean / SCALE.max_code as f32 * SCALE.full_scale)
    }

    pub fn release(self) -> BusDevice<SCK, MOSI, MISO, CS, D> {
        self.bus
    }
}
