//! Ultrasonic echo ranger.
//!
//! A 10 µs pulse on the trigger line starts a ping; the module raises the
//! echo line for as long as the sound took to return (58 µs per cm, round
//! trip). Both waits are bounded by `echo_timeout_us` in `tick_us` steps,
//! so a missing or stuck echo costs one timeout, never a hang.
//!
//! A measurement averages several pings. Failed pings are counted, and the
//! measurement fails only if the failures exceed the acceptable rate.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use log::{debug, info, warn};

use crate::board::{Mainboard, Reservation, SocketPin, SocketType};
use crate::config::DistanceConfig;
use crate::error::{self, Error, Result, SensorError};

pub const TRIGGER_PIN: SocketPin = SocketPin::Four;
pub const ECHO_PIN: SocketPin = SocketPin::Three;

pub const SOCKET_TYPES: &[SocketType] = &[SocketType::X, SocketType::Y];

/// Trigger pulse width (µs).
pub const TRIGGER_US: u32 = 10;
/// Echo microseconds per centimetre of range.
pub const US_PER_CM: f32 = 58.0;
/// Quiet time between pings so stray echoes die out (ms).
pub const PING_INTERVAL_MS: u32 = 60;

/// Why a single ping was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingFault {
    NoEcho,
    EchoTooLong,
    OutOfRange,
}

pub struct DistanceSensor<TRIG, ECHO, D> {
    trigger: TRIG,
    echo: ECHO,
    delay: D,
    config: DistanceConfig,
}

impl<O, I, D> DistanceSensor<O, I, D>
where
    O: OutputPin,
    I: InputPin,
    D: DelayNs,
{
    /// Open the ranger on an X or Y socket.
    pub fn from_socket<B>(board: &mut B, socket: u8, delay: D, config: DistanceConfig) -> Result<Self>
    where
        B: Mainboard<Output = O, Input = I>,
    {
        let config = config.clamped();
        config.validate()?;
        let mut reservation = Reservation::open(board, socket, SOCKET_TYPES, "DistanceSensor")?;
        let trigger = reservation.output(TRIGGER_PIN, false)?;
        let echo = reservation.input(ECHO_PIN)?;
        let socket = reservation.commit();
        info!("DistanceSensor: on socket {}", socket.number());
        Ok(Self {
            trigger,
            echo,
            delay,
            config,
        })
    }

    pub fn new(mut trigger: O, echo: I, delay: D, config: DistanceConfig) -> Result<Self> {
        let config = config.clamped();
        config.validate()?;
        trigger.set_low().map_err(error::line)?;
        Ok(Self {
            trigger,
            echo,
            delay,
            config,
        })
    }

    pub fn config(&self) -> &DistanceConfig {
        &self.config
    }

    /// Percentage of failed pings tolerated. Values above 100 mean 100.
    pub fn set_acceptable_error_rate(&mut self, percent: u8) {
        self.config.acceptable_error_rate = percent.min(100);
    }

    /// Mean range over `samples` pings, in centimetres.
    pub fn measure_cm(&mut self, samples: u8) -> Result<f32> {
        if samples == 0 {
            return Err(Error::InvalidParameter("samples must be at least 1"));
        }
        let mut sum = 0.0f32;
        let mut good = 0u32;
        let mut errors = 0u32;
        for i in 0..samples {
            if i > 0 {
                self.delay.delay_ms(PING_INTERVAL_MS);
            }
            match self.ping_cm()? {
                Ok(cm) => {
                    sum += cm;
                    good += 1;
                }
                Err(fault) => {
                    debug!("distance: ping {} discarded ({:?})", i, fault);
                    errors += 1;
                }
            }
        }
        let tolerated = u32::from(self.config.acceptable_error_rate) * u32::from(samples);
        if good == 0 || errors * 100 > tolerated {
            warn!("distance: {} of {} pings failed", errors, samples);
            return Err(SensorError::NoEcho.into());
        }
        Ok(sum / good as f32)
    }

    /// One ping. The outer `Result` is a line failure; the inner one says
    /// whether the ping produced a plausible range.
    pub fn ping_cm(&mut self) -> Result<core::result::Result<f32, PingFault>> {
        self.trigger.set_high().map_err(error::line)?;
        self.delay.delay_us(TRIGGER_US);
        self.trigger.set_low().map_err(error::line)?;

        let timeout = self.config.echo_timeout_us;
        let tick = self.config.tick_us;

        let mut waited = 0u32;
        while !self.echo.is_high().map_err(error::line)? {
            if waited >= timeout {
                return Ok(Err(PingFault::NoEcho));
            }
            self.delay.delay_us(tick);
            waited += tick;
        }

        let mut width_us = tick;
        while self.echo.is_high().map_err(error::line)? {
            if width_us >= timeout {
                return Ok(Err(PingFault::EchoTooLong));
            }
            self.delay.delay_us(tick);
            width_us += tick;
        }

        let cm = width_us as f32 / US_PER_CM;
        if cm < self.config.min_distance_cm || cm > self.config.max_distance_cm {
            return Ok(Err(PingFault::OutOfRange));
        }
        Ok(Ok(cm))
    }

    pub fn release(self) -> (O, I, D) {
        (self.trigger, self.echo, self.delay)
    }
}
