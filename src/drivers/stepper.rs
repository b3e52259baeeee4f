//! dSPIN (L6470) stepper motor controller.
//!
//! The controller is byte framed: every byte travels in its own select
//! frame, and multi-byte arguments follow the command byte MSB first.
//! Replies to GET_PARAM / GET_STATUS arrive in the frames after the
//! command, clocked out by NOP bytes.
//!
//! Speeds and accelerations are converted from steps/s (steps/s²) to the
//! controller's fixed-point register units; values that do not fit are
//! refused rather than clamped.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use log::{debug, info, trace};

use crate::board::{Mainboard, Reservation, SocketPin, SocketType};
use crate::bus::clock::{Edge, Level};
use crate::bus::device::BusDevice;
use crate::bus::register::Register;
use crate::bus::select::{ChipSelect, Polarity};
use crate::bus::shifter::SoftSpi;
use crate::config::BusConfig;
use crate::error::{self, Error, Result};

/// Idle-high clock, sampled on the rising edge; select active low.
pub const BUS: BusConfig = BusConfig {
    clock_idle: Level::High,
    sample_edge: Edge::Rising,
    select_polarity: Polarity::ActiveLow,
    settle_ns: 250,
};

pub const SOCKET_TYPES: &[SocketType] = &[SocketType::Y];

/// Reset / standby line, held high while the driver lives.
pub const RESET_PIN: SocketPin = SocketPin::Three;

const FRAME_WIDTH: u8 = 8;

/// Parameter registers: address and value width in bits.
pub mod reg {
    use crate::bus::register::Register;

    pub const ABS_POS: Register = Register::new("ABS_POS", 0x01, 22);
    pub const EL_POS: Register = Register::new("EL_POS", 0x02, 9);
    pub const MARK: Register = Register::new("MARK", 0x03, 22);
    pub const SPEED: Register = Register::new("SPEED", 0x04, 20);
    pub const ACC: Register = Register::new("ACC", 0x05, 12);
    pub const DEC: Register = Register::new("DEC", 0x06, 12);
    pub const MAX_SPEED: Register = Register::new("MAX_SPEED", 0x07, 10);
    pub const MIN_SPEED: Register = Register::new("MIN_SPEED", 0x08, 13);
    pub const KVAL_HOLD: Register = Register::new("KVAL_HOLD", 0x09, 8);
    pub const KVAL_RUN: Register = Register::new("KVAL_RUN", 0x0A, 8);
    pub const KVAL_ACC: Register = Register::new("KVAL_ACC", 0x0B, 8);
    pub const KVAL_DEC: Register = Register::new("KVAL_DEC", 0x0C, 8);
    pub const INT_SPEED: Register = Register::new("INT_SPEED", 0x0D, 14);
    pub const ST_SLP: Register = Register::new("ST_SLP", 0x0E, 8);
    pub const FN_SLP_ACC: Register = Register::new("FN_SLP_ACC", 0x0F, 8);
    pub const FN_SLP_DEC: Register = Register::new("FN_SLP_DEC", 0x10, 8);
    pub const K_THERM: Register = Register::new("K_THERM", 0x11, 4);
    pub const ADC_OUT: Register = Register::new("ADC_OUT", 0x12, 5);
    pub const OCD_TH: Register = Register::new("OCD_TH", 0x13, 4);
    pub const STALL_TH: Register = Register::new("STALL_TH", 0x14, 7);
    pub const FS_SPD: Register = Register::new("FS_SPD", 0x15, 10);
    pub const STEP_MODE: Register = Register::new("STEP_MODE", 0x16, 8);
    pub const ALARM_EN: Register = Register::new("ALARM_EN", 0x17, 8);
    pub const CONFIG: Register = Register::new("CONFIG", 0x18, 16);
    pub const STATUS: Register = Register::new("STATUS", 0x19, 16);

    pub const ALL: [Register; 25] = [
        ABS_POS, EL_POS, MARK, SPEED, ACC, DEC, MAX_SPEED, MIN_SPEED, KVAL_HOLD, KVAL_RUN,
        KVAL_ACC, KVAL_DEC, INT_SPEED, ST_SLP, FN_SLP_ACC, FN_SLP_DEC, K_THERM, ADC_OUT, OCD_TH,
        STALL_TH, FS_SPD, STEP_MODE, ALARM_EN, CONFIG, STATUS,
    ];
}

/// Command opcodes. Parameter and direction bits are OR-ed in.
pub mod cmd {
    pub const NOP: u8 = 0x00;
    pub const SET_PARAM: u8 = 0x00;
    pub const GET_PARAM: u8 = 0x20;
    pub const RUN: u8 = 0x50;
    pub const MOVE: u8 = 0x40;
    pub const GO_TO: u8 = 0x60;
    pub const GO_HOME: u8 = 0x70;
    pub const RESET_POS: u8 = 0xD8;
    pub const RESET_DEVICE: u8 = 0xC0;
    pub const SOFT_STOP: u8 = 0xB0;
    pub const HARD_STOP: u8 = 0xB8;
    pub const SOFT_HIZ: u8 = 0xA0;
    pub const HARD_HIZ: u8 = 0xA8;
    pub const GET_STATUS: u8 = 0xD0;
}

// ── Unit conversions ──────────────────────────────────────────

/// steps/s → SPEED units (tick 250 ns, 2^-28 step/tick).
pub const SPEED_PER_SPS: f32 = 67.108_86;
/// steps/s → MAX_SPEED units (2^-18 step/tick).
pub const MAX_SPEED_PER_SPS: f32 = 0.065_536;
/// steps/s → MIN_SPEED units (2^-24 step/tick).
pub const MIN_SPEED_PER_SPS: f32 = 4.194_304;
/// steps/s² → ACC / DEC units (2^-40 step/tick²).
pub const ACC_PER_SPS2: f32 = 0.068_719_48;

/// Largest MOVE distance and widest ABS_POS magnitude.
pub const MAX_STEPS: u32 = 0x3F_FFFF;

fn to_units(value: f32, factor: f32, max: u32, what: &'static str) -> Result<u32> {
    let units = (value * factor).round();
    if !(units >= 0.0 && units <= max as f32) {
        return Err(Error::InvalidParameter(what));
    }
    Ok(units as u32)
}

/// Sign-extend a 22-bit two's complement position.
pub const fn position_from_raw(raw: u32) -> i32 {
    ((raw << 10) as i32) >> 10
}

pub fn position_to_raw(position: i32) -> Result<u32> {
    const LIMIT: i32 = 1 << 21;
    if !(-LIMIT..LIMIT).contains(&position) {
        return Err(Error::InvalidParameter("position outside 22-bit range"));
    }
    Ok(position as u32 & MAX_STEPS)
}

// ── Status ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Reverse = 0,
    Forward = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorState {
    Stopped,
    Accelerating,
    Decelerating,
    ConstantSpeed,
}

/// STATUS register. Fault flags marked active low are reported here as
/// `true` when the fault is present.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Status {
    raw: u16,
}

impl Status {
    pub const fn from_raw(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub fn raw(&self) -> u16 {
        self.raw
    }

    #[inline]
    fn bit(&self, n: u8) -> bool {
        self.raw & (1 << n) != 0
    }

    /// Bridges in high impedance.
    #[inline]
    pub fn hiz(&self) -> bool {
        self.bit(0)
    }

    /// A command is still executing (BUSY is active low).
    #[inline]
    pub fn busy(&self) -> bool {
        !self.bit(1)
    }

    /// Switch input closed.
    #[inline]
    pub fn switch_closed(&self) -> bool {
        self.bit(2)
    }

    /// Switch turn-on event latched.
    #[inline]
    pub fn switch_event(&self) -> bool {
        self.bit(3)
    }

    #[inline]
    pub fn direction(&self) -> Direction {
        if self.bit(4) { Direction::Forward } else { Direction::Reverse }
    }

    pub fn motor_state(&self) -> MotorState {
        match (self.raw >> 5) & 0b11 {
            0 => MotorState::Stopped,
            1 => MotorState::Accelerating,
            2 => MotorState::Decelerating,
            _ => MotorState::ConstantSpeed,
        }
    }

    /// Last command could not be performed.
    #[inline]
    pub fn command_not_performed(&self) -> bool {
        self.bit(7)
    }

    /// Last command opcode was not recognised.
    #[inline]
    pub fn wrong_command(&self) -> bool {
        self.bit(8)
    }

    #[inline]
    pub fn undervoltage(&self) -> bool {
        !self.bit(9)
    }

    #[inline]
    pub fn thermal_warning(&self) -> bool {
        !self.bit(10)
    }

    #[inline]
    pub fn thermal_shutdown(&self) -> bool {
        !self.bit(11)
    }

    #[inline]
    pub fn overcurrent(&self) -> bool {
        !self.bit(12)
    }

    #[inline]
    pub fn step_loss_a(&self) -> bool {
        !self.bit(13)
    }

    #[inline]
    pub fn step_loss_b(&self) -> bool {
        !self.bit(14)
    }

    /// Running in step-clock mode.
    #[inline]
    pub fn step_clock_mode(&self) -> bool {
        self.bit(15)
    }

    /// Any fault or warning flag raised.
    pub fn has_fault(&self) -> bool {
        self.undervoltage()
            || self.thermal_warning()
            || self.thermal_shutdown()
            || self.overcurrent()
            || self.step_loss_a()
            || self.step_loss_b()
    }
}

// ── Driver ────────────────────────────────────────────────────

pub struct Stepper<SCK, MOSI, MISO, CS, D, RST> {
    bus: BusDevice<SCK, MOSI, MISO, CS, D>,
    reset: Option<RST>,
}

impl<O, I, D> Stepper<O, O, I, O, D, O>
where
    O: OutputPin,
    I: InputPin,
    D: DelayNs,
{
    /// Open on a Y socket, with the reset line on pin 3 held high.
    pub fn from_socket<B>(board: &mut B, socket: u8, delay: D) -> Result<Self>
    where
        B: Mainboard<Output = O, Input = I>,
    {
        let mut reservation = Reservation::open(board, socket, SOCKET_TYPES, "Stepper")?;
        let reset = reservation.output(RESET_PIN, true)?;
        let lines = reservation.spi_lines(BUS.mode(), BUS.select_polarity)?;
        let cs = ChipSelect::new(lines.cs, BUS.select_polarity)?;
        let spi = SoftSpi::from_config(lines.sck, lines.mosi, lines.miso, delay, &BUS)?;
        let socket = reservation.commit();
        info!("Stepper: on socket {} (reset on {})", socket.number(), RESET_PIN.name());
        Ok(Self {
            bus: BusDevice::new(spi, cs),
            reset: Some(reset),
        })
    }
}

impl<SCK, MOSI, MISO, CS, D, RST> Stepper<SCK, MOSI, MISO, CS, D, RST>
where
    SCK: OutputPin,
    MOSI: OutputPin,
    MISO: InputPin,
    CS: OutputPin,
    D: DelayNs,
    RST: OutputPin,
{
    pub fn new(bus: BusDevice<SCK, MOSI, MISO, CS, D>, reset: Option<RST>) -> Self {
        Self { bus, reset }
    }

    /// Pulse the reset line, if wired. Registers return to power-on values.
    pub fn hard_reset(&mut self) -> Result<()> {
        if let Some(reset) = self.reset.as_mut() {
            reset.set_low().map_err(error::line)?;
            self.bus.delay_mut().delay_us(10);
            reset.set_high().map_err(error::line)?;
            self.bus.delay_mut().delay_ms(1);
            info!("stepper: hardware reset");
        }
        Ok(())
    }

    // ── Parameters ────────────────────────────────────────────

    pub fn set_param(&mut self, register: Register, value: u32) -> Result<()> {
        let value = register.field.insert(0, value)?;
        trace!("stepper: {} <- {:#x}", register.name, value);
        self.send(cmd::SET_PARAM | register.address)?;
        self.send_value(value, register.byte_len())
    }

    pub fn get_param(&mut self, register: Register) -> Result<u32> {
        self.send(cmd::GET_PARAM | register.address)?;
        let mut value = 0u32;
        for _ in 0..register.byte_len() {
            value = (value << 8) | u32::from(self.send(cmd::NOP)?);
        }
        Ok(register.field.extract(value))
    }

    pub fn set_max_speed(&mut self, steps_per_sec: f32) -> Result<()> {
        let units = to_units(
            steps_per_sec,
            MAX_SPEED_PER_SPS,
            reg::MAX_SPEED.field.max_value(),
            "max speed out of range",
        )?;
        self.set_param(reg::MAX_SPEED, units)
    }

    /// Low-speed optimisation (bit 12) is left off.
    pub fn set_min_speed(&mut self, steps_per_sec: f32) -> Result<()> {
        let units = to_units(steps_per_sec, MIN_SPEED_PER_SPS, 0x0FFF, "min speed out of range")?;
        self.set_param(reg::MIN_SPEED, units)
    }

    pub fn set_acceleration(&mut self, steps_per_sec2: f32) -> Result<()> {
        let units = to_units(steps_per_sec2, ACC_PER_SPS2, 0x0FFE, "acceleration out of range")?;
        self.set_param(reg::ACC, units)
    }

    pub fn set_deceleration(&mut self, steps_per_sec2: f32) -> Result<()> {
        let units = to_units(steps_per_sec2, ACC_PER_SPS2, 0x0FFE, "deceleration out of range")?;
        self.set_param(reg::DEC, units)
    }

    /// Current absolute position in steps.
    pub fn position(&mut self) -> Result<i32> {
        Ok(position_from_raw(self.get_param(reg::ABS_POS)?))
    }

    // ── Motion ────────────────────────────────────────────────

    /// Run continuously at `steps_per_sec`.
    pub fn run(&mut self, direction: Direction, steps_per_sec: f32) -> Result<()> {
        let units = to_units(
            steps_per_sec,
            SPEED_PER_SPS,
            reg::SPEED.field.max_value(),
            "speed out of range",
        )?;
        debug!("stepper: run {:?} at {} (SPEED={:#x})", direction, steps_per_sec, units);
        self.send(cmd::RUN | direction as u8)?;
        self.send_value(units, 3)
    }

    /// Move `steps` microsteps relative to the current position.
    pub fn move_steps(&mut self, direction: Direction, steps: u32) -> Result<()> {
        if steps > MAX_STEPS {
            return Err(Error::InvalidParameter("move exceeds 22 bits"));
        }
        self.send(cmd::MOVE | direction as u8)?;
        self.send_value(steps, 3)
    }

    /// Move to an absolute position along the shortest path.
    pub fn go_to(&mut self, position: i32) -> Result<()> {
        let raw = position_to_raw(position)?;
        self.send(cmd::GO_TO)?;
        self.send_value(raw, 3)
    }

    pub fn go_home(&mut self) -> Result<()> {
        self.send(cmd::GO_HOME).map(|_| ())
    }

    pub fn reset_position(&mut self) -> Result<()> {
        self.send(cmd::RESET_POS).map(|_| ())
    }

    pub fn reset_device(&mut self) -> Result<()> {
        self.send(cmd::RESET_DEVICE).map(|_| ())
    }

    pub fn soft_stop(&mut self) -> Result<()> {
        self.send(cmd::SOFT_STOP).map(|_| ())
    }

    pub fn hard_stop(&mut self) -> Result<()> {
        self.send(cmd::HARD_STOP).map(|_| ())
    }

    pub fn soft_hiz(&mut self) -> Result<()> {
        self.send(cmd::SOFT_HIZ).map(|_| ())
    }

    pub fn hard_hiz(&mut self) -> Result<()> {
        self.send(cmd::HARD_HIZ).map(|_| ())
    }

    /// Read STATUS and clear its latched flags.
    pub fn status(&mut self) -> Result<Status> {
        self.send(cmd::GET_STATUS)?;
        let hi = self.send(cmd::NOP)?;
        let lo = self.send(cmd::NOP)?;
        Ok(Status::from_raw(u16::from_be_bytes([hi, lo])))
    }

    pub fn is_busy(&mut self) -> Result<bool> {
        Ok(self.status()?.busy())
    }

    pub fn release(self) -> (BusDevice<SCK, MOSI, MISO, CS, D>, Option<RST>) {
        (self.bus, self.reset)
    }

    // ── Framing ───────────────────────────────────────────────

    fn send(&mut self, byte: u8) -> Result<u8> {
        Ok(self.bus.exchange(u32::from(byte), FRAME_WIDTH)? as u8)
    }

    fn send_value(&mut self, value: u32, bytes: usize) -> Result<()> {
        for i in (0..bytes).rev() {
            self.send((value >> (8 * i)) as u8)?;
        }
        Ok(())
    }
}
