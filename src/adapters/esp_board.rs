//! ESP32-S3 mainboard adapter.
//!
//! Hands out socket pins as raw ESP-IDF GPIOs. Routing comes from
//! [`crate::pins`]; each reservation runs `gpio_config` for that one pin,
//! the same way the firmware's one-shot init configures its lines.

use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use esp_idf_svc::sys::*;
use log::{debug, info};

use crate::board::{Mainboard, Socket, SocketPin};
use crate::error::SocketError;
use crate::pins;

// ── Lines ─────────────────────────────────────────────────────

/// One configured GPIO.
pub struct EspLine {
    gpio: i32,
}

impl EspLine {
    pub fn gpio(&self) -> i32 {
        self.gpio
    }
}

impl ErrorType for EspLine {
    type Error = Infallible;
}

impl OutputPin for EspLine {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        // SAFETY: the pin was configured as an output when reserved and is
        // owned exclusively by this handle.
        unsafe { gpio_set_level(self.gpio, 0) };
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        // SAFETY: see set_low.
        unsafe { gpio_set_level(self.gpio, 1) };
        Ok(())
    }
}

impl InputPin for EspLine {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        // SAFETY: read-only register access on a configured input.
        Ok((unsafe { gpio_get_level(self.gpio) }) != 0)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|h| !h)
    }
}

// ── Delay ─────────────────────────────────────────────────────

/// Busy-wait delay from the ROM. Resolution is one microsecond.
#[derive(Debug, Clone, Copy, Default)]
pub struct EspDelay;

impl DelayNs for EspDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.delay_us(ns.div_ceil(1_000));
    }

    fn delay_us(&mut self, us: u32) {
        // SAFETY: ROM busy-wait, no shared state.
        unsafe { esp_rom_delay_us(us) };
    }
}

// ── Mainboard ─────────────────────────────────────────────────

/// Tracks reserved GPIOs in a bitmask (GPIO 0..=48 on the S3).
#[derive(Default)]
pub struct EspMainboard {
    reserved: u64,
}

impl EspMainboard {
    pub fn new() -> Self {
        info!("esp_board: {} sockets mapped", pins::SOCKETS.len());
        Self::default()
    }

    fn route(&self, socket: &Socket, pin: SocketPin) -> Result<i32, SocketError> {
        let not_routed = SocketError::PinNotRouted {
            socket: socket.number(),
            pin: pin.number(),
        };
        let gpio = pins::socket_map(socket.number())
            .and_then(|m| m.gpio(pin))
            .ok_or(not_routed)?;
        if self.reserved & (1u64 << gpio) != 0 {
            return Err(SocketError::PinInUse {
                socket: socket.number(),
                pin: pin.number(),
            });
        }
        Ok(gpio)
    }

    fn configure(
        &mut self,
        socket: &Socket,
        pin: SocketPin,
        mode: gpio_mode_t,
    ) -> Result<EspLine, SocketError> {
        let gpio = self.route(socket, pin)?;
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << gpio,
            mode,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        // SAFETY: gpio is unreserved, so no other handle drives it.
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 {
            return Err(SocketError::PinConfigFailed {
                socket: socket.number(),
                pin: pin.number(),
                code: ret,
            });
        }
        self.reserved |= 1u64 << gpio;
        debug!("esp_board: socket {} {} -> GPIO{}", socket.number(), pin.name(), gpio);
        Ok(EspLine { gpio })
    }
}

impl Mainboard for EspMainboard {
    type Output = EspLine;
    type Input = EspLine;

    fn socket(&self, number: u8) -> Result<Socket, SocketError> {
        pins::socket_map(number)
            .map(|m| Socket::new(m.number, m.types))
            .ok_or(SocketError::NoSuchSocket(number))
    }

    fn reserve_output(
        &mut self,
        socket: &Socket,
        pin: SocketPin,
        initial: bool,
    ) -> Result<EspLine, SocketError> {
        let mut line = self.configure(socket, pin, gpio_mode_t_GPIO_MODE_OUTPUT)?;
        let _ = if initial { line.set_high() } else { line.set_low() };
        Ok(line)
    }

    fn reserve_input(&mut self, socket: &Socket, pin: SocketPin) -> Result<EspLine, SocketError> {
        self.configure(socket, pin, gpio_mode_t_GPIO_MODE_INPUT)
    }

    fn release(&mut self, socket: &Socket, pin: SocketPin) {
        if let Some(gpio) = pins::socket_map(socket.number()).and_then(|m| m.gpio(pin)) {
            if self.reserved & (1u64 << gpio) != 0 {
                self.reserved &= !(1u64 << gpio);
                // SAFETY: the pin is no longer handed out; reset to default.
                unsafe { gpio_reset_pin(gpio) };
            }
        }
    }
}
