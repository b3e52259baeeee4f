//! Socket-module drivers over a bit-banged synchronous serial bus.
//!
//! Drivers never touch GPIO numbers. They ask a [`board::Mainboard`] for a
//! socket, check its type, reserve the pins they need and talk to the
//! device through [`bus`]. The simulation board in [`adapters::sim`] lets
//! everything run on the host; `adapters::esp_board` (feature `espidf`)
//! drives real ESP32-S3 pins.

#![deny(unused_must_use)]

pub mod adapters;
pub mod board;
pub mod bus;
pub mod config;
pub mod drivers;
pub mod error;
pub mod pins;
pub mod sensors;

pub use board::{Mainboard, Socket, SocketPin, SocketType};
pub use bus::device::BusDevice;
pub use config::{BusConfig, ConfigError, DistanceConfig};
pub use error::{Error, Result, SensorError, SocketError};
