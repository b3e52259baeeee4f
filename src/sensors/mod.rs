//! Sensor modules.
//!
//! | Module     | Socket | Interface                              |
//! |------------|--------|----------------------------------------|
//! | `daq8`     | Y      | bit-banged bus, 8 × 12-bit channels     |
//! | `adc16`    | Y      | bit-banged bus, 14-bit code in 16 bits  |
//! | `distance` | X / Y  | trigger out, echo in, timed pulse       |

pub mod adc16;
pub mod daq8;
pub mod distance;

pub use adc16::Adc16;
pub use daq8::{Channel, Daq8};
pub use distance::DistanceSensor;
