//! Software-clocked synchronous serial bus.
//!
//! Layers, leaves first:
//!
//! | Module      | Provides                                            |
//! |-------------|-----------------------------------------------------|
//! | `clock`     | [`BitClock`]: one bit per clock cycle, settle delays |
//! | `shifter`   | [`SoftSpi`]: N-bit words, MSB first, full duplex     |
//! | `select`    | [`ChipSelect`] and the scoped transaction guard       |
//! | `register`  | bit-field tables and linear scaling for device maps   |
//! | `device`    | [`BusDevice`]: a bus bound to one chip select, socket setup |
//!
//! Everything is blocking and single-threaded. Exclusive access to a bus
//! is the `&mut` borrow; nothing here locks.

pub mod clock;
pub mod device;
pub mod register;
pub mod select;
pub mod shifter;

pub use clock::{BitClock, ClockMode, Edge, Level};
pub use device::BusDevice;
pub use register::{Field, Register, Scale};
pub use select::{ChipSelect, Polarity};
pub use shifter::SoftSpi;
