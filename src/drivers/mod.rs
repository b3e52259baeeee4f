//! Actuator and display modules.

pub mod lcd;
pub mod stepper;

pub use lcd::{CharLcd, Geometry};
pub use stepper::{Direction, Status, Stepper};
