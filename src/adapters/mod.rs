//! Adapters: concrete implementations of the [`Mainboard`](crate::board::Mainboard) port.
//!
//! | Adapter     | Lines              | Connects to                 |
//! |-------------|--------------------|-----------------------------|
//! | `sim`       | `SimLine`          | In-memory wires, slave model |
//! | `esp_board` | `EspLine`          | ESP32-S3 GPIO via ESP-IDF    |

#[cfg(not(target_os = "espidf"))]
pub mod sim;

#[cfg(all(feature = "espidf", target_os = "espidf"))]
pub mod esp_board;
