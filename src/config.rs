//! Bus and sensor configuration profiles.
//!
//! Timing and polarity differ per device and come from each chip's
//! datasheet, so they live in data rather than in the shifting code.
//! Profiles can be persisted to flash with `postcard` and are validated on
//! load; out-of-range values are rejected, never clamped.

use serde::{Deserialize, Serialize};

use crate::bus::clock::{ClockMode, Edge, Level};
use crate::bus::select::Polarity;
use crate::error::Error;

/// Longest per-half-cycle settle a profile may request (1 ms).
pub const MAX_SETTLE_NS: u32 = 1_000_000;

/// Bit-banged bus profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusConfig {
    /// Clock level between transfers.
    pub clock_idle: Level,
    /// Edge on which the device samples data.
    pub sample_edge: Edge,
    /// Chip-select level that selects the device.
    pub select_polarity: Polarity,
    /// Delay after each clock or data transition (nanoseconds).
    pub settle_ns: u32,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            clock_idle: Level::Low,
            sample_edge: Edge::Rising,
            select_polarity: Polarity::ActiveLow,
            settle_ns: 1_000,
        }
    }
}

impl BusConfig {
    pub const fn mode(&self) -> ClockMode {
        ClockMode {
            idle: self.clock_idle,
            sample: self.sample_edge,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.settle_ns > MAX_SETTLE_NS {
            return Err(ConfigError::ValidationFailed("settle_ns exceeds 1 ms"));
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ConfigError> {
        self.validate()?;
        postcard::to_allocvec(self).map_err(|_| ConfigError::Corrupted)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)?;
        config.validate()?;
        Ok(config)
    }
}

/// Ultrasonic ranger tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceConfig {
    /// Percentage of failed samples tolerated per measurement (0–100).
    pub acceptable_error_rate: u8,
    /// Closest plausible reading (cm).
    pub min_distance_cm: f32,
    /// Farthest plausible reading (cm).
    pub max_distance_cm: f32,
    /// Give up waiting for, or timing, an echo after this long (µs).
    pub echo_timeout_us: u32,
    /// Echo polling period (µs).
    pub tick_us: u32,
}

impl Default for DistanceConfig {
    fn default() -> Self {
        Self {
            acceptable_error_rate: 10,
            min_distance_cm: 2.0,
            max_distance_cm: 400.0,
            echo_timeout_us: 30_000,
            tick_us: 10,
        }
    }
}

impl DistanceConfig {
    /// Copy with the error rate clamped to 0..=100. A rate above 100 means
    /// every failure is tolerated, so it is never a validation error.
    #[must_use]
    pub fn clamped(mut self) -> Self {
        self.acceptable_error_rate = self.acceptable_error_rate.min(100);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_distance_cm >= 0.0 && self.min_distance_cm < self.max_distance_cm) {
            return Err(ConfigError::ValidationFailed("distance window empty"));
        }
        if self.tick_us == 0 {
            return Err(ConfigError::ValidationFailed("tick_us is zero"));
        }
        if self.echo_timeout_us < self.tick_us {
            return Err(ConfigError::ValidationFailed("echo_timeout_us below tick_us"));
        }
        Ok(())
    }
}

/// Errors from loading or validating a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A field failed range validation; names the field and why.
    ValidationFailed(&'static str),
    /// Stored bytes could not be decoded.
    Corrupted,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::Corrupted => write!(f, "config corrupted"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::ValidationFailed(msg) => Self::InvalidParameter(msg),
            ConfigError::Corrupted => Self::InvalidParameter("config corrupted"),
        }
    }
}
