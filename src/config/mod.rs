//! Configuration module for laser-motion.
//!
//! Provides types for loading and validating the machine configuration
//! from TOML files (with `std` feature) or pre-parsed data.

mod axis;
mod laser;
mod machine;
pub mod units;
#[cfg(feature = "std")]
mod loader;
mod validation;

pub use axis::{AxesConfig, Axis, AxisConfig, HomeDirection, AXES};
pub use laser::{FeedConfig, LaserConfig, POWER_SCALE};
pub use machine::MachineConfig;
pub use validation::validate_config;

#[cfg(feature = "std")]
pub use loader::{load_config, parse_config};

// Re-export unit types at config level
pub use units::{Micrometers, Millimeters, MmPerMin, MmPerSecSquared, Steps};
