//! # laser-motion
//!
//! Look-ahead motion planning and interrupt-driven step generation for laser
//! cutters and engravers, with embedded-hal 1.0 support.
//!
//! ## Features
//!
//! - **Integer command stream**: opcode decoder with bitmap uploads
//! - **Look-ahead planner**: junction-deviation cornering over a fixed block ring
//! - **Fixed-point ramps**: one integer division per step in the interrupt
//! - **Bitmap engraving**: laser modulated pixel by pixel along a line
//! - **embedded-hal 1.0**: `OutputPin` for STEP/DIR/laser, `SetDutyCycle` for power
//! - **no_std compatible**: Core library works without standard library
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use laser_motion::{Dispatcher, Planner, PinOutputsBuilder, SharedPlanner, StepGenerator};
//!
//! let config = laser_motion::load_config("machine.toml")?;
//!
//! let outputs = PinOutputsBuilder::new()
//!     .from_config(&config)
//!     .axis(Axis::X, x_step, x_dir)
//!     .axis(Axis::Y, y_step, y_dir)
//!     .endstop(Axis::X, x_home)
//!     .laser_pin(laser_enable)
//!     .pwm(laser_pwm)
//!     .build()?;
//!
//! let shared = SharedPlanner::new(Planner::new(&config));
//! let mut generator = StepGenerator::new(outputs, &config);
//! let mut dispatcher = Dispatcher::new(config.feeds.clone());
//!
//! // Foreground: stream host words into the planner
//! shared.lock(|planner| dispatcher.feed(word, planner))?;
//!
//! // Step timer interrupt
//! laser_motion::service(&mut shared.ticker(&mut generator), &mut timer);
//! ```
//!
//! ## Feature Flags
//!
//! - `std` (default): Enables file I/O and TOML parsing
//! - `alloc`: Enables heap allocation for no_std with allocator
//! - `defmt`: Enables defmt logging for embedded targets
//! - `log`: Enables logging through the `log` facade

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]
// Allow large error types - necessary for no_std with heapless strings
#![allow(clippy::result_large_err)]

#[cfg(feature = "alloc")]
extern crate alloc;

// Logging macros, must come first
#[macro_use]
mod fmt;

// Core modules
pub mod config;
pub mod dispatch;
pub mod error;
pub mod planner;
pub mod protocol;
pub mod stepper;

// Re-exports for ergonomic API
pub use config::{validate_config, Axis, MachineConfig};
pub use dispatch::Dispatcher;
pub use error::{Error, Result};
pub use planner::{ActionKind, BlockSource, MotionBlock, Planner, Target};
pub use protocol::{Decoded, Decoder, Opcode};
pub use stepper::{
    service, NextTick, PinOutputs, PinOutputsBuilder, SharedPlanner, StepClock, StepGenerator,
    StepTimer, StepperOutputs,
};

// Configuration loading (std only)
#[cfg(feature = "std")]
pub use config::{load_config, parse_config};

// Unit types
pub use config::units::{Micrometers, Millimeters, MmPerMin, MmPerSecSquared, Steps};
