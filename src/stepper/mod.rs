//! Stepper module for laser-motion.
//!
//! Executes planned blocks from the step timer interrupt: fixed-point speed
//! ramps, Bresenham step interleaving, laser modulation and the hardware
//! output bank.

mod builder;
mod generator;
mod outputs;
mod ramp;
mod shared;
mod timer;

pub use builder::PinOutputsBuilder;
pub use generator::StepGenerator;
pub use outputs::{AxisPins, NoEndstop, PinOutputs, StepperOutputs};
pub use ramp::{ramp_index, ramp_rate, Ramp, StepDelay};
pub use shared::{SharedPlanner, TickGuard, TickToken, Ticker};
pub use timer::{service, NextTick, StepClock, StepTimer};
