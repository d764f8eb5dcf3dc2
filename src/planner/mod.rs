//! Planner module for laser-motion.
//!
//! Provides the block queue, look-ahead speed planning and position
//! tracking.

mod block;
mod constraints;
pub mod kinematics;
mod lookahead;
mod position;
mod ring;

pub use block::{ActionKind, MotionBlock, RampPhase};
pub use constraints::MotionConstraints;
pub use kinematics::{MINIMUM_PLANNER_SPEED, MINIMUM_STEPS_PER_MINUTE};
pub use lookahead::{BlockSource, IdlePlanner, Planner, MAX_STEP_EVENTS};
pub use position::{PositionTracker, Target};
pub use ring::{BlockRing, DEFAULT_QUEUE_CAPACITY};
