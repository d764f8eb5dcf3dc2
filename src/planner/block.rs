//! Motion blocks: one planned straight-line segment each.

use crate::config::{Axis, AXES};

/// What a block does besides moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ActionKind {
    /// Laser-off travel move.
    #[default]
    Move,
    /// Laser on at constant power for the whole line.
    LaserLine,
    /// Laser modulated by the loaded bitmap along the line.
    BitmapLine,
    /// Move that aborts as soon as an endstop on a moving axis asserts.
    MoveToEndstop,
    /// Wait for all queued motion to finish. Never becomes a block.
    Wait,
}

impl ActionKind {
    /// Laser is on for at least part of the block.
    #[inline]
    pub fn laser_on(self) -> bool {
        matches!(self, ActionKind::LaserLine | ActionKind::BitmapLine)
    }
}

/// Ramp phase along a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RampPhase {
    /// Accelerating from the entry rate toward the nominal rate.
    RampUp,
    /// Holding the nominal rate.
    Cruise,
    /// Decelerating toward the exit rate.
    RampDown,
}

/// One queued segment.
///
/// Speeds are mm/min, rates are steps/min along the dominant axis.
/// `entry_speed <= max_entry_speed <= nominal_speed` and
/// `accelerate_until <= decelerate_after <= step_event_count` hold for every
/// block the planner hands out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionBlock {
    /// Action carried by the block.
    pub action: ActionKind,
    /// Absolute step count per axis.
    pub steps: [u32; AXES],
    /// Bit set for each axis moving in the negative direction.
    pub direction_bits: u8,
    /// Largest per-axis step count; one Bresenham event per dominant step.
    pub step_event_count: u32,
    /// Cruise rate.
    pub nominal_rate: u32,
    /// Cruise speed.
    pub nominal_speed: f32,
    /// Planned speed at block entry.
    pub entry_speed: f32,
    /// Junction speed limit at block entry.
    pub max_entry_speed: f32,
    /// Euclidean length.
    pub millimeters: f32,
    /// Rate change per acceleration tick, steps/min.
    pub rate_delta: u32,
    /// Rate at the first step.
    pub initial_rate: u32,
    /// Rate at the last step.
    pub final_rate: u32,
    /// Step event at which acceleration stops.
    pub accelerate_until: u32,
    /// Step event at which deceleration starts.
    pub decelerate_after: u32,
    /// Trapezoid must be recomputed.
    pub recalculate_flag: bool,
    /// The block can reach nominal speed from any entry speed.
    pub nominal_length_flag: bool,
    /// Laser power, 0-10000.
    pub power: u16,
    /// Monotonic id assigned at enqueue.
    pub sequence: u32,
}

impl MotionBlock {
    /// Zeroed block used to fill empty ring slots.
    pub const EMPTY: MotionBlock = MotionBlock {
        action: ActionKind::Move,
        steps: [0; AXES],
        direction_bits: 0,
        step_event_count: 0,
        nominal_rate: 0,
        nominal_speed: 0.0,
        entry_speed: 0.0,
        max_entry_speed: 0.0,
        millimeters: 0.0,
        rate_delta: 0,
        initial_rate: 0,
        final_rate: 0,
        accelerate_until: 0,
        decelerate_after: 0,
        recalculate_flag: false,
        nominal_length_flag: false,
        power: 0,
        sequence: 0,
    };

    /// Axis moves toward negative coordinates.
    #[inline]
    pub fn is_negative(&self, axis: Axis) -> bool {
        self.direction_bits & (1 << axis.index()) != 0
    }

    /// Laser is on while executing this block.
    #[inline]
    pub fn laser_on(&self) -> bool {
        self.action.laser_on()
    }

    /// Laser follows the loaded bitmap.
    #[inline]
    pub fn is_bitmap(&self) -> bool {
        self.action == ActionKind::BitmapLine
    }

    /// Endstops are checked while executing this block.
    #[inline]
    pub fn check_endstops(&self) -> bool {
        self.action == ActionKind::MoveToEndstop
    }

    /// Ramp phase after `completed` step events.
    pub fn phase_at(&self, completed: u32) -> RampPhase {
        if completed >= self.decelerate_after {
            RampPhase::RampDown
        } else if completed < self.accelerate_until {
            RampPhase::RampUp
        } else {
            RampPhase::Cruise
        }
    }
}

impl Default for MotionBlock {
    fn default() -> Self {
        Self::EMPTY
    }
}
