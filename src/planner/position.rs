//! Position tracking for the four axes.
//!
//! Keeps two step counters per axis: the actual position advanced by the step
//! generator one pulse at a time, and the planned position at the end of the
//! last queued block. Both are machine coordinates; the origin offset maps
//! them to work coordinates.

use crate::config::units::{Millimeters, Steps};
use crate::config::{Axis, AXES};

/// A point in work coordinates, millimeters on every axis.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Target {
    /// X axis
    pub x: f32,
    /// Y axis
    pub y: f32,
    /// Z (auxiliary) axis
    pub z: f32,
    /// E (extruder) axis
    pub e: f32,
}

impl Target {
    /// Create a target on all four axes.
    #[inline]
    pub const fn new(x: f32, y: f32, z: f32, e: f32) -> Self {
        Self { x, y, z, e }
    }

    /// Value on one axis.
    #[inline]
    pub fn get(&self, axis: Axis) -> Millimeters {
        Millimeters(self.to_array()[axis.index()])
    }

    /// Axis values indexed by [`Axis::index`].
    #[inline]
    pub fn to_array(self) -> [f32; AXES] {
        [self.x, self.y, self.z, self.e]
    }

    /// Inverse of [`Target::to_array`].
    #[inline]
    pub fn from_array(values: [f32; AXES]) -> Self {
        Self::new(values[0], values[1], values[2], values[3])
    }
}

/// Actual and planned position in steps plus the work origin.
#[derive(Debug, Clone)]
pub struct PositionTracker {
    actual: [Steps; AXES],
    planned: [Steps; AXES],
    /// Machine coordinate of the work origin, millimeters.
    origin: [f32; AXES],
    steps_per_unit: [f32; AXES],
}

impl PositionTracker {
    /// Tracker at the machine origin.
    pub fn new(steps_per_unit: [f32; AXES]) -> Self {
        Self {
            actual: [Steps::default(); AXES],
            planned: [Steps::default(); AXES],
            origin: [0.0; AXES],
            steps_per_unit,
        }
    }

    /// Machine position the motors have reached.
    #[inline]
    pub fn actual_steps(&self) -> [Steps; AXES] {
        self.actual
    }

    /// Machine position after every queued block has executed.
    #[inline]
    pub fn planned_steps(&self) -> [Steps; AXES] {
        self.planned
    }

    /// Actual position in work coordinates.
    pub fn actual(&self) -> Target {
        self.to_work(&self.actual)
    }

    /// Planned position in work coordinates.
    pub fn planned(&self) -> Target {
        self.to_work(&self.planned)
    }

    /// Work origin in machine millimeters.
    pub fn origin(&self) -> Target {
        Target::from_array(self.origin)
    }

    /// Convert a work-coordinate target to machine steps, rounding to the
    /// nearest step.
    pub fn to_steps(&self, target: &Target) -> [Steps; AXES] {
        let work = target.to_array();
        core::array::from_fn(|i| {
            Steps::from_millimeters(Millimeters(work[i] + self.origin[i]), self.steps_per_unit[i])
        })
    }

    /// Advance the actual position by one pulse.
    #[inline]
    pub fn record_step(&mut self, axis: Axis, negative: bool) {
        let steps = &mut self.actual[axis.index()];
        steps.0 += if negative { -1 } else { 1 };
    }

    /// Record the end point of a newly queued block.
    #[inline]
    pub fn set_planned_steps(&mut self, steps: [Steps; AXES]) {
        self.planned = steps;
    }

    /// Forget unexecuted motion: planned becomes actual.
    #[inline]
    pub fn sync_planned_to_actual(&mut self) {
        self.planned = self.actual;
    }

    /// Declare the machine to be at `target` (work coordinates) without moving.
    ///
    /// Overwrites both actual and planned.
    pub fn set_absolute(&mut self, target: &Target) {
        let steps = self.to_steps(target);
        self.actual = steps;
        self.planned = steps;
    }

    /// Redefine the work origin as the given machine coordinate.
    pub fn set_origin(&mut self, origin: &Target) {
        self.origin = origin.to_array();
    }

    fn to_work(&self, steps: &[Steps; AXES]) -> Target {
        Target::from_array(core::array::from_fn(|i| {
            steps[i].to_millimeters(self.steps_per_unit[i]).value() - self.origin[i]
        }))
    }
}
