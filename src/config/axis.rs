//! Per-axis configuration from TOML.

use serde::Deserialize;

use super::units::MmPerMin;

/// Number of axes driven by the controller.
pub const AXES: usize = 4;

/// Machine axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Axis {
    /// Gantry X.
    X,
    /// Gantry Y.
    Y,
    /// Auxiliary axis (focus / table height).
    Z,
    /// Extra axis (rotary or feeder).
    E,
}

impl Axis {
    /// All axes in index order.
    pub const ALL: [Axis; AXES] = [Axis::X, Axis::Y, Axis::Z, Axis::E];

    /// Index into per-axis arrays.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Axis letter for messages.
    pub const fn letter(self) -> char {
        match self {
            Axis::X => 'X',
            Axis::Y => 'Y',
            Axis::Z => 'Z',
            Axis::E => 'E',
        }
    }
}

/// Direction an axis travels to find its home sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HomeDirection {
    /// Home sensor sits at the low end of travel.
    #[default]
    Negative,
    /// Home sensor sits at the high end of travel.
    Positive,
}

/// Configuration of one axis.
#[derive(Debug, Clone, Deserialize)]
pub struct AxisConfig {
    /// Steps per millimeter of travel.
    pub steps_per_unit: f32,

    /// Maximum feed rate for this axis alone.
    #[serde(rename = "max_feed_rate_mm_per_min")]
    pub max_feed_rate: MmPerMin,

    /// Which end of travel the home sensor is on.
    #[serde(default)]
    pub home_direction: HomeDirection,

    /// Sensor reads high when triggered.
    #[serde(default)]
    pub endstop_active_high: bool,

    /// Invert STEP pin logic (pulse low).
    #[serde(default)]
    pub invert_step: bool,

    /// Invert DIR pin logic.
    #[serde(default)]
    pub invert_direction: bool,
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            steps_per_unit: 100.0,
            max_feed_rate: MmPerMin(3000.0),
            home_direction: HomeDirection::Negative,
            endstop_active_high: false,
            invert_step: false,
            invert_direction: false,
        }
    }
}

impl AxisConfig {
    /// Axis with the given scale and feed limit, everything else default.
    pub fn new(steps_per_unit: f32, max_feed_rate: MmPerMin) -> Self {
        Self {
            steps_per_unit,
            max_feed_rate,
            ..Self::default()
        }
    }
}

/// Configuration of all axes.
#[derive(Debug, Clone, Deserialize)]
pub struct AxesConfig {
    /// X axis.
    pub x: AxisConfig,
    /// Y axis.
    pub y: AxisConfig,
    /// Z axis (optional in TOML).
    #[serde(default)]
    pub z: AxisConfig,
    /// Extra axis (optional in TOML).
    #[serde(default)]
    pub e: AxisConfig,
}

impl AxesConfig {
    /// Same settings on every axis.
    pub fn uniform(axis: AxisConfig) -> Self {
        Self {
            x: axis.clone(),
            y: axis.clone(),
            z: axis.clone(),
            e: axis,
        }
    }

    /// Get the configuration of one axis.
    pub fn get(&self, axis: Axis) -> &AxisConfig {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
            Axis::E => &self.e,
        }
    }

    /// Mutable access to one axis.
    pub fn get_mut(&mut self, axis: Axis) -> &mut AxisConfig {
        match axis {
            Axis::X => &mut self.x,
            Axis::Y => &mut self.y,
            Axis::Z => &mut self.z,
            Axis::E => &mut self.e,
        }
    }

    /// Iterate `(axis, config)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (Axis, &AxisConfig)> {
        Axis::ALL.into_iter().map(move |a| (a, self.get(a)))
    }

    /// Per-axis steps per unit.
    pub fn steps_per_unit(&self) -> [f32; AXES] {
        Axis::ALL.map(|a| self.get(a).steps_per_unit)
    }

    /// Per-axis maximum feed rate in mm/min.
    pub fn max_feed_rates(&self) -> [f32; AXES] {
        Axis::ALL.map(|a| self.get(a).max_feed_rate.0)
    }
}
