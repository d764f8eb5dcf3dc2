//! Unit types for physical quantities.
//!
//! Provides type-safe representations of lengths, feed rates, accelerations,
//! wire micrometers and motor steps to prevent unit confusion at compile time.

use core::ops::{Add, Mul, Sub};

use serde::Deserialize;

/// Linear distance in millimeters (the machine's physical unit).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Deserialize)]
#[serde(transparent)]
pub struct Millimeters(pub f32);

impl Millimeters {
    /// Create a new Millimeters value.
    #[inline]
    pub const fn new(value: f32) -> Self {
        Self(value)
    }

    /// Get the raw value.
    #[inline]
    pub const fn value(self) -> f32 {
        self.0
    }
}

impl Add for Millimeters {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Millimeters {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

/// Feed rate in millimeters per minute.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Deserialize)]
#[serde(transparent)]
pub struct MmPerMin(pub f32);

impl MmPerMin {
    /// Create a new MmPerMin value.
    #[inline]
    pub const fn new(value: f32) -> Self {
        Self(value)
    }

    /// Get the raw value.
    #[inline]
    pub const fn value(self) -> f32 {
        self.0
    }
}

impl Mul<f32> for MmPerMin {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self::Output {
        Self(self.0 * rhs)
    }
}

/// Acceleration in millimeters per second squared.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Deserialize)]
#[serde(transparent)]
pub struct MmPerSecSquared(pub f32);

impl MmPerSecSquared {
    /// Create a new MmPerSecSquared value.
    #[inline]
    pub const fn new(value: f32) -> Self {
        Self(value)
    }

    /// Get the raw value.
    #[inline]
    pub const fn value(self) -> f32 {
        self.0
    }

    /// Same acceleration expressed in mm/min², the planner's internal unit.
    #[inline]
    pub fn per_minute_squared(self) -> f32 {
        self.0 * 3600.0
    }
}

/// Coordinate as transmitted on the wire: integer micrometers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Micrometers(pub i32);

impl Micrometers {
    /// Convert to millimeters.
    #[inline]
    pub fn to_millimeters(self) -> Millimeters {
        Millimeters(self.0 as f32 / 1000.0)
    }
}

impl From<Micrometers> for Millimeters {
    fn from(um: Micrometers) -> Self {
        um.to_millimeters()
    }
}

/// Axis position in steps (absolute from machine zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Steps(pub i32);

impl Steps {
    /// Create a new Steps value.
    #[inline]
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    /// Get the raw value.
    #[inline]
    pub const fn value(self) -> i32 {
        self.0
    }

    /// Get absolute value as u32.
    #[inline]
    pub fn abs(self) -> u32 {
        self.0.unsigned_abs()
    }

    /// Convert to millimeters using the axis scale.
    #[inline]
    pub fn to_millimeters(self, steps_per_unit: f32) -> Millimeters {
        Millimeters(self.0 as f32 / steps_per_unit)
    }

    /// Create from millimeters using the axis scale, rounding to the nearest step.
    #[inline]
    pub fn from_millimeters(mm: Millimeters, steps_per_unit: f32) -> Self {
        Self(libm::roundf(mm.0 * steps_per_unit) as i32)
    }
}

impl Add for Steps {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Steps {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

/// Extension trait for creating unit types from primitives.
pub trait UnitExt {
    /// Convert to Millimeters.
    fn mm(self) -> Millimeters;
    /// Convert to MmPerMin.
    fn mm_per_min(self) -> MmPerMin;
    /// Convert to MmPerSecSquared.
    fn mm_per_sec_squared(self) -> MmPerSecSquared;
}

impl UnitExt for f32 {
    #[inline]
    fn mm(self) -> Millimeters {
        Millimeters(self)
    }

    #[inline]
    fn mm_per_min(self) -> MmPerMin {
        MmPerMin(self)
    }

    #[inline]
    fn mm_per_sec_squared(self) -> MmPerSecSquared {
        MmPerSecSquared(self)
    }
}
