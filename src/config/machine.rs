//! Machine configuration - root configuration structure.

use serde::Deserialize;

use super::axis::{AxesConfig, Axis, AxisConfig};
use super::laser::{FeedConfig, LaserConfig};
use super::units::{Millimeters, MmPerMin, MmPerSecSquared};

/// Root configuration structure from TOML.
///
/// Supplied once at startup and read-only afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct MachineConfig {
    /// Per-axis scale, limits and polarity.
    pub axes: AxesConfig,

    /// Linear acceleration used for every move.
    #[serde(rename = "acceleration_mm_per_sec2")]
    pub acceleration: MmPerSecSquared,

    /// Cornering tolerance: distance the toolpath may deviate from the sharp corner.
    #[serde(default = "default_junction_deviation", rename = "junction_deviation_mm")]
    pub junction_deviation: Millimeters,

    /// Tick rate of the hardware step timer.
    #[serde(default = "default_step_timer_hz")]
    pub step_timer_hz: u32,

    /// Laser PWM mapping.
    #[serde(default)]
    pub laser: LaserConfig,

    /// Default feeds for the command decoder.
    #[serde(default)]
    pub feeds: FeedConfig,
}

fn default_junction_deviation() -> Millimeters {
    Millimeters(0.05)
}

fn default_step_timer_hz() -> u32 {
    1_000_000
}

impl MachineConfig {
    /// Configuration with identical axes and default laser/feed settings.
    pub fn uniform(
        steps_per_unit: f32,
        max_feed_rate: MmPerMin,
        acceleration: MmPerSecSquared,
    ) -> Self {
        Self {
            axes: AxesConfig::uniform(AxisConfig::new(steps_per_unit, max_feed_rate)),
            acceleration,
            junction_deviation: default_junction_deviation(),
            step_timer_hz: default_step_timer_hz(),
            laser: LaserConfig::default(),
            feeds: FeedConfig::default(),
        }
    }

    /// Get one axis' configuration.
    #[inline]
    pub fn axis(&self, axis: Axis) -> &AxisConfig {
        self.axes.get(axis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_defaults() {
        let config = MachineConfig::uniform(80.0, MmPerMin(3000.0), MmPerSecSquared(200.0));
        assert_eq!(config.axis(Axis::Y).steps_per_unit, 80.0);
        assert!((config.junction_deviation.value() - 0.05).abs() < 1e-6);
        assert_eq!(config.step_timer_hz, 1_000_000);
    }
}
