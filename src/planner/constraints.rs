//! Planning constraints derived from the machine configuration.

use crate::config::{MachineConfig, AXES};

/// Derived parameters computed once from [`MachineConfig`] and used for all
/// planning.
#[derive(Debug, Clone)]
pub struct MotionConstraints {
    /// Steps per millimeter, indexed by axis.
    pub steps_per_unit: [f32; AXES],

    /// Per-axis feed ceiling in mm/min.
    pub max_feed_rate: [f32; AXES],

    /// Acceleration in mm/min².
    pub acceleration: f32,

    /// Junction deviation in mm.
    pub junction_deviation: f32,
}

impl MotionConstraints {
    /// Compute planning constraints from the machine configuration.
    pub fn from_config(config: &MachineConfig) -> Self {
        Self {
            steps_per_unit: config.axes.steps_per_unit(),
            max_feed_rate: config.axes.max_feed_rates(),
            acceleration: config.acceleration.per_minute_squared(),
            junction_deviation: config.junction_deviation.value(),
        }
    }
}
