//! Configuration validation.

use crate::error::{ConfigError, Error, Result};

use super::laser::POWER_SCALE;
use super::{AxisConfig, MachineConfig};

/// Validate a machine configuration.
///
/// Checks:
/// - Every axis has a positive scale and feed limit
/// - Acceleration and junction deviation are positive
/// - Laser PWM range is ordered and within full scale
/// - Default feeds and the step timer frequency are positive
pub fn validate_config(config: &MachineConfig) -> Result<()> {
    for (axis, axis_config) in config.axes.iter() {
        validate_axis(axis.letter(), axis_config)?;
    }

    if !(config.acceleration.0 > 0.0) {
        return Err(Error::Config(ConfigError::InvalidAcceleration(config.acceleration.0)));
    }

    if !(config.junction_deviation.0 > 0.0) {
        return Err(Error::Config(ConfigError::InvalidJunctionDeviation(
            config.junction_deviation.0,
        )));
    }

    let laser = &config.laser;
    if laser.pwm_min > laser.pwm_max || laser.pwm_max > POWER_SCALE {
        return Err(Error::Config(ConfigError::InvalidLaserPwm {
            min: laser.pwm_min,
            max: laser.pwm_max,
        }));
    }

    for feed in [config.feeds.travel, config.feeds.laser, config.feeds.z] {
        if !(feed.0 > 0.0) {
            return Err(Error::Config(ConfigError::InvalidFeedRate(feed.0)));
        }
    }

    if config.step_timer_hz == 0 {
        return Err(Error::Config(ConfigError::InvalidTimerFrequency(0)));
    }

    Ok(())
}

fn validate_axis(axis: char, config: &AxisConfig) -> Result<()> {
    // NaN fails these comparisons too
    if !(config.steps_per_unit > 0.0) {
        return Err(Error::Config(ConfigError::InvalidStepsPerUnit {
            axis,
            value: config.steps_per_unit,
        }));
    }

    if !(config.max_feed_rate.0 > 0.0) {
        return Err(Error::Config(ConfigError::InvalidMaxFeedRate {
            axis,
            value: config.max_feed_rate.0,
        }));
    }

    Ok(())
}
