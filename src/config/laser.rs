//! Laser output and default feed configuration.

use serde::Deserialize;

use super::units::MmPerMin;

/// Full-scale value for laser power and PWM duty (basis points).
pub const POWER_SCALE: u16 = 10_000;

/// Laser PWM settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LaserConfig {
    /// Duty at power 0, in basis points of full duty.
    #[serde(default)]
    pub pwm_min: u16,

    /// Duty at power 10000, in basis points of full duty.
    #[serde(default = "default_pwm_max")]
    pub pwm_max: u16,

    /// PWM carrier frequency, applied by the hardware layer at startup.
    #[serde(default = "default_pwm_frequency")]
    pub pwm_frequency_hz: u32,
}

fn default_pwm_max() -> u16 {
    POWER_SCALE
}

fn default_pwm_frequency() -> u32 {
    5_000
}

impl Default for LaserConfig {
    fn default() -> Self {
        Self {
            pwm_min: 0,
            pwm_max: default_pwm_max(),
            pwm_frequency_hz: default_pwm_frequency(),
        }
    }
}

impl LaserConfig {
    /// Map a block power (0-10000) linearly onto `[pwm_min, pwm_max]`.
    pub fn duty_for_power(&self, power: u16) -> u16 {
        let power = u32::from(power.min(POWER_SCALE));
        let min = u32::from(self.pwm_min);
        let max = u32::from(self.pwm_max.max(self.pwm_min));
        (min + (max - min) * power / u32::from(POWER_SCALE)) as u16
    }
}

/// Default feed rates used by the command decoder.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Feed for laser-off moves (opcode 0).
    #[serde(default = "default_travel_feed", rename = "travel_mm_per_min")]
    pub travel: MmPerMin,

    /// Feed for laser lines (opcode 1) before any rescale parameter.
    #[serde(default = "default_laser_feed", rename = "laser_mm_per_min")]
    pub laser: MmPerMin,

    /// Feed for auxiliary-axis moves (opcode 2).
    #[serde(default = "default_z_feed", rename = "z_mm_per_min")]
    pub z: MmPerMin,
}

fn default_travel_feed() -> MmPerMin {
    MmPerMin(6000.0)
}

fn default_laser_feed() -> MmPerMin {
    MmPerMin(1500.0)
}

fn default_z_feed() -> MmPerMin {
    MmPerMin(300.0)
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            travel: default_travel_feed(),
            laser: default_laser_feed(),
            z: default_z_feed(),
        }
    }
}
