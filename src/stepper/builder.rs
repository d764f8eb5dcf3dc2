//! Builder pattern for PinOutputs.

use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::pwm::SetDutyCycle;

use crate::config::{Axis, MachineConfig, AXES};
use crate::error::{ConfigError, Error, Result};

use super::outputs::{AxisPins, NoEndstop, PinOutputs};

/// Builder for creating PinOutputs instances.
///
/// X and Y pins, the laser pin and the PWM channel are required. Z and E
/// are optional; steps for an axis without pins are dropped.
pub struct PinOutputsBuilder<STEP, DIR, HOME, LASER, PWM>
where
    STEP: OutputPin,
    DIR: OutputPin,
    HOME: InputPin,
    LASER: OutputPin,
    PWM: SetDutyCycle,
{
    steps: [Option<STEP>; AXES],
    dirs: [Option<DIR>; AXES],
    endstops: [Option<HOME>; AXES],
    invert_step: [bool; AXES],
    invert_direction: [bool; AXES],
    endstop_active_high: [bool; AXES],
    laser: Option<LASER>,
    pwm: Option<PWM>,
}

impl<STEP, DIR, HOME, LASER, PWM> Default for PinOutputsBuilder<STEP, DIR, HOME, LASER, PWM>
where
    STEP: OutputPin,
    DIR: OutputPin,
    HOME: InputPin,
    LASER: OutputPin,
    PWM: SetDutyCycle,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<STEP, DIR, LASER, PWM> PinOutputsBuilder<STEP, DIR, NoEndstop, LASER, PWM>
where
    STEP: OutputPin,
    DIR: OutputPin,
    LASER: OutputPin,
    PWM: SetDutyCycle,
{
    /// Create a builder for a machine without endstop switches.
    pub fn without_endstops() -> Self {
        Self::new()
    }
}

impl<STEP, DIR, HOME, LASER, PWM> PinOutputsBuilder<STEP, DIR, HOME, LASER, PWM>
where
    STEP: OutputPin,
    DIR: OutputPin,
    HOME: InputPin,
    LASER: OutputPin,
    PWM: SetDutyCycle,
{
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            steps: core::array::from_fn(|_| None),
            dirs: core::array::from_fn(|_| None),
            endstops: core::array::from_fn(|_| None),
            invert_step: [false; AXES],
            invert_direction: [false; AXES],
            endstop_active_high: [false; AXES],
            laser: None,
            pwm: None,
        }
    }

    /// Set the STEP and DIR pins of an axis.
    pub fn axis(mut self, axis: Axis, step: STEP, dir: DIR) -> Self {
        self.steps[axis.index()] = Some(step);
        self.dirs[axis.index()] = Some(dir);
        self
    }

    /// Set the endstop input of an axis.
    pub fn endstop(mut self, axis: Axis, pin: HOME) -> Self {
        self.endstops[axis.index()] = Some(pin);
        self
    }

    /// Set the laser enable pin.
    pub fn laser_pin(mut self, pin: LASER) -> Self {
        self.laser = Some(pin);
        self
    }

    /// Set the laser power PWM channel.
    pub fn pwm(mut self, pwm: PWM) -> Self {
        self.pwm = Some(pwm);
        self
    }

    /// Set step polarity of an axis.
    pub fn invert_step(mut self, axis: Axis, invert: bool) -> Self {
        self.invert_step[axis.index()] = invert;
        self
    }

    /// Set direction polarity of an axis.
    pub fn invert_direction(mut self, axis: Axis, invert: bool) -> Self {
        self.invert_direction[axis.index()] = invert;
        self
    }

    /// Take step, direction and endstop polarity from a MachineConfig.
    pub fn from_config(mut self, config: &MachineConfig) -> Self {
        for (axis, axis_config) in config.axes.iter() {
            let i = axis.index();
            self.invert_step[i] = axis_config.invert_step;
            self.invert_direction[i] = axis_config.invert_direction;
            self.endstop_active_high[i] = axis_config.endstop_active_high;
        }
        self
    }

    /// Build the PinOutputs.
    pub fn build(self) -> Result<PinOutputs<STEP, DIR, HOME, LASER, PWM>> {
        let Self {
            steps,
            dirs,
            endstops,
            invert_step,
            invert_direction,
            endstop_active_high,
            laser,
            pwm,
        } = self;

        for (axis, name) in [(Axis::X, "x step/dir pins"), (Axis::Y, "y step/dir pins")] {
            let i = axis.index();
            if steps[i].is_none() || dirs[i].is_none() {
                return Err(Error::Config(ConfigError::MissingPin(name)));
            }
        }
        let laser = laser.ok_or(Error::Config(ConfigError::MissingPin("laser pin")))?;
        let pwm = pwm.ok_or(Error::Config(ConfigError::MissingPin("laser pwm channel")))?;

        let mut axes: [Option<AxisPins<STEP, DIR, HOME>>; AXES] = core::array::from_fn(|_| None);
        for (i, ((step, dir), endstop)) in steps.into_iter().zip(dirs).zip(endstops).enumerate() {
            if let (Some(step), Some(dir)) = (step, dir) {
                axes[i] = Some(AxisPins {
                    step,
                    dir,
                    endstop,
                    invert_step: invert_step[i],
                    invert_direction: invert_direction[i],
                    endstop_active_high: endstop_active_high[i],
                    step_raised: false,
                });
            }
        }

        Ok(PinOutputs {
            axes,
            laser,
            pwm,
            pin_faults: 0,
        })
    }
}
