//! Hardware outputs driven by the step interrupt.
//!
//! [`StepperOutputs`] is the seam between the step generator and the board.
//! [`PinOutputs`] implements it over embedded-hal 1.0 pins.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use embedded_hal::pwm::SetDutyCycle;

use crate::config::{Axis, AXES, POWER_SCALE};

/// Outputs the step generator drives.
///
/// Implementations must not block; they are called from interrupt context.
pub trait StepperOutputs {
    /// Latch the direction line of an axis.
    fn set_direction(&mut self, axis: Axis, negative: bool);

    /// Raise the step line of an axis.
    fn step(&mut self, axis: Axis);

    /// Lower every raised step line.
    fn clear_steps(&mut self);

    /// Switch the laser enable line.
    fn set_laser(&mut self, on: bool);

    /// Set the laser PWM duty in basis points of full scale (0-10000).
    fn set_laser_duty(&mut self, duty: u16);

    /// An endstop on this axis is asserted.
    fn endstop_triggered(&mut self, axis: Axis) -> bool;
}

/// Placeholder endstop input for axes without a switch. Never asserted.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEndstop;

impl ErrorType for NoEndstop {
    type Error = Infallible;
}

impl InputPin for NoEndstop {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(false)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

/// Pins and polarity of one axis.
#[derive(Debug)]
pub struct AxisPins<STEP, DIR, HOME> {
    pub(crate) step: STEP,
    pub(crate) dir: DIR,
    pub(crate) endstop: Option<HOME>,
    pub(crate) invert_step: bool,
    pub(crate) invert_direction: bool,
    pub(crate) endstop_active_high: bool,
    pub(crate) step_raised: bool,
}

/// [`StepperOutputs`] over embedded-hal pins.
///
/// Generic over:
/// - `STEP`, `DIR`: step and direction output pins, shared by all axes
/// - `HOME`: endstop input pin
/// - `LASER`: laser enable output pin
/// - `PWM`: laser power PWM channel
///
/// Pin errors cannot be reported from interrupt context; they are counted
/// and available through [`PinOutputs::pin_faults`].
#[derive(Debug)]
pub struct PinOutputs<STEP, DIR, HOME, LASER, PWM> {
    pub(crate) axes: [Option<AxisPins<STEP, DIR, HOME>>; AXES],
    pub(crate) laser: LASER,
    pub(crate) pwm: PWM,
    pub(crate) pin_faults: u32,
}

impl<STEP, DIR, HOME, LASER, PWM> PinOutputs<STEP, DIR, HOME, LASER, PWM>
where
    STEP: OutputPin,
    DIR: OutputPin,
    HOME: InputPin,
    LASER: OutputPin,
    PWM: SetDutyCycle,
{
    /// Number of pin operations that returned an error.
    #[inline]
    pub fn pin_faults(&self) -> u32 {
        self.pin_faults
    }

    /// Give back the laser pin and PWM channel.
    pub fn release(self) -> (LASER, PWM) {
        (self.laser, self.pwm)
    }

    fn record<E>(&mut self, result: Result<(), E>) {
        if result.is_err() {
            self.pin_faults = self.pin_faults.wrapping_add(1);
        }
    }
}

fn write_pin<P: OutputPin>(pin: &mut P, high: bool) -> Result<(), P::Error> {
    if high {
        pin.set_high()
    } else {
        pin.set_low()
    }
}

impl<STEP, DIR, HOME, LASER, PWM> StepperOutputs for PinOutputs<STEP, DIR, HOME, LASER, PWM>
where
    STEP: OutputPin,
    DIR: OutputPin,
    HOME: InputPin,
    LASER: OutputPin,
    PWM: SetDutyCycle,
{
    fn set_direction(&mut self, axis: Axis, negative: bool) {
        let result = match self.axes[axis.index()].as_mut() {
            // High drives the positive direction unless inverted
            Some(pins) => write_pin(&mut pins.dir, negative == pins.invert_direction).map_err(|_| ()),
            None => Ok(()),
        };
        self.record(result);
    }

    fn step(&mut self, axis: Axis) {
        let result = match self.axes[axis.index()].as_mut() {
            Some(pins) => {
                pins.step_raised = true;
                write_pin(&mut pins.step, !pins.invert_step).map_err(|_| ())
            }
            None => Ok(()),
        };
        self.record(result);
    }

    fn clear_steps(&mut self) {
        let mut faults = 0;
        for pins in self.axes.iter_mut().flatten() {
            if pins.step_raised {
                pins.step_raised = false;
                if write_pin(&mut pins.step, pins.invert_step).is_err() {
                    faults += 1;
                }
            }
        }
        self.pin_faults = self.pin_faults.wrapping_add(faults);
    }

    fn set_laser(&mut self, on: bool) {
        let result = write_pin(&mut self.laser, on).map_err(|_| ());
        self.record(result);
    }

    fn set_laser_duty(&mut self, duty: u16) {
        let result = self
            .pwm
            .set_duty_cycle_fraction(duty.min(POWER_SCALE), POWER_SCALE)
            .map_err(|_| ());
        self.record(result);
    }

    fn endstop_triggered(&mut self, axis: Axis) -> bool {
        let Some(pins) = self.axes[axis.index()].as_mut() else {
            return false;
        };
        let active_high = pins.endstop_active_high;
        let reading = match pins.endstop.as_mut() {
            Some(endstop) => endstop.is_high().map_err(|_| ()),
            None => return false,
        };
        match reading {
            Ok(high) => high == active_high,
            Err(()) => {
                self.pin_faults = self.pin_faults.wrapping_add(1);
                false
            }
        }
    }
}
