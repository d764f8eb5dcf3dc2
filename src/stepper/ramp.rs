//! Per-step speed ramp in fixed point.
//!
//! Delays follow the recurrence `c[n] = c[n-1] - 2 c[n-1] / (4n + 1)`, which
//! tracks the exact constant-acceleration delays `k (sqrt(n+1) - sqrt(n))`
//! within a fraction of a percent after the first few steps, with one
//! integer division per step.

use crate::planner::kinematics::ACCELERATION_TICKS_PER_SECOND;
use crate::planner::{MotionBlock, RampPhase, MINIMUM_STEPS_PER_MINUTE};

/// Timer ticks between two step events, unsigned 24.8 fixed point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StepDelay(u32);

impl StepDelay {
    /// Fractional bits.
    pub const FRACTION_BITS: u32 = 8;

    /// Longest representable delay.
    pub const MAX: StepDelay = StepDelay(u32::MAX);

    /// From a raw 24.8 value.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw 24.8 value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Delay matching a step rate in steps/min.
    pub fn from_rate(steps_per_minute: u32, timer_hz: u32) -> Self {
        if steps_per_minute == 0 {
            return Self::MAX;
        }
        let delay = ((u64::from(timer_hz) * 60) << Self::FRACTION_BITS) / u64::from(steps_per_minute);
        Self(delay.min(u64::from(u32::MAX)) as u32)
    }

    /// Step rate in steps/min.
    pub fn rate(self, timer_hz: u32) -> u32 {
        if self.0 == 0 {
            return u32::MAX;
        }
        let rate = ((u64::from(timer_hz) * 60) << Self::FRACTION_BITS) / u64::from(self.0);
        rate.min(u64::from(u32::MAX)) as u32
    }

    /// Whole timer ticks, rounded to nearest, at least one.
    #[inline]
    pub fn ticks(self) -> u32 {
        ((u64::from(self.0) + (1 << (Self::FRACTION_BITS - 1))) >> Self::FRACTION_BITS).max(1) as u32
    }

    /// Delay of ramp step `n` given the delay of step `n - 1`.
    #[inline]
    pub fn accelerated(self, n: u32) -> Self {
        let c = u64::from(self.0);
        let denom = 4 * u64::from(n) + 1;
        Self((c - (2 * c + denom / 2) / denom) as u32)
    }

    /// Delay of ramp step `n - 1` given the delay of step `n`.
    #[inline]
    pub fn decelerated(self, n: u32) -> Self {
        let c = u64::from(self.0);
        let denom = 4 * u64::from(n.max(1)) - 1;
        let next = c + (2 * c + denom / 2) / denom;
        Self(next.min(u64::from(u32::MAX)) as u32)
    }
}

/// Ramp step index at which a ramp starting from rest reaches `rate`.
///
/// `n = rate² / (2 · acceleration)` with the acceleration expressed through
/// the block's per-tick `rate_delta`, rounded to nearest, at least 1.
pub fn ramp_index(rate: u32, rate_delta: u32) -> u32 {
    let rate = u64::from(rate);
    let divisor = ramp_divisor(rate_delta);
    ((rate * rate + divisor / 2) / divisor).clamp(1, u64::from(u32::MAX)) as u32
}

/// Rate reached after `n` ramp steps from rest; inverse of [`ramp_index`].
pub fn ramp_rate(n: u32, rate_delta: u32) -> u32 {
    let squared = ramp_divisor(rate_delta) * u64::from(n);
    libm::sqrt(squared as f64).min(f64::from(u32::MAX)) as u32
}

/// `2 · acceleration` in steps/min² for a block's `rate_delta`.
#[inline]
fn ramp_divisor(rate_delta: u32) -> u64 {
    120 * u64::from(ACCELERATION_TICKS_PER_SECOND) * u64::from(rate_delta.max(1))
}

/// Ramp state for the block being executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ramp {
    phase: RampPhase,
    delay: StepDelay,
    cruise_delay: StepDelay,
    exit_delay: StepDelay,
    n: u32,
    rate_delta: u32,
    timer_hz: u32,
}

impl Ramp {
    /// Ramp positioned at the first step of `block`.
    ///
    /// Rates are clamped to at least [`MINIMUM_STEPS_PER_MINUTE`]. A ramp up
    /// starts no slower than the rate its index implies, so the recurrence
    /// follows the block's acceleration from the first step.
    pub fn new(block: &MotionBlock, timer_hz: u32) -> Self {
        let nominal = block.nominal_rate.max(MINIMUM_STEPS_PER_MINUTE);
        let initial = block.initial_rate.clamp(MINIMUM_STEPS_PER_MINUTE, nominal);
        let exit = block.final_rate.clamp(MINIMUM_STEPS_PER_MINUTE, nominal);
        let rate_delta = block.rate_delta.max(1);
        let phase = block.phase_at(0);
        let cruise_delay = StepDelay::from_rate(nominal, timer_hz);
        let n = ramp_index(initial, rate_delta);

        let delay = match phase {
            RampPhase::Cruise => cruise_delay,
            RampPhase::RampUp => {
                let start = initial.max(ramp_rate(n, rate_delta)).min(nominal);
                StepDelay::from_rate(start, timer_hz)
            }
            RampPhase::RampDown => StepDelay::from_rate(initial, timer_hz),
        };

        Self {
            phase,
            delay,
            cruise_delay,
            exit_delay: StepDelay::from_rate(exit, timer_hz),
            n,
            rate_delta,
            timer_hz,
        }
    }

    /// Current phase.
    #[inline]
    pub fn phase(&self) -> RampPhase {
        self.phase
    }

    /// Delay until the next step event.
    #[inline]
    pub fn delay(&self) -> StepDelay {
        self.delay
    }

    /// Update the delay after `completed` step events of `block`.
    pub fn advance(&mut self, block: &MotionBlock, completed: u32) {
        match self.phase {
            RampPhase::RampUp => {
                if completed >= block.decelerate_after {
                    self.begin_ramp_down();
                } else if completed >= block.accelerate_until {
                    self.phase = RampPhase::Cruise;
                    self.delay = self.cruise_delay;
                } else {
                    self.n = self.n.saturating_add(1);
                    self.delay = self.delay.accelerated(self.n).max(self.cruise_delay);
                }
            }
            RampPhase::Cruise => {
                if completed >= block.decelerate_after {
                    self.begin_ramp_down();
                }
            }
            RampPhase::RampDown => self.slow_down(),
        }
    }

    fn begin_ramp_down(&mut self) {
        self.phase = RampPhase::RampDown;
        self.n = ramp_index(self.delay.rate(self.timer_hz), self.rate_delta);
        self.slow_down();
    }

    fn slow_down(&mut self) {
        let next = self.delay.decelerated(self.n);
        // Never slower than the exit rate, never faster than now
        self.delay = if next > self.exit_delay {
            self.exit_delay.max(self.delay)
        } else {
            next
        };
        self.n = self.n.saturating_sub(1).max(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libm::sqrt;

    const TIMER_HZ: u32 = 1_000_000;

    fn exact(k: f64, n: u32) -> f64 {
        k * (sqrt(f64::from(n) + 1.0) - sqrt(f64::from(n)))
    }

    #[test]
    fn test_delay_from_rate() {
        // 1000 steps/s at 1 MHz
        let delay = StepDelay::from_rate(60_000, TIMER_HZ);
        assert_eq!(delay.ticks(), 1000);
        assert_eq!(delay.raw(), 1000 << 8);
        assert_eq!(delay.rate(TIMER_HZ), 60_000);
        assert_eq!(StepDelay::from_rate(0, TIMER_HZ), StepDelay::MAX);
        assert_eq!(StepDelay::from_raw(10).ticks(), 1);
    }

    #[test]
    fn test_acceleration_tracks_exact_delays() {
        let k = f64::from(1_000_000u32 << 8);
        let mut delay = StepDelay::from_raw(exact(k, 100) as u32);
        for n in 101..=400 {
            delay = delay.accelerated(n);
        }
        let expected = exact(k, 400);
        let error = (f64::from(delay.raw()) - expected).abs() / expected;
        assert!(error < 0.01, "relative error {}", error);
    }

    #[test]
    fn test_deceleration_mirrors_acceleration() {
        let k = f64::from(1_000_000u32 << 8);
        let mut delay = StepDelay::from_raw(exact(k, 400) as u32);
        for n in (101..=400).rev() {
            delay = delay.decelerated(n);
        }
        let expected = exact(k, 100);
        let error = (f64::from(delay.raw()) - expected).abs() / expected;
        assert!(error < 0.01, "relative error {}", error);
    }

    #[test]
    fn test_ramp_index_matches_planner_distance() {
        // 60000² / (2 · 200 · 50 · 60)
        assert_eq!(ramp_index(60_000, 200), 3000);
        assert_eq!(ramp_index(0, 200), 1);
        assert_eq!(ramp_rate(3000, 200), 60_000);
    }

    #[test]
    fn test_ramp_from_rest_starts_at_first_step_rate() {
        // 500 mm/s² at 1000 steps/mm is 1.8e9 steps/min²
        let block = MotionBlock {
            step_event_count: 20_000,
            nominal_rate: 3_000_000,
            rate_delta: 600_000,
            initial_rate: 0,
            final_rate: 0,
            accelerate_until: 2500,
            decelerate_after: 17_500,
            ..MotionBlock::EMPTY
        };
        let ramp = Ramp::new(&block, TIMER_HZ);
        // sqrt(2 · 1.8e9) steps/min after one step
        assert_eq!(ramp.delay().ticks(), 1000);
    }

    #[test]
    fn test_block_ramp_profile() {
        let block = MotionBlock {
            step_event_count: 10_000,
            nominal_rate: 60_000,
            rate_delta: 200,
            initial_rate: 0,
            final_rate: 0,
            accelerate_until: 3000,
            decelerate_after: 7000,
            ..MotionBlock::EMPTY
        };
        let mut ramp = Ramp::new(&block, TIMER_HZ);
        let cruise = StepDelay::from_rate(60_000, TIMER_HZ);
        assert_eq!(ramp.phase(), RampPhase::RampUp);
        assert_eq!(ramp.delay(), StepDelay::from_rate(MINIMUM_STEPS_PER_MINUTE, TIMER_HZ));

        let mut previous = ramp.delay();
        for completed in 1..=block.step_event_count {
            ramp.advance(&block, completed);
            let delay = ramp.delay();
            match ramp.phase() {
                RampPhase::RampUp => assert!(delay <= previous),
                RampPhase::Cruise => assert_eq!(delay, cruise),
                RampPhase::RampDown => assert!(delay >= previous),
            }
            assert!(delay >= cruise);
            if completed == 3000 {
                assert_eq!(ramp.phase(), RampPhase::Cruise);
            }
            previous = delay;
        }
        assert_eq!(ramp.phase(), RampPhase::RampDown);
        assert!(ramp.delay().rate(TIMER_HZ) < 5000);
    }

    #[test]
    fn test_ramp_starting_in_cruise() {
        let block = MotionBlock {
            step_event_count: 100,
            nominal_rate: 60_000,
            rate_delta: 200,
            initial_rate: 60_000,
            final_rate: 60_000,
            accelerate_until: 0,
            decelerate_after: 100,
            ..MotionBlock::EMPTY
        };
        let ramp = Ramp::new(&block, TIMER_HZ);
        assert_eq!(ramp.phase(), RampPhase::Cruise);
        assert_eq!(ramp.delay().ticks(), 1000);
    }
}
