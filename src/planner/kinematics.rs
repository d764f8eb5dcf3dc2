//! Constant-acceleration kinematics shared by the look-ahead passes.
//!
//! Speeds are mm/min or steps/min and accelerations are per minute squared,
//! matching the units stored in [`MotionBlock`].

use libm::{ceilf, floorf, sqrtf};

use super::block::MotionBlock;

/// Acceleration updates per second in the step generator.
pub const ACCELERATION_TICKS_PER_SECOND: u32 = 50;

/// Speed every block may assume at a full stop, mm/min.
pub const MINIMUM_PLANNER_SPEED: f32 = 0.0;

/// Slowest rate the step generator will run at, steps/min.
pub const MINIMUM_STEPS_PER_MINUTE: u32 = 1200;

/// Cosine limit beyond which a junction counts as straight.
const STRAIGHT_JUNCTION_COS: f32 = 0.95;

/// Distance needed to go from `initial_rate` to `target_rate`.
#[inline]
pub fn estimate_acceleration_distance(initial_rate: f32, target_rate: f32, acceleration: f32) -> f32 {
    (target_rate * target_rate - initial_rate * initial_rate) / (2.0 * acceleration)
}

/// Point at which to stop accelerating and start decelerating so that a
/// block of `distance` starts at `initial_rate` and ends at `final_rate`
/// without reaching its nominal rate.
#[inline]
pub fn intersection_distance(initial_rate: f32, final_rate: f32, acceleration: f32, distance: f32) -> f32 {
    (2.0 * acceleration * distance - initial_rate * initial_rate + final_rate * final_rate)
        / (4.0 * acceleration)
}

/// Highest speed from which `target_velocity` is reachable over `distance`
/// at the given (negative) acceleration.
#[inline]
pub fn max_allowable_speed(acceleration: f32, target_velocity: f32, distance: f32) -> f32 {
    sqrtf(target_velocity * target_velocity - 2.0 * acceleration * distance)
}

/// Junction speed limit between two unit direction vectors.
///
/// Straight continuations are limited only by the slower nominal speed,
/// reversals drop to [`MINIMUM_PLANNER_SPEED`], everything in between
/// follows the junction deviation model.
pub fn junction_speed(
    previous_unit: &[f32],
    unit: &[f32],
    previous_nominal: f32,
    nominal: f32,
    acceleration: f32,
    junction_deviation: f32,
) -> f32 {
    let cos_theta: f32 = -previous_unit
        .iter()
        .zip(unit.iter())
        .map(|(a, b)| a * b)
        .sum::<f32>();

    if cos_theta >= STRAIGHT_JUNCTION_COS {
        // Reversal
        return MINIMUM_PLANNER_SPEED;
    }

    let mut vmax = previous_nominal.min(nominal);
    if cos_theta > -STRAIGHT_JUNCTION_COS {
        let sin_theta_d2 = sqrtf(0.5 * (1.0 - cos_theta));
        vmax = vmax.min(sqrtf(
            acceleration * junction_deviation * sin_theta_d2 / (1.0 - sin_theta_d2),
        ));
    }
    vmax
}

/// Recompute a block's rates and ramp boundaries for the given entry and
/// exit factors (fractions of the nominal speed).
pub fn calculate_trapezoid(block: &mut MotionBlock, entry_factor: f32, exit_factor: f32) {
    let nominal_rate = block.nominal_rate;
    let step_event_count = block.step_event_count;

    let initial_rate = (ceilf(nominal_rate as f32 * entry_factor) as u32).min(nominal_rate);
    let final_rate = (ceilf(nominal_rate as f32 * exit_factor) as u32).min(nominal_rate);

    let acceleration_per_minute =
        block.rate_delta as f32 * ACCELERATION_TICKS_PER_SECOND as f32 * 60.0;

    let mut accelerate_steps = ceilf(estimate_acceleration_distance(
        initial_rate as f32,
        nominal_rate as f32,
        acceleration_per_minute,
    ))
    .max(0.0) as u32;
    let decelerate_steps = floorf(estimate_acceleration_distance(
        nominal_rate as f32,
        final_rate as f32,
        -acceleration_per_minute,
    ))
    .max(0.0) as u32;

    let plateau_steps = i64::from(step_event_count)
        - i64::from(accelerate_steps)
        - i64::from(decelerate_steps);

    let plateau_steps = if plateau_steps < 0 {
        // Nominal rate is never reached: accelerate to the intersection
        // point then decelerate straight away
        accelerate_steps = ceilf(intersection_distance(
            initial_rate as f32,
            final_rate as f32,
            acceleration_per_minute,
            step_event_count as f32,
        ))
        .max(0.0) as u32;
        accelerate_steps = accelerate_steps.min(step_event_count);
        0
    } else {
        plateau_steps as u32
    };

    block.initial_rate = initial_rate;
    block.final_rate = final_rate;
    block.accelerate_until = accelerate_steps;
    block.decelerate_after = accelerate_steps + plateau_steps;
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn block(step_event_count: u32, nominal_rate: u32, rate_delta: u32) -> MotionBlock {
        MotionBlock {
            step_event_count,
            nominal_rate,
            rate_delta,
            ..MotionBlock::EMPTY
        }
    }

    #[test]
    fn test_estimate_distance_symmetry() {
        let up = estimate_acceleration_distance(0.0, 6000.0, 1000.0);
        let down = estimate_acceleration_distance(6000.0, 0.0, -1000.0);
        assert!((up - down).abs() < 1e-3);
        assert!((up - 18_000.0).abs() < 1e-2);
    }

    #[test]
    fn test_max_allowable_speed() {
        // v^2 = 0 + 2 * 100 * 2
        let v = max_allowable_speed(-100.0, 0.0, 2.0);
        assert!((v - 20.0).abs() < 1e-4);
    }

    #[test]
    fn test_junction_straight_line_keeps_speed() {
        let v = junction_speed(&[1.0, 0.0], &[1.0, 0.0], 3000.0, 2000.0, 1.8e6, 0.05);
        assert_eq!(v, 2000.0);
    }

    #[test]
    fn test_junction_reversal_stops() {
        let v = junction_speed(&[1.0, 0.0], &[-1.0, 0.0], 3000.0, 3000.0, 1.8e6, 0.05);
        assert_eq!(v, MINIMUM_PLANNER_SPEED);
    }

    #[test]
    fn test_junction_right_angle() {
        let accel = 500.0 * 3600.0;
        let v = junction_speed(&[1.0, 0.0], &[0.0, 1.0], 6000.0, 6000.0, accel, 0.05);
        // cos = 0, sin(theta/2) = sqrt(0.5)
        let s = sqrtf(0.5);
        let expected = sqrtf(accel * 0.05 * s / (1.0 - s));
        assert!((v - expected).abs() < 1.0);
        assert!(v > 0.0 && v < 6000.0);
    }

    #[test]
    fn test_trapezoid_full_plateau() {
        let mut b = block(10_000, 60_000, 200);
        calculate_trapezoid(&mut b, 0.0, 0.0);
        assert_eq!(b.initial_rate, 0);
        assert_eq!(b.final_rate, 0);
        // 60000^2 / (2 * 600000) = 3000 steps each way
        assert_eq!(b.accelerate_until, 3000);
        assert_eq!(b.decelerate_after, 7000);
    }

    #[test]
    fn test_trapezoid_triangle() {
        let mut b = block(1000, 60_000, 200);
        calculate_trapezoid(&mut b, 0.0, 0.0);
        assert_eq!(b.accelerate_until, b.decelerate_after);
        assert_eq!(b.accelerate_until, 500);
    }

    #[test]
    fn test_trapezoid_cruise_only() {
        let mut b = block(500, 60_000, 200);
        calculate_trapezoid(&mut b, 1.0, 1.0);
        assert_eq!(b.initial_rate, 60_000);
        assert_eq!(b.accelerate_until, 0);
        assert_eq!(b.decelerate_after, 500);
    }

    proptest! {
        #[test]
        fn prop_trapezoid_boundaries_ordered(
            steps in 1u32..200_000,
            nominal in 1200u32..600_000,
            rate_delta in 1u32..5_000,
            entry in 0.0f32..=1.0,
            exit in 0.0f32..=1.0,
        ) {
            let mut b = block(steps, nominal, rate_delta);
            calculate_trapezoid(&mut b, entry, exit);
            prop_assert!(b.accelerate_until <= b.decelerate_after);
            prop_assert!(b.decelerate_after <= b.step_event_count);
            prop_assert!(b.initial_rate <= b.nominal_rate);
            prop_assert!(b.final_rate <= b.nominal_rate);
        }
    }
}
