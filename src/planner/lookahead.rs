//! Look-ahead planner.
//!
//! Turns target positions into [`MotionBlock`]s and keeps the queued blocks'
//! junction speeds and trapezoids consistent after every enqueue:
//!
//! 1. The new block gets a junction speed limit from the angle it makes with
//!    the previous block and an entry speed from which it can still stop.
//! 2. A reverse pass walks newest to oldest, raising entry speeds up to what
//!    each following block allows.
//! 3. A forward pass walks oldest to newest, lowering entry speeds to what
//!    the preceding block can actually reach.
//! 4. Trapezoids are recomputed for blocks whose entry or exit changed.
//!
//! The oldest block's entry speed is never changed: it is either executing
//! or already joined to a block that executed. While the step generator
//! executes a block that block is frozen entirely.

use libm::{ceilf, sqrtf};

use crate::config::units::MmPerMin;
use crate::config::{Axis, MachineConfig, AXES};
use crate::error::PlannerError;
use crate::protocol::{BitmapBuffer, DEFAULT_BITMAP_WORDS};

use super::block::{ActionKind, MotionBlock};
use super::constraints::MotionConstraints;
use super::kinematics::{
    calculate_trapezoid, junction_speed, max_allowable_speed, ACCELERATION_TICKS_PER_SECOND,
    MINIMUM_PLANNER_SPEED,
};
use super::position::{PositionTracker, Target};
use super::ring::{BlockRing, DEFAULT_QUEUE_CAPACITY};

/// Feeds below this are raised to it, mm/min.
const MINIMUM_FEED_RATE: f32 = 1.0;

/// Longest move in steps on any axis; the step generator's counters are i32.
pub const MAX_STEP_EVENTS: u32 = i32::MAX as u32;

/// Consumer side of the block queue, used by the step generator.
pub trait BlockSource {
    /// Oldest queued block. The block is marked in-flight and the planner
    /// stops modifying it until it is discarded.
    fn current_block(&mut self) -> Option<&MotionBlock>;

    /// Sequence id of the oldest queued block.
    fn current_sequence(&self) -> Option<u32>;

    /// Release the oldest block after its last step event.
    fn discard_current_block(&mut self);

    /// Drop all queued motion after an endstop hit.
    fn abort(&mut self);

    /// Width in pixels of the loaded bitmap.
    fn bitmap_width(&self) -> u32;

    /// Pixel of the loaded bitmap.
    fn bitmap_bit(&self, index: u32) -> bool;

    /// Account for one emitted step pulse.
    fn record_step(&mut self, axis: Axis, negative: bool);
}

/// Block queue with look-ahead speed planning.
///
/// `N` is the ring size (holding `N - 1` blocks) and `W` the bitmap capacity
/// in 32-bit words.
#[derive(Debug, Clone)]
pub struct Planner<const N: usize = DEFAULT_QUEUE_CAPACITY, const W: usize = DEFAULT_BITMAP_WORDS> {
    constraints: MotionConstraints,
    ring: BlockRing<N>,
    position: PositionTracker,
    previous_unit_vec: [f32; AXES],
    previous_nominal_speed: f32,
    acceleration_enabled: bool,
    /// Oldest block is being executed.
    busy: bool,
    /// Exit speed the executing block was latched with.
    busy_exit_speed: f32,
    bitmap: BitmapBuffer<W>,
    next_sequence: u32,
    blocks_planned: u32,
}

impl<const N: usize, const W: usize> Planner<N, W> {
    /// Planner at the machine origin with an empty queue.
    pub fn new(config: &MachineConfig) -> Self {
        let constraints = MotionConstraints::from_config(config);
        let position = PositionTracker::new(constraints.steps_per_unit);
        Self {
            constraints,
            ring: BlockRing::new(),
            position,
            previous_unit_vec: [0.0; AXES],
            previous_nominal_speed: 0.0,
            acceleration_enabled: true,
            busy: false,
            busy_exit_speed: MINIMUM_PLANNER_SPEED,
            bitmap: BitmapBuffer::new(),
            next_sequence: 0,
            blocks_planned: 0,
        }
    }

    /// Plan a straight move from the planned position to `target`.
    ///
    /// `target` is in work coordinates. Moves shorter than one step on every
    /// axis are dropped, as are moves longer than [`MAX_STEP_EVENTS`] on
    /// any axis. [`ActionKind::Wait`] queues nothing and succeeds
    /// only once the queue is empty.
    ///
    /// # Errors
    ///
    /// - [`PlannerError::QueueFull`] when no slot is free
    /// - [`PlannerError::Busy`] for a wait while motion is queued
    ///
    /// Nothing is modified on error; retry the same call later.
    pub fn enqueue(
        &mut self,
        target: &Target,
        feed_rate: MmPerMin,
        action: ActionKind,
        power: u16,
    ) -> Result<(), PlannerError> {
        if action == ActionKind::Wait {
            return if self.ring.is_empty() {
                Ok(())
            } else {
                Err(PlannerError::Busy)
            };
        }
        if self.ring.is_full() {
            return Err(PlannerError::QueueFull);
        }

        let target_steps = self.position.to_steps(target);
        let planned = self.position.planned_steps();
        let steps_per_unit = &self.constraints.steps_per_unit;

        let mut steps = [0u32; AXES];
        let mut direction_bits = 0u8;
        let mut delta_mm = [0.0f32; AXES];
        for axis in Axis::ALL {
            let i = axis.index();
            let delta = i64::from(target_steps[i].value()) - i64::from(planned[i].value());
            let count = delta.unsigned_abs();
            if count > u64::from(MAX_STEP_EVENTS) {
                warn!("dropping move of {} steps on axis {}", count, i);
                return Ok(());
            }
            steps[i] = count as u32;
            if delta < 0 {
                direction_bits |= 1 << i;
            }
            delta_mm[i] = delta as f32 / steps_per_unit[i];
        }

        let step_event_count = steps.iter().copied().max().unwrap_or(0);
        if step_event_count == 0 {
            trace!("dropping zero-length move");
            return Ok(());
        }

        // Length is measured in XYZ; E-only moves use the E distance
        let [dx, dy, dz, de] = delta_mm;
        let xyz = sqrtf(dx * dx + dy * dy + dz * dz);
        let (millimeters, unit_vec) = if xyz > 0.0 {
            (xyz, [dx / xyz, dy / xyz, dz / xyz, 0.0])
        } else {
            (de.abs(), [0.0, 0.0, 0.0, if de < 0.0 { -1.0 } else { 1.0 }])
        };

        let feed_rate = if feed_rate.value() > MINIMUM_FEED_RATE {
            feed_rate.value()
        } else {
            MINIMUM_FEED_RATE
        };
        let mut inverse_minute = feed_rate / millimeters;

        // Scale the whole move down if any axis would exceed its ceiling
        let mut speed_factor = 1.0f32;
        for i in 0..AXES {
            if steps[i] == 0 {
                continue;
            }
            let axis_feed = delta_mm[i].abs() * inverse_minute;
            let max_feed = self.constraints.max_feed_rate[i];
            if axis_feed > max_feed {
                speed_factor = speed_factor.min(max_feed / axis_feed);
            }
        }
        inverse_minute *= speed_factor;

        let acceleration = self.constraints.acceleration;
        let nominal_speed = millimeters * inverse_minute;
        let nominal_rate = (ceilf(step_event_count as f32 * inverse_minute) as u32).max(1);
        let rate_delta = (ceilf(
            step_event_count as f32 / millimeters * acceleration
                / (60.0 * ACCELERATION_TICKS_PER_SECOND as f32),
        ) as u32)
            .max(1);

        let mut block = MotionBlock {
            action,
            steps,
            direction_bits,
            step_event_count,
            nominal_rate,
            nominal_speed,
            millimeters,
            rate_delta,
            power,
            sequence: self.next_sequence,
            ..MotionBlock::EMPTY
        };

        if self.acceleration_enabled {
            let vmax_junction = if !self.ring.is_empty() && self.previous_nominal_speed > 0.0 {
                junction_speed(
                    &self.previous_unit_vec,
                    &unit_vec,
                    self.previous_nominal_speed,
                    nominal_speed,
                    acceleration,
                    self.constraints.junction_deviation,
                )
            } else {
                MINIMUM_PLANNER_SPEED
            };
            let v_allowable = max_allowable_speed(-acceleration, MINIMUM_PLANNER_SPEED, millimeters);

            block.max_entry_speed = vmax_junction;
            block.entry_speed = vmax_junction.min(v_allowable);
            block.nominal_length_flag = nominal_speed <= v_allowable;
            block.recalculate_flag = true;
        } else {
            block.max_entry_speed = nominal_speed;
            block.entry_speed = nominal_speed;
            block.initial_rate = nominal_rate;
            block.final_rate = nominal_rate;
            block.accelerate_until = 0;
            block.decelerate_after = step_event_count;
        }

        if self.ring.push(block).is_err() {
            return Err(PlannerError::QueueFull);
        }

        self.previous_unit_vec = unit_vec;
        self.previous_nominal_speed = nominal_speed;
        self.position.set_planned_steps(target_steps);
        self.next_sequence = self.next_sequence.wrapping_add(1);
        self.blocks_planned = self.blocks_planned.wrapping_add(1);

        if self.acceleration_enabled {
            self.recalculate();
        }

        debug!(
            "planned block {}: {} step events at {} steps/min",
            block.sequence,
            step_event_count,
            nominal_rate
        );
        Ok(())
    }

    /// A free slot is available.
    #[inline]
    pub fn ready(&self) -> bool {
        !self.ring.is_full()
    }

    /// Number of queued blocks.
    #[inline]
    pub fn queue_depth(&self) -> usize {
        self.ring.len()
    }

    /// No blocks queued.
    #[inline]
    pub fn queue_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Maximum number of queued blocks.
    #[inline]
    pub fn queue_capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Queued blocks from oldest to newest.
    pub fn blocks(&self) -> impl Iterator<Item = &MotionBlock> + '_ {
        self.ring.iter()
    }

    /// Drop all queued blocks. The planned position falls back to the actual
    /// position.
    pub fn clear_buffer(&mut self) {
        let dropped = self.ring.len();
        self.ring.clear();
        self.busy = false;
        self.previous_nominal_speed = 0.0;
        self.position.sync_planned_to_actual();
        info!("block queue cleared, {} blocks dropped", dropped);
    }

    /// Access operations that require an empty queue.
    ///
    /// # Errors
    ///
    /// [`PlannerError::NotIdle`] while any block is queued.
    pub fn idle(&mut self) -> Result<IdlePlanner<'_, N, W>, PlannerError> {
        if self.ring.is_empty() {
            Ok(IdlePlanner { planner: self })
        } else {
            Err(PlannerError::NotIdle)
        }
    }

    /// Position tracker.
    #[inline]
    pub fn position(&self) -> &PositionTracker {
        &self.position
    }

    /// Actual position in work coordinates.
    #[inline]
    pub fn actual_position(&self) -> Target {
        self.position.actual()
    }

    /// Position at the end of the last queued block, work coordinates.
    #[inline]
    pub fn planned_position(&self) -> Target {
        self.position.planned()
    }

    /// Planning constraints in use.
    #[inline]
    pub fn constraints(&self) -> &MotionConstraints {
        &self.constraints
    }

    /// Acceleration planning is active.
    #[inline]
    pub fn acceleration_enabled(&self) -> bool {
        self.acceleration_enabled
    }

    /// Bitmap used by bitmap lines.
    #[inline]
    pub fn bitmap(&self) -> &BitmapBuffer<W> {
        &self.bitmap
    }

    /// Blocks accepted since startup, wrapping.
    #[inline]
    pub fn blocks_planned(&self) -> u32 {
        self.blocks_planned
    }

    fn recalculate(&mut self) {
        self.reverse_pass();
        self.forward_pass();
        self.recalculate_trapezoids();
    }

    fn reverse_pass(&mut self) {
        let acceleration = self.constraints.acceleration;
        let tail = self.ring.tail_index();
        let mut index = self.ring.head_index();
        let mut next_entry: Option<f32> = None;

        while index != tail {
            index = BlockRing::<N>::prev_index(index);
            if index == tail {
                break;
            }
            let block = self.ring.slot_mut(index);
            if let Some(next_entry) = next_entry {
                if block.entry_speed != block.max_entry_speed {
                    block.entry_speed = if !block.nominal_length_flag
                        && block.max_entry_speed > next_entry
                    {
                        block.max_entry_speed.min(max_allowable_speed(
                            -acceleration,
                            next_entry,
                            block.millimeters,
                        ))
                    } else {
                        block.max_entry_speed
                    };
                    block.recalculate_flag = true;
                }
            }
            next_entry = Some(block.entry_speed);
        }
    }

    fn forward_pass(&mut self) {
        if self.ring.is_empty() {
            return;
        }
        let acceleration = self.constraints.acceleration;
        let head = self.ring.head_index();
        let tail = self.ring.tail_index();
        let mut previous = tail;
        let mut index = BlockRing::<N>::next_index(tail);

        while index != head {
            let limit = if previous == tail && self.busy {
                Some(self.busy_exit_speed)
            } else {
                let prev = self.ring.slot(previous);
                if !prev.nominal_length_flag && prev.entry_speed < self.ring.slot(index).entry_speed {
                    Some(max_allowable_speed(-acceleration, prev.entry_speed, prev.millimeters))
                } else {
                    None
                }
            };

            if let Some(limit) = limit {
                let block = self.ring.slot_mut(index);
                if limit < block.entry_speed {
                    block.entry_speed = limit;
                    block.recalculate_flag = true;
                }
            }

            previous = index;
            index = BlockRing::<N>::next_index(index);
        }
    }

    fn recalculate_trapezoids(&mut self) {
        if self.ring.is_empty() {
            return;
        }
        let head = self.ring.head_index();
        let tail = self.ring.tail_index();
        let mut index = tail;

        loop {
            let next = BlockRing::<N>::next_index(index);
            let frozen = index == tail && self.busy;

            let exit_speed = if next == head {
                Some(MINIMUM_PLANNER_SPEED)
            } else {
                let following = self.ring.slot(next);
                let block = self.ring.slot(index);
                if block.recalculate_flag || following.recalculate_flag {
                    Some(following.entry_speed)
                } else {
                    None
                }
            };

            if let Some(exit_speed) = exit_speed.filter(|_| !frozen) {
                let block = self.ring.slot_mut(index);
                let entry_factor = block.entry_speed / block.nominal_speed;
                let exit_factor = exit_speed / block.nominal_speed;
                calculate_trapezoid(block, entry_factor, exit_factor);
                block.recalculate_flag = false;
            }

            if next == head {
                break;
            }
            index = next;
        }
    }
}

impl<const N: usize, const W: usize> BlockSource for Planner<N, W> {
    fn current_block(&mut self) -> Option<&MotionBlock> {
        if self.ring.is_empty() {
            return None;
        }
        if !self.busy {
            let next = BlockRing::<N>::next_index(self.ring.tail_index());
            self.busy_exit_speed = if next == self.ring.head_index() {
                MINIMUM_PLANNER_SPEED
            } else {
                self.ring.slot(next).entry_speed
            };
            self.busy = true;
        }
        self.ring.tail()
    }

    fn current_sequence(&self) -> Option<u32> {
        self.ring.tail().map(|block| block.sequence)
    }

    fn discard_current_block(&mut self) {
        self.ring.pop();
        self.busy = false;
    }

    fn abort(&mut self) {
        warn!("motion aborted, flushing {} blocks", self.ring.len());
        self.clear_buffer();
    }

    fn bitmap_width(&self) -> u32 {
        self.bitmap.width()
    }

    fn bitmap_bit(&self, index: u32) -> bool {
        self.bitmap.bit(index)
    }

    fn record_step(&mut self, axis: Axis, negative: bool) {
        self.position.record_step(axis, negative);
    }
}

/// Operations that are only valid while no motion is queued.
///
/// Obtained from [`Planner::idle`]; holding it borrows the planner, so no
/// block can be queued while it exists.
#[derive(Debug)]
pub struct IdlePlanner<'a, const N: usize, const W: usize> {
    planner: &'a mut Planner<N, W>,
}

impl<'a, const N: usize, const W: usize> IdlePlanner<'a, N, W> {
    /// Declare the machine to be at `(x, y, z)` in work coordinates without
    /// moving. The E axis keeps its position.
    pub fn set_current_position(&mut self, x: f32, y: f32, z: f32) {
        let e = self.planner.position.actual().e;
        self.planner.position.set_absolute(&Target::new(x, y, z, e));
        self.planner.previous_nominal_speed = 0.0;
        info!("position set");
    }

    /// Move the work origin to the given machine coordinate.
    pub fn set_origin(&mut self, origin: &Target) {
        self.planner.position.set_origin(origin);
    }

    /// Turn acceleration planning on or off. When off, blocks run at their
    /// nominal rate from the first to the last step.
    pub fn set_acceleration_enabled(&mut self, enabled: bool) {
        self.planner.acceleration_enabled = enabled;
        debug!("acceleration enabled: {}", enabled);
    }

    /// Replace the bitmap used by subsequent bitmap lines.
    pub fn load_bitmap<const OTHER: usize>(&mut self, bitmap: &BitmapBuffer<OTHER>) {
        self.planner.bitmap.copy_from(bitmap);
        debug!("bitmap loaded: {} pixels", bitmap.width());
    }

    /// The underlying planner.
    #[inline]
    pub fn planner(&self) -> &Planner<N, W> {
        self.planner
    }
}
