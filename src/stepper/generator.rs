//! Step generator: executes planned blocks one timer tick at a time.
//!
//! Each tick emits at most one step event. Axes are interleaved with a
//! Bresenham accumulator per axis against the block's dominant step count,
//! and the delay until the next tick comes from the block's [`Ramp`].

use crate::config::{Axis, LaserConfig, MachineConfig, AXES};
use crate::planner::{BlockSource, MotionBlock, RampPhase};

use super::outputs::StepperOutputs;
use super::ramp::Ramp;
use super::timer::NextTick;

/// Execution state of the block being stepped.
#[derive(Debug, Clone, Copy)]
struct ActiveBlock {
    block: MotionBlock,
    ramp: Ramp,
    counters: [i32; AXES],
    completed: u32,
    bitmap_width: u32,
    bitmap_counter: u32,
    bitmap_index: u32,
}

impl ActiveBlock {
    fn new(block: MotionBlock, timer_hz: u32, bitmap_width: u32) -> Self {
        let start = -((block.step_event_count / 2) as i32);
        Self {
            ramp: Ramp::new(&block, timer_hz),
            counters: [start; AXES],
            completed: 0,
            bitmap_width,
            bitmap_counter: 0,
            bitmap_index: 0,
            block,
        }
    }

    /// Pixel for this step event, then advance the resampler.
    ///
    /// Spreads `bitmap_width` pixels over `step_event_count` events, so each
    /// pixel covers `step_event_count / bitmap_width` consecutive events.
    fn next_pixel<S: BlockSource + ?Sized>(&mut self, source: &S) -> bool {
        let pixel = source.bitmap_bit(self.bitmap_index);
        let events = self.block.step_event_count;
        self.bitmap_counter = self.bitmap_counter.saturating_add(self.bitmap_width);
        while self.bitmap_counter >= events {
            self.bitmap_counter -= events;
            self.bitmap_index = self.bitmap_index.saturating_add(1);
        }
        pixel
    }
}

/// Executes blocks from a [`BlockSource`] against [`StepperOutputs`].
///
/// Call [`StepGenerator::on_tick`] from the step timer interrupt and apply the
/// returned [`NextTick`] to the timer. Once it returns [`NextTick::Idle`] the
/// timer stays stopped until the foreground queues motion and fires a tick.
#[derive(Debug)]
pub struct StepGenerator<O: StepperOutputs> {
    outputs: O,
    laser: LaserConfig,
    timer_hz: u32,
    active: Option<ActiveBlock>,
    /// Last period handed to the timer; 0 while idle.
    period: u32,
    laser_on: bool,
    laser_duty: u16,
    steps_emitted: u32,
    endstop_aborts: u32,
}

impl<O: StepperOutputs> StepGenerator<O> {
    /// Create an idle generator.
    pub fn new(outputs: O, config: &MachineConfig) -> Self {
        Self {
            outputs,
            laser: config.laser.clone(),
            timer_hz: config.step_timer_hz,
            active: None,
            period: 0,
            laser_on: false,
            laser_duty: 0,
            steps_emitted: 0,
            endstop_aborts: 0,
        }
    }

    /// Run one step event.
    ///
    /// Every step line raised during the tick is lowered before returning.
    pub fn on_tick<S: BlockSource + ?Sized>(&mut self, source: &mut S) -> NextTick {
        let next = self.tick(source);
        self.outputs.clear_steps();
        next
    }

    fn tick<S: BlockSource + ?Sized>(&mut self, source: &mut S) -> NextTick {
        // The queue was flushed or replaced under us
        if let Some(active) = &self.active {
            if source.current_sequence() != Some(active.block.sequence) {
                debug!("block {} no longer queued", active.block.sequence);
                self.active = None;
            }
        }

        let mut active = match self.active.take() {
            Some(active) => active,
            None => match source.current_block().copied() {
                Some(block) => self.start_block(block, source.bitmap_width()),
                None => {
                    self.go_idle();
                    return NextTick::Idle;
                }
            },
        };

        let block = active.block;
        if block.step_event_count == 0 {
            source.discard_current_block();
            return NextTick::Continue;
        }

        let laser = if block.is_bitmap() {
            active.next_pixel(source)
        } else {
            block.laser_on()
        };
        self.set_laser(laser);

        let events = block.step_event_count as i32;
        for axis in Axis::ALL {
            let i = axis.index();
            active.counters[i] += block.steps[i] as i32;
            if active.counters[i] > 0 {
                active.counters[i] -= events;
                self.outputs.step(axis);
                source.record_step(axis, block.is_negative(axis));
                self.steps_emitted = self.steps_emitted.wrapping_add(1);
            }
        }
        active.completed += 1;

        if block.check_endstops() && self.endstop_hit(&block) {
            warn!(
                "endstop hit after {} of {} step events",
                active.completed,
                block.step_event_count
            );
            self.endstop_aborts = self.endstop_aborts.wrapping_add(1);
            source.abort();
            self.go_idle();
            return NextTick::Idle;
        }

        if active.completed >= block.step_event_count {
            source.discard_current_block();
            return NextTick::Continue;
        }

        active.ramp.advance(&block, active.completed);
        let ticks = active.ramp.delay().ticks();
        self.active = Some(active);
        if ticks != self.period {
            self.period = ticks;
            NextTick::Period(ticks)
        } else {
            NextTick::Continue
        }
    }

    fn start_block(&mut self, block: MotionBlock, bitmap_width: u32) -> ActiveBlock {
        for axis in Axis::ALL {
            if block.steps[axis.index()] > 0 {
                self.outputs.set_direction(axis, block.is_negative(axis));
            }
        }
        if block.laser_on() {
            let duty = self.laser.duty_for_power(block.power);
            if duty != self.laser_duty {
                self.laser_duty = duty;
                self.outputs.set_laser_duty(duty);
            }
        }
        trace!("starting block {}", block.sequence);
        ActiveBlock::new(block, self.timer_hz, bitmap_width)
    }

    fn endstop_hit(&mut self, block: &MotionBlock) -> bool {
        Axis::ALL
            .iter()
            .filter(|axis| block.steps[axis.index()] > 0)
            .any(|&axis| self.outputs.endstop_triggered(axis))
    }

    fn set_laser(&mut self, on: bool) {
        if on != self.laser_on {
            self.laser_on = on;
            self.outputs.set_laser(on);
        }
    }

    fn go_idle(&mut self) {
        self.active = None;
        self.period = 0;
        self.set_laser(false);
        if self.laser_duty != 0 {
            self.laser_duty = 0;
            self.outputs.set_laser_duty(0);
        }
    }

    /// No block is being executed.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.active.is_none()
    }

    /// Sequence id of the block being executed.
    #[inline]
    pub fn current_sequence(&self) -> Option<u32> {
        self.active.map(|active| active.block.sequence)
    }

    /// Ramp phase of the block being executed.
    #[inline]
    pub fn phase(&self) -> Option<RampPhase> {
        self.active.map(|active| active.ramp.phase())
    }

    /// Step pulses emitted since creation, all axes, wrapping.
    #[inline]
    pub fn steps_emitted(&self) -> u32 {
        self.steps_emitted
    }

    /// Blocks cut short by an endstop.
    #[inline]
    pub fn endstop_aborts(&self) -> u32 {
        self.endstop_aborts
    }

    /// The output bank.
    #[inline]
    pub fn outputs(&self) -> &O {
        &self.outputs
    }

    /// Mutable access to the output bank.
    #[inline]
    pub fn outputs_mut(&mut self) -> &mut O {
        &mut self.outputs
    }

    /// Give back the output bank.
    pub fn release(self) -> O {
        self.outputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::units::{MmPerMin, MmPerSecSquared};
    use crate::planner::{ActionKind, Planner, Target};
    use crate::protocol::BitmapBuffer;

    /// Records what the generator drove.
    #[derive(Debug, Default)]
    struct FakeOutputs {
        steps: [u32; AXES],
        negative: [bool; AXES],
        raised: bool,
        laser: bool,
        duty: u16,
        endstop_after: Option<u32>,
        endstop_reads: u32,
    }

    impl StepperOutputs for FakeOutputs {
        fn set_direction(&mut self, axis: Axis, negative: bool) {
            self.negative[axis.index()] = negative;
        }

        fn step(&mut self, axis: Axis) {
            assert!(!self.raised || axis != Axis::X, "step line not cleared");
            self.steps[axis.index()] += 1;
            self.raised = true;
        }

        fn clear_steps(&mut self) {
            self.raised = false;
        }

        fn set_laser(&mut self, on: bool) {
            self.laser = on;
        }

        fn set_laser_duty(&mut self, duty: u16) {
            self.duty = duty;
        }

        fn endstop_triggered(&mut self, _axis: Axis) -> bool {
            self.endstop_reads += 1;
            matches!(self.endstop_after, Some(after) if self.endstop_reads > after)
        }
    }

    fn config() -> MachineConfig {
        MachineConfig::uniform(10.0, MmPerMin(6000.0), MmPerSecSquared(500.0))
    }

    fn run(generator: &mut StepGenerator<FakeOutputs>, planner: &mut Planner<16, 4>) -> u32 {
        let mut ticks = 0;
        while generator.on_tick(planner) != NextTick::Idle {
            ticks += 1;
            assert!(ticks < 1_000_000, "generator never went idle");
        }
        ticks
    }

    #[test]
    fn test_bresenham_exact_counts() {
        let mut planner: Planner<16, 4> = Planner::new(&config());
        let mut generator = StepGenerator::new(FakeOutputs::default(), &config());
        planner
            .enqueue(&Target::new(10.0, -3.7, 0.0, 0.0), MmPerMin(3000.0), ActionKind::Move, 0)
            .unwrap();

        run(&mut generator, &mut planner);

        let outputs = generator.outputs();
        assert_eq!(outputs.steps, [100, 37, 0, 0]);
        assert_eq!(outputs.negative, [false, true, false, false]);
        assert_eq!(generator.steps_emitted(), 137);
        assert!(planner.queue_empty());
        assert_eq!(planner.position().actual_steps()[0].value(), 100);
        assert_eq!(planner.position().actual_steps()[1].value(), -37);
        assert!(generator.is_idle());
    }

    #[test]
    fn test_bitmap_resampled_along_line() {
        let mut planner: Planner<16, 4> = Planner::new(&config());
        let mut bitmap: BitmapBuffer<4> = BitmapBuffer::new();
        bitmap.begin(1, 4).unwrap();
        bitmap.push_word(0xB000_0000);
        planner.idle().unwrap().load_bitmap(&bitmap);

        let mut generator = StepGenerator::new(FakeOutputs::default(), &config());
        planner
            .enqueue(&Target::new(0.8, 0.0, 0.0, 0.0), MmPerMin(600.0), ActionKind::BitmapLine, 10_000)
            .unwrap();

        // Width 4 over 8 step events: every pixel lasts two events
        let mut trace: heapless::Vec<bool, 16> = heapless::Vec::new();
        while generator.on_tick(&mut planner) != NextTick::Idle {
            trace.push(generator.outputs().laser).unwrap();
        }
        assert_eq!(trace.as_slice(), &[true, true, false, false, true, true, true, true]);
        assert!(!generator.outputs().laser);
        assert_eq!(generator.outputs().duty, 0);
    }

    #[test]
    fn test_laser_line_sets_duty() {
        let mut config = config();
        config.laser.pwm_min = 1000;
        config.laser.pwm_max = 9000;
        let mut planner: Planner<16, 4> = Planner::new(&config);
        let mut generator = StepGenerator::new(FakeOutputs::default(), &config);
        planner
            .enqueue(&Target::new(1.0, 0.0, 0.0, 0.0), MmPerMin(600.0), ActionKind::LaserLine, 5_000)
            .unwrap();

        generator.on_tick(&mut planner);
        assert!(generator.outputs().laser);
        assert_eq!(generator.outputs().duty, 5000);

        run(&mut generator, &mut planner);
        assert!(!generator.outputs().laser);
    }

    #[test]
    fn test_endstop_aborts_and_flushes() {
        let mut planner: Planner<16, 4> = Planner::new(&config());
        let outputs = FakeOutputs {
            endstop_after: Some(5),
            ..FakeOutputs::default()
        };
        let mut generator = StepGenerator::new(outputs, &config());
        planner
            .enqueue(&Target::new(-50.0, 0.0, 0.0, 0.0), MmPerMin(600.0), ActionKind::MoveToEndstop, 0)
            .unwrap();
        planner
            .enqueue(&Target::new(-50.0, 10.0, 0.0, 0.0), MmPerMin(600.0), ActionKind::Move, 0)
            .unwrap();

        run(&mut generator, &mut planner);

        assert_eq!(generator.endstop_aborts(), 1);
        assert_eq!(generator.outputs().steps[0], 6);
        assert!(planner.queue_empty());
        assert_eq!(planner.position().actual_steps()[0].value(), -6);
        // Planned position resynced to where the machine stopped
        assert_eq!(planner.position().planned_steps()[0].value(), -6);
    }

    #[test]
    fn test_flush_mid_block_is_detected() {
        let mut planner: Planner<16, 4> = Planner::new(&config());
        let mut generator = StepGenerator::new(FakeOutputs::default(), &config());
        planner
            .enqueue(&Target::new(10.0, 0.0, 0.0, 0.0), MmPerMin(600.0), ActionKind::Move, 0)
            .unwrap();

        for _ in 0..10 {
            generator.on_tick(&mut planner);
        }
        assert_eq!(generator.current_sequence(), Some(0));
        planner.clear_buffer();

        assert_eq!(generator.on_tick(&mut planner), NextTick::Idle);
        assert!(generator.is_idle());
        assert_eq!(generator.outputs().steps[0], 10);
    }

    #[test]
    fn test_timer_rearmed_only_on_change() {
        let mut planner: Planner<16, 4> = Planner::new(&config());
        planner.idle().unwrap().set_acceleration_enabled(false);
        let mut generator = StepGenerator::new(FakeOutputs::default(), &config());
        planner
            .enqueue(&Target::new(5.0, 0.0, 0.0, 0.0), MmPerMin(600.0), ActionKind::Move, 0)
            .unwrap();

        // 50 steps at 6000 steps/min on a 1 MHz timer
        let mut periods: heapless::Vec<u32, 4> = heapless::Vec::new();
        let mut continues = 0;
        loop {
            match generator.on_tick(&mut planner) {
                NextTick::Period(ticks) => periods.push(ticks).unwrap(),
                NextTick::Continue => continues += 1,
                NextTick::Idle => break,
            }
        }
        assert_eq!(periods.as_slice(), &[10_000]);
        assert_eq!(continues, 49);
        assert_eq!(generator.outputs().steps[0], 50);
    }
}
