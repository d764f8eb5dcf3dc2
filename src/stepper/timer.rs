//! Scheduling contract between the step interrupt and its hardware timer.
//!
//! The timer is one-shot and self-rearming: each tick computes the period
//! until the next one. [`service`] applies that result to a [`StepTimer`].

/// What the timer should do after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NextTick {
    /// Fire again after the same period as before.
    Continue,
    /// Fire again after this many timer ticks.
    Period(u32),
    /// Nothing left to execute; stop the timer.
    Idle,
}

/// Hardware one-shot timer driving the step interrupt.
pub trait StepTimer {
    /// Program the period until the next interrupt, in timer ticks.
    fn schedule(&mut self, ticks: u32);

    /// Stop firing until scheduled again.
    fn stop(&mut self);
}

/// Source of step ticks.
pub trait StepClock {
    /// Run one tick and report when the next one is due.
    fn on_tick(&mut self) -> NextTick;
}

/// Run one tick of `clock` and reprogram `timer` accordingly.
///
/// The timer is only touched when the period changes or motion stops.
pub fn service<C, T>(clock: &mut C, timer: &mut T) -> NextTick
where
    C: StepClock + ?Sized,
    T: StepTimer + ?Sized,
{
    let next = clock.on_tick();
    match next {
        NextTick::Continue => {}
        NextTick::Period(ticks) => timer.schedule(ticks),
        NextTick::Idle => timer.stop(),
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingTimer {
        scheduled: heapless::Vec<u32, 8>,
        stopped: bool,
    }

    impl StepTimer for RecordingTimer {
        fn schedule(&mut self, ticks: u32) {
            self.scheduled.push(ticks).ok();
            self.stopped = false;
        }

        fn stop(&mut self) {
            self.stopped = true;
        }
    }

    struct Script {
        ticks: [NextTick; 4],
        index: usize,
    }

    impl StepClock for Script {
        fn on_tick(&mut self) -> NextTick {
            let next = self.ticks[self.index];
            self.index += 1;
            next
        }
    }

    #[test]
    fn test_service_reprograms_only_on_change() {
        let mut clock = Script {
            ticks: [
                NextTick::Period(500),
                NextTick::Continue,
                NextTick::Period(400),
                NextTick::Idle,
            ],
            index: 0,
        };
        let mut timer = RecordingTimer::default();

        for _ in 0..3 {
            service(&mut clock, &mut timer);
        }
        assert_eq!(timer.scheduled.as_slice(), &[500, 400]);
        assert!(!timer.stopped);

        assert_eq!(service(&mut clock, &mut timer), NextTick::Idle);
        assert!(timer.stopped);
    }
}
