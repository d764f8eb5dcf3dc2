//! Planner shared between the foreground and the step interrupt.
//!
//! The foreground queues blocks through [`SharedPlanner::lock`]; the
//! interrupt runs [`SharedPlanner::tick`]. Both take a critical section, so
//! neither sees the other's partial updates. A [`TickGuard`] turns a nested
//! tick into a no-op instead of a double borrow.

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};

use critical_section::Mutex;

use crate::planner::{Planner, DEFAULT_QUEUE_CAPACITY};
use crate::protocol::DEFAULT_BITMAP_WORDS;

use super::generator::StepGenerator;
use super::outputs::StepperOutputs;
use super::timer::{NextTick, StepClock};

/// Non-reentrancy flag for the tick handler.
///
/// Plain load/store only: thumbv6m has no atomic swap. This is not a
/// test-and-set, so two contexts racing into [`TickGuard::try_enter`] could
/// both pass. It only rejects a tick nested inside a running tick on the
/// same core. Exclusive planner access comes from the critical section in
/// [`SharedPlanner::lock`], not from this guard.
#[derive(Debug, Default)]
pub struct TickGuard {
    busy: AtomicBool,
}

/// Proof that the tick handler is running. Clears the guard when dropped.
#[derive(Debug)]
pub struct TickToken<'a> {
    guard: &'a TickGuard,
}

impl TickGuard {
    /// Create a released guard.
    pub const fn new() -> Self {
        Self {
            busy: AtomicBool::new(false),
        }
    }

    /// Enter the handler, or `None` if it is already running.
    pub fn try_enter(&self) -> Option<TickToken<'_>> {
        if self.busy.load(Ordering::Acquire) {
            return None;
        }
        self.busy.store(true, Ordering::Release);
        Some(TickToken { guard: self })
    }

    /// A tick is in progress.
    #[inline]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for TickToken<'_> {
    fn drop(&mut self) {
        self.guard.busy.store(false, Ordering::Release);
    }
}

/// A [`Planner`] behind a critical-section mutex.
pub struct SharedPlanner<const N: usize = DEFAULT_QUEUE_CAPACITY, const W: usize = DEFAULT_BITMAP_WORDS> {
    planner: Mutex<RefCell<Planner<N, W>>>,
    guard: TickGuard,
}

impl<const N: usize, const W: usize> SharedPlanner<N, W> {
    /// Wrap a planner.
    pub fn new(planner: Planner<N, W>) -> Self {
        Self {
            planner: Mutex::new(RefCell::new(planner)),
            guard: TickGuard::new(),
        }
    }

    /// Run `f` with exclusive access to the planner.
    ///
    /// Keep `f` short: the step interrupt is held off while it runs.
    pub fn lock<R>(&self, f: impl FnOnce(&mut Planner<N, W>) -> R) -> R {
        critical_section::with(|cs| {
            let mut planner = self.planner.borrow_ref_mut(cs);
            f(&mut planner)
        })
    }

    /// Run one tick of `generator` against the planner.
    ///
    /// Returns `None` without touching anything when called from inside a
    /// running tick.
    pub fn tick<O: StepperOutputs>(&self, generator: &mut StepGenerator<O>) -> Option<NextTick> {
        let _token = self.guard.try_enter()?;
        Some(self.lock(|planner| generator.on_tick(planner)))
    }

    /// Reentrancy guard of the tick handler.
    #[inline]
    pub fn guard(&self) -> &TickGuard {
        &self.guard
    }

    /// Bind a generator to this planner as a [`StepClock`].
    pub fn ticker<'a, O: StepperOutputs>(
        &'a self,
        generator: &'a mut StepGenerator<O>,
    ) -> Ticker<'a, O, N, W> {
        Ticker {
            shared: self,
            generator,
        }
    }

    /// Unwrap the planner.
    pub fn into_inner(self) -> Planner<N, W> {
        self.planner.into_inner().into_inner()
    }
}

impl<const N: usize, const W: usize> core::fmt::Debug for SharedPlanner<N, W> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SharedPlanner")
            .field("guard", &self.guard)
            .finish_non_exhaustive()
    }
}

/// [`StepClock`] driving a [`StepGenerator`] from a [`SharedPlanner`].
#[derive(Debug)]
pub struct Ticker<'a, O: StepperOutputs, const N: usize, const W: usize> {
    shared: &'a SharedPlanner<N, W>,
    generator: &'a mut StepGenerator<O>,
}

impl<'a, O: StepperOutputs, const N: usize, const W: usize> Ticker<'a, O, N, W> {
    /// The generator being driven.
    #[inline]
    pub fn generator(&self) -> &StepGenerator<O> {
        self.generator
    }
}

impl<'a, O: StepperOutputs, const N: usize, const W: usize> StepClock for Ticker<'a, O, N, W> {
    fn on_tick(&mut self) -> NextTick {
        // A nested tick leaves the running one in charge of the timer
        self.shared.tick(self.generator).unwrap_or(NextTick::Continue)
    }
}
