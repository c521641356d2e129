//! Cooperative main loop support.
//!
//! Nothing here preempts: the board's tick interrupt calls
//! [`Scheduler::tick`], and the main loop polls the kit handler followed by
//! [`Scheduler::run_bus_tasks`] forever. Tasks that touch the I2C bus are
//! only polled while the kit holdoff is released.

use core::cell::RefCell;

use heapless::Vec;

use super::holdoff::Holdoff;

/// Maximum number of holdoffs a scheduler ticks.
pub const MAX_TIMERS: usize = 8;

/// A unit of work polled from the main loop.
///
/// `poll` must return promptly; long operations are split into states and
/// resumed on the next poll.
pub trait Task {
    /// Run one step.
    fn poll(&mut self);
}

/// A task shared with another task, e.g. fan control also driven by the
/// cloud client.
impl<T: Task + ?Sized> Task for &RefCell<T> {
    fn poll(&mut self) {
        self.borrow_mut().poll();
    }
}

/// Registration failed: the timer table is full.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct TimerTableFull;

/// Tick fan-out and bus arbitration.
#[derive(Debug)]
pub struct Scheduler<'a> {
    kit_lock: &'a Holdoff,
    timers: Vec<&'a Holdoff, MAX_TIMERS>,
}

impl<'a> Scheduler<'a> {
    /// Schedule around `kit_lock`, which is ticked as well.
    pub fn new(kit_lock: &'a Holdoff) -> Self {
        Self {
            kit_lock,
            timers: Vec::new(),
        }
    }

    /// Tick `holdoff` on every system tick.
    pub fn register(&mut self, holdoff: &'a Holdoff) -> Result<(), TimerTableFull> {
        self.timers.push(holdoff).map_err(|_| TimerTableFull)
    }

    /// Count one system tick on every holdoff.
    pub fn tick(&self) {
        self.kit_lock.tick();
        for timer in &self.timers {
            timer.tick();
        }
    }

    /// Whether the kit protocol currently owns the bus.
    pub fn bus_locked(&self) -> bool {
        self.kit_lock.is_held()
    }

    /// Poll each task in order while the kit protocol does not own the bus.
    ///
    /// Returns how many tasks ran.
    pub fn run_bus_tasks(&self, tasks: &mut [&mut dyn Task]) -> usize {
        let total = tasks.len();
        let mut ran = 0;
        for task in tasks.iter_mut() {
            if self.bus_locked() {
                trace!("scheduler: bus held, {} tasks skipped", total - ran);
                break;
            }
            task.poll();
            ran += 1;
        }
        ran
    }
}
