//! Tick-decremented holdoff counters.
//!
//! A [`Holdoff`] is armed with a duration and counts down once per system
//! tick. While it is held, whoever armed it owns the shared resource it
//! guards; the kit handler arms its holdoff on every received line so the
//! cloud and sensor tasks keep off the I2C bus while host tooling is active.
//!
//! The counter sits behind a [`critical_section::Mutex`], so the tick
//! interrupt and the main loop can share one `static`:
//!
//! ```rust
//! use cryptoauth_kit::system::holdoff::Holdoff;
//!
//! static KIT_LOCK: Holdoff = Holdoff::new(10);
//!
//! KIT_LOCK.arm(30);
//! assert!(KIT_LOCK.is_held());
//! for _ in 0..3 {
//!     KIT_LOCK.tick();
//! }
//! assert!(!KIT_LOCK.is_held());
//! ```

use core::cell::Cell;

use critical_section::Mutex;

/// Countdown in units of the system tick.
#[derive(Debug)]
pub struct Holdoff {
    period_ms: u32,
    ticks: Mutex<Cell<u32>>,
}

impl Holdoff {
    /// A released holdoff for a tick of `period_ms` milliseconds.
    ///
    /// A zero period is treated as 1 ms.
    pub const fn new(period_ms: u32) -> Self {
        Self {
            period_ms: if period_ms == 0 { 1 } else { period_ms },
            ticks: Mutex::new(Cell::new(0)),
        }
    }

    /// Tick period this holdoff counts in.
    pub const fn period_ms(&self) -> u32 {
        self.period_ms
    }

    /// Hold for `duration_ms`, replacing any remaining count.
    ///
    /// Any non-zero duration holds for at least one tick; zero releases.
    pub fn arm(&self, duration_ms: u32) {
        let ticks = match duration_ms {
            0 => 0,
            ms => (ms / self.period_ms).max(1),
        };
        critical_section::with(|cs| self.ticks.borrow(cs).set(ticks));
    }

    /// Release immediately.
    pub fn release(&self) {
        self.arm(0);
    }

    /// Count down one tick. Called from the periodic tick only.
    pub fn tick(&self) {
        critical_section::with(|cs| {
            let ticks = self.ticks.borrow(cs);
            ticks.set(ticks.get().saturating_sub(1));
        });
    }

    /// Whether the holdoff is still counting.
    pub fn is_held(&self) -> bool {
        self.remaining() > 0
    }

    /// Ticks left before release.
    pub fn remaining(&self) -> u32 {
        critical_section::with(|cs| self.ticks.borrow(cs).get())
    }

    /// Milliseconds left before release.
    pub fn remaining_ms(&self) -> u32 {
        self.remaining().saturating_mul(self.period_ms)
    }
}
