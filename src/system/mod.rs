//! System services shared by every task.
//!
//! # Available Utilities
//!
//! - **[`holdoff`]**: tick-decremented countdowns used for bus ownership and task waits
//! - **[`time`]**: UTC clock trait, software clock and calendar conversion
//! - **[`scheduler`]**: tick fan-out and holdoff-gated polling of bus tasks
//!
//! # Execution Model
//!
//! Execution is single threaded and cooperative. One periodic tick
//! ([`crate::config::TICK_PERIOD_MS`]) counts down every holdoff; the main
//! loop polls each task in a fixed order and never blocks except while
//! waiting out a device execution time or retrying a USB report.
//!
//! ```rust,no_run
//! use cryptoauth_kit::config::TICK_PERIOD_MS;
//! use cryptoauth_kit::system::holdoff::Holdoff;
//! use cryptoauth_kit::system::scheduler::{Scheduler, Task};
//!
//! static KIT_LOCK: Holdoff = Holdoff::new(TICK_PERIOD_MS);
//!
//! struct Blink;
//! impl Task for Blink {
//!     fn poll(&mut self) {}
//! }
//!
//! let scheduler = Scheduler::new(&KIT_LOCK);
//! let mut blink = Blink;
//! loop {
//!     // kit handler runs here
//!     scheduler.run_bus_tasks(&mut [&mut blink]);
//! }
//! ```

pub mod holdoff;
pub mod scheduler;
pub mod time;

pub use holdoff::Holdoff;
pub use scheduler::{Scheduler, Task};
pub use time::{Clock, DateTime, SystemClock};
