// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_scheduler --heading-base-level=0

//! Understory Scheduler: a cooperative, time-sliced FIFO task queue.
//!
//! ## Overview
//!
//! The scheduler holds queued tasks and runs them back-to-back when the host asks for a
//! flush. A flush stops when the queue is empty or when a small time budget (the time
//! slice) has been used up. Control then returns to the host loop; if tasks remain, the
//! scheduler keeps a flush requested so the host knows to come back.
//!
//! - Tasks run in FIFO order.
//! - A task is never interrupted once started (cooperative, non-preemptive).
//! - At least one task runs per flush, so progress is guaranteed even with a zero budget.
//! - With an empty queue the scheduler is idle and [`Scheduler::needs_flush`] is `false`.
//!
//! ## Time
//!
//! The scheduler does not own a timer. The host supplies a [`Clock`] to every flush.
//! Time is measured in abstract units; [`SchedulerConfig::time_slice`] uses the same units.
//! [`ManualClock`] gives deterministic time for tests, and `StdClock` (feature `std`)
//! reads a monotonic wall clock in milliseconds. Any `Fn() -> u64` closure is also a clock.
//!
//! ## Tasks
//!
//! The task type is generic. Hosts that want plain zero-argument callbacks use
//! [`LocalTask`] and [`Scheduler::flush`]. Engines that need their own state while a
//! task runs queue a small task enum and drive it with [`Scheduler::flush_with`] or
//! [`Scheduler::try_flush_with`], which hand the scheduler back to the runner so tasks
//! can enqueue follow-up work.
//!
//! ## Minimal example
//!
//! ```
//! use core::cell::RefCell;
//! use understory_scheduler::{Flush, LocalTask, ManualClock, Scheduler};
//!
//! let log = std::rc::Rc::new(RefCell::new(Vec::new()));
//! let mut scheduler: Scheduler<LocalTask> = Scheduler::new();
//! for i in 0..3 {
//!     let log = log.clone();
//!     scheduler.schedule(Box::new(move || log.borrow_mut().push(i)));
//! }
//!
//! let clock = ManualClock::new();
//! assert_eq!(scheduler.flush(&clock), Flush::Idle);
//! assert_eq!(*log.borrow(), vec![0, 1, 2]);
//! assert!(!scheduler.needs_flush());
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

mod clock;
mod scheduler;

pub use clock::{Clock, ManualClock};
#[cfg(feature = "std")]
pub use clock::StdClock;
pub use scheduler::{Flush, LocalTask, Scheduler, SchedulerConfig};
