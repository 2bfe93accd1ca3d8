// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Time sources for budgeted flushing.

use core::cell::Cell;

/// A monotonic time source supplied by the host.
///
/// Units are up to the host; the scheduler only compares readings against
/// [`SchedulerConfig::time_slice`](crate::SchedulerConfig::time_slice), which must use the
/// same units.
pub trait Clock {
    /// Current reading. Must never decrease.
    fn now(&self) -> u64;
}

impl<F: Fn() -> u64> Clock for F {
    #[inline]
    fn now(&self) -> u64 {
        self()
    }
}

/// A clock that only moves when told to.
///
/// Useful for deterministic tests of time slicing: tasks can call
/// [`ManualClock::advance`] to simulate the time they take.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u64>,
}

impl ManualClock {
    /// Create a clock reading `0`.
    pub const fn new() -> Self {
        Self { now: Cell::new(0) }
    }

    /// Move the clock forward by `units`.
    pub fn advance(&self, units: u64) {
        self.now.set(self.now.get().saturating_add(units));
    }

    /// Set the absolute reading; ignored if it would move the clock backwards.
    pub fn set(&self, now: u64) {
        if now > self.now.get() {
            self.now.set(now);
        }
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now(&self) -> u64 {
        self.now.get()
    }
}

/// Wall clock reporting milliseconds since construction.
#[cfg(feature = "std")]
#[derive(Clone, Copy, Debug)]
pub struct StdClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl StdClock {
    /// Create a clock whose zero is "now".
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for StdClock {
    fn now(&self) -> u64 {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "u64 milliseconds outlive any realistic host loop."
        )]
        let ms = self.origin.elapsed().as_millis() as u64;
        ms
    }
}
