// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! FIFO queue with budgeted flushing.

use alloc::boxed::Box;
use alloc::collections::VecDeque;

use crate::clock::Clock;

/// A boxed zero-argument task, for hosts that schedule plain callbacks.
pub type LocalTask = Box<dyn FnOnce()>;

/// Configuration for the [`Scheduler`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Budget for a single flush, in [`Clock`] units.
    ///
    /// Checked between tasks: once a flush has used at least this much time it yields,
    /// even if tasks remain.
    pub time_slice: u64,
}

impl SchedulerConfig {
    /// The default slice of 5 time units (milliseconds with `StdClock`).
    pub const DEFAULT: Self = Self { time_slice: 5 };

    /// A configuration with the given budget.
    #[must_use]
    pub const fn with_time_slice(time_slice: u64) -> Self {
        Self { time_slice }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Result of one flush.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flush {
    /// The queue drained; nothing is pending.
    Idle,
    /// The budget ran out with tasks still queued; another flush is requested.
    Yielded {
        /// Tasks left in the queue.
        remaining: usize,
    },
}

/// Cooperative FIFO task scheduler.
///
/// ## Usage
///
/// - [`Scheduler::schedule`] appends a task and makes sure a flush is requested.
/// - The host calls one of the flush methods whenever [`Scheduler::needs_flush`] is true,
///   passing its [`Clock`]. Between flushes the host is free to handle input or paint.
///
/// Tasks are executed strictly in submission order and always run to completion;
/// the time budget is only consulted between tasks.
pub struct Scheduler<T> {
    queue: VecDeque<T>,
    config: SchedulerConfig,
    flush_requested: bool,
}

impl<T> core::fmt::Debug for Scheduler<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Scheduler")
            .field("queued", &self.queue.len())
            .field("config", &self.config)
            .field("flush_requested", &self.flush_requested)
            .finish()
    }
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    /// Create an idle scheduler with the default configuration.
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    /// Create an idle scheduler with an explicit configuration.
    pub fn with_config(config: SchedulerConfig) -> Self {
        Self {
            queue: VecDeque::new(),
            config,
            flush_requested: false,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> SchedulerConfig {
        self.config
    }

    /// Append `task` to the queue.
    ///
    /// Returns `true` if this call moved the scheduler from idle to "flush requested";
    /// hosts that arm a platform timer only need to do so then.
    pub fn schedule(&mut self, task: T) -> bool {
        self.queue.push_back(task);
        let newly_requested = !self.flush_requested;
        self.flush_requested = true;
        newly_requested
    }

    /// Number of queued tasks.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns true if no task is queued.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns true if the host should call a flush method.
    pub fn needs_flush(&self) -> bool {
        self.flush_requested
    }

    /// Drop every queued task and go idle.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.flush_requested = false;
    }

    /// Run queued tasks with `run` until the queue drains or the budget is spent.
    ///
    /// The runner receives the scheduler itself so a task can enqueue follow-up work;
    /// follow-ups join the back of the queue and may run in the same flush if budget remains.
    pub fn flush_with<C>(&mut self, clock: &C, mut run: impl FnMut(&mut Self, T)) -> Flush
    where
        C: Clock + ?Sized,
    {
        match self.try_flush_with(clock, |scheduler, task| {
            run(scheduler, task);
            Ok::<(), core::convert::Infallible>(())
        }) {
            Ok(flush) => flush,
            Err(never) => match never {},
        }
    }

    /// Fallible variant of [`Scheduler::flush_with`].
    ///
    /// The first task that returns an error ends the flush. Tasks after it stay queued
    /// and a flush remains requested; the error is returned to the caller.
    pub fn try_flush_with<C, E>(
        &mut self,
        clock: &C,
        mut run: impl FnMut(&mut Self, T) -> Result<(), E>,
    ) -> Result<Flush, E>
    where
        C: Clock + ?Sized,
    {
        self.flush_requested = false;
        let deadline = clock.now().saturating_add(self.config.time_slice);
        let mut ran = 0_usize;
        while let Some(task) = self.queue.pop_front() {
            ran += 1;
            if let Err(err) = run(self, task) {
                self.flush_requested = !self.queue.is_empty();
                tracing::trace!(ran, remaining = self.queue.len(), "flush aborted by task");
                return Err(err);
            }
            if !self.queue.is_empty() && clock.now() >= deadline {
                self.flush_requested = true;
                let remaining = self.queue.len();
                tracing::trace!(ran, remaining, "flush yielded");
                return Ok(Flush::Yielded { remaining });
            }
        }
        // Tasks scheduled by the last runner set the flag again; the queue is empty here.
        self.flush_requested = false;
        tracing::trace!(ran, "flush drained");
        Ok(Flush::Idle)
    }

    /// Flush repeatedly until idle, returning the number of flushes that were needed.
    ///
    /// This gives up the host-loop interleaving, so it is meant for tests and
    /// synchronous hosts.
    pub fn flush_until_idle_with<C>(
        &mut self,
        clock: &C,
        mut run: impl FnMut(&mut Self, T),
    ) -> usize
    where
        C: Clock + ?Sized,
    {
        let mut flushes = 0;
        while self.needs_flush() {
            flushes += 1;
            let _ = self.flush_with(clock, &mut run);
        }
        flushes
    }
}

impl<F: FnOnce()> Scheduler<F> {
    /// Run queued callbacks until the queue drains or the budget is spent.
    pub fn flush<C>(&mut self, clock: &C) -> Flush
    where
        C: Clock + ?Sized,
    {
        self.flush_with(clock, |_, task| task())
    }
}
