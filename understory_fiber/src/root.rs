// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The root: one container, one session, one work loop.

use alloc::vec;
use alloc::vec::Vec;

use understory_scheduler::{Clock, Flush, Scheduler, SchedulerConfig};

use crate::commit::CommitReport;
use crate::element::Element;
use crate::error::Error;
use crate::host::HostAdapter;
use crate::lane::{Lane, PendingRoot};
use crate::reconcile::Reconciler;
use crate::session::Session;

/// Configuration for a [`Root`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RootConfig {
    /// Time slicing of the work loop.
    pub scheduler: SchedulerConfig,
    /// Lane used for updates outside any [`Session::run_under_lane`] scope.
    pub default_lane: Lane,
}

impl RootConfig {
    /// Default slice, updates default to [`Lane::Immediate`].
    pub const DEFAULT: Self = Self {
        scheduler: SchedulerConfig::DEFAULT,
        default_lane: Lane::Immediate,
    };
}

impl Default for RootConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// The only task the root schedules: process the most urgent pending lane.
#[derive(Clone, Copy, Debug)]
struct WorkLoop;

/// A rendering root bound to one container handle of a [`HostAdapter`].
///
/// ## Driving it
///
/// Requests ([`Root::render`], state setters, transitions) only record pending work.
/// The host then calls [`Root::flush`] whenever [`Root::needs_flush`] is true. Each flush
/// runs work-loop tasks until the scheduler's time slice is spent; every task adopts the
/// most urgent pending lane, walks the whole tree for it, and commits. Lanes never share
/// a task, so the host regains control between them.
pub struct Root<H: HostAdapter> {
    reconciler: Reconciler<H>,
    scheduler: Scheduler<WorkLoop>,
    reports: Vec<CommitReport>,
    commits: usize,
    config: RootConfig,
}

impl<H: HostAdapter> core::fmt::Debug for Root<H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Root")
            .field("reconciler", &self.reconciler)
            .field("scheduler", &self.scheduler)
            .field("commits", &self.commits)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<H: HostAdapter> Root<H> {
    /// Create a root rendering into `container` with the default configuration.
    pub fn new(host: H, container: H::Handle) -> Self {
        Self::with_config(host, container, RootConfig::default())
    }

    /// Create a root with an explicit configuration.
    pub fn with_config(host: H, container: H::Handle, config: RootConfig) -> Self {
        let session = Session::new(config.default_lane);
        Self {
            reconciler: Reconciler::new(host, container, session),
            scheduler: Scheduler::with_config(config.scheduler),
            reports: Vec::new(),
            commits: 0,
            config,
        }
    }

    /// A handle to this root's session.
    pub fn session(&self) -> Session {
        self.reconciler.session.clone()
    }

    /// The active configuration.
    pub fn config(&self) -> RootConfig {
        self.config
    }

    /// Request a render of `element` under the session's active lane.
    pub fn render(&mut self, element: impl Into<Element>) {
        let lane = self.reconciler.session.active_lane();
        self.render_with_lane(element, lane);
    }

    /// Request a render of `element` under `lane`.
    pub fn render_with_lane(&mut self, element: impl Into<Element>, lane: Lane) {
        self.submit(lane, PendingRoot::render(vec![element.into()]));
    }

    /// Request removal of everything rendered so far.
    ///
    /// Effect cleanups in the tree run during that commit.
    pub fn unmount(&mut self) {
        let lane = self.reconciler.session.active_lane();
        self.submit(lane, PendingRoot::render(Vec::new()));
    }

    fn submit(&mut self, lane: Lane, root: PendingRoot) {
        self.reconciler.session.submit(lane, root);
        self.ensure_scheduled();
    }

    fn ensure_scheduled(&mut self) {
        if self.scheduler.is_empty() && self.reconciler.session.has_pending() {
            self.scheduler.schedule(WorkLoop);
        }
    }

    /// Returns true if the host should call [`Root::flush`].
    ///
    /// This also covers updates requested through the session since the last flush.
    pub fn needs_flush(&self) -> bool {
        self.scheduler.needs_flush() || self.reconciler.session.has_pending()
    }

    /// Run work-loop tasks until idle or until the time slice is spent.
    ///
    /// A failing pass is dropped (its lane's request is not retried); other pending
    /// lanes stay scheduled. If the adapter failed while committing, the committed tree is
    /// dropped too and the container emptied: the next [`Root::render`] mounts from scratch.
    pub fn flush<C>(&mut self, clock: &C) -> Result<Flush, Error<H::Error>>
    where
        C: Clock + ?Sized,
    {
        self.ensure_scheduled();
        let Self {
            reconciler,
            scheduler,
            reports,
            commits,
            ..
        } = self;
        scheduler.try_flush_with(clock, |scheduler, WorkLoop| {
            let result = match reconciler.session.next_lane() {
                Some(lane) => reconciler.perform_work(lane),
                None => Ok(None),
            };
            // Effects may have requested more work; so may a failed lane's siblings.
            if reconciler.session.has_pending() && scheduler.is_empty() {
                scheduler.schedule(WorkLoop);
            }
            if let Some(report) = result? {
                *commits += 1;
                reports.push(report);
            }
            Ok(())
        })
    }

    /// Flush until nothing is pending, returning the number of flushes.
    ///
    /// Stops at the first error.
    pub fn flush_until_idle<C>(&mut self, clock: &C) -> Result<usize, Error<H::Error>>
    where
        C: Clock + ?Sized,
    {
        let mut flushes = 0;
        while self.needs_flush() {
            flushes += 1;
            self.flush(clock)?;
        }
        Ok(flushes)
    }

    /// The renderer adapter.
    pub fn host(&self) -> &H {
        &self.reconciler.host
    }

    /// The renderer adapter, mutably.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.reconciler.host
    }

    /// The container handle this root renders into.
    pub fn container(&self) -> &H::Handle {
        &self.reconciler.container
    }

    /// Number of successful commits so far.
    pub fn commit_count(&self) -> usize {
        self.commits
    }

    /// Reports of the commits since the last call, oldest first.
    pub fn take_reports(&mut self) -> Vec<CommitReport> {
        core::mem::take(&mut self.reports)
    }

    /// Number of fibers currently alive (the committed tree, between passes).
    pub fn live_fibers(&self) -> usize {
        self.reconciler.arena.len()
    }
}
