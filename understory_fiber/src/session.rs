// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The shared render session: lane registry plus the ambient lane.

use alloc::rc::Rc;
use core::cell::{Cell, RefCell};

use crate::lane::{Lane, LaneRegistry, PendingRoot};

#[derive(Debug)]
struct SessionState {
    registry: RefCell<LaneRegistry>,
    active_lane: Cell<Lane>,
}

/// Handle to the render session of one [`Root`](crate::Root).
///
/// The session is the only piece of render state reachable from outside the work loop:
/// state setters, transitions and host callbacks hold a clone of it so they can submit
/// pending roots. Clones share the same registry.
///
/// Borrows of the registry are never held across user code, so a session may be used
/// from inside effects, callbacks, and component renders.
#[derive(Clone, Debug)]
pub struct Session(Rc<SessionState>);

impl Session {
    /// A fresh session whose ambient lane is `default_lane`.
    pub fn new(default_lane: Lane) -> Self {
        Self(Rc::new(SessionState {
            registry: RefCell::new(LaneRegistry::new()),
            active_lane: Cell::new(default_lane),
        }))
    }

    /// The lane that state updates are currently tagged with.
    pub fn active_lane(&self) -> Lane {
        self.0.active_lane.get()
    }

    /// Run `f` with the ambient lane set to `lane`, restoring the previous lane afterwards.
    ///
    /// Scopes nest; the innermost one wins. The previous lane is restored even if `f` panics.
    pub fn run_under_lane<R>(&self, lane: Lane, f: impl FnOnce() -> R) -> R {
        struct Restore<'a> {
            cell: &'a Cell<Lane>,
            previous: Lane,
        }
        impl Drop for Restore<'_> {
            fn drop(&mut self) {
                self.cell.set(self.previous);
            }
        }

        let cell = &self.0.active_lane;
        let _restore = Restore {
            cell,
            previous: cell.replace(lane),
        };
        f()
    }

    /// Submit a pending root to `lane`.
    pub fn submit(&self, lane: Lane, root: PendingRoot) {
        self.0.registry.borrow_mut().submit(lane, root);
    }

    /// Request a re-walk of the committed tree under `lane`.
    pub fn request_update(&self, lane: Lane) {
        self.submit(lane, PendingRoot::inherit());
    }

    /// Returns true if any lane has a pending root.
    pub fn has_pending(&self) -> bool {
        self.0.registry.borrow().has_pending()
    }

    /// The most urgent lane with pending work.
    pub fn next_lane(&self) -> Option<Lane> {
        self.0.registry.borrow().select_next_lane()
    }

    pub(crate) fn adopt(&self, lane: Lane) -> Option<PendingRoot> {
        self.0.registry.borrow_mut().take(lane)
    }

    /// Returns true if both handles refer to the same session.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
