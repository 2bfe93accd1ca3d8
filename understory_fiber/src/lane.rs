// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Priority lanes and the per-lane registry of pending roots.

use alloc::vec::Vec;

use crate::element::Element;

/// Priority class of a render request.
///
/// Lanes are totally ordered: `Immediate > Transition > Idle`.
/// The derived [`Ord`] follows that order, so `lane >= other` reads as
/// "at least as urgent as".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Lane {
    /// Background work that runs only when nothing else is pending.
    Idle,
    /// Non-urgent UI transitions (large list rebuilds and the like).
    Transition,
    /// Direct responses to user input.
    Immediate,
}

impl Lane {
    /// Every lane, most urgent first.
    pub const ALL: [Self; 3] = [Self::Immediate, Self::Transition, Self::Idle];

    const fn slot(self) -> usize {
        match self {
            Self::Immediate => 0,
            Self::Transition => 1,
            Self::Idle => 2,
        }
    }
}

/// A requested render of the whole root, not yet adopted by the work loop.
///
/// `children` is the root's new child list, or `None` to keep whatever the
/// committed tree currently renders (state updates only need a re-walk).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PendingRoot {
    /// Replacement children for the root, if any.
    pub children: Option<Vec<Element>>,
    /// Number of requests merged into this root.
    pub requests: u32,
}

impl PendingRoot {
    /// A request to render `children` under the root container.
    pub fn render(children: Vec<Element>) -> Self {
        Self {
            children: Some(children),
            requests: 1,
        }
    }

    /// A request to re-walk the committed tree, keeping its children.
    pub fn inherit() -> Self {
        Self {
            children: None,
            requests: 1,
        }
    }

    /// Fold a later request into this one.
    ///
    /// Later children win; an inheriting request never clears children submitted before it.
    /// Queued state actions live in their hook slots and are untouched by merging.
    pub fn merge(&mut self, later: Self) {
        if later.children.is_some() {
            self.children = later.children;
        }
        self.requests = self.requests.saturating_add(later.requests);
    }
}

/// At most one [`PendingRoot`] per [`Lane`].
#[derive(Clone, Debug, Default)]
pub struct LaneRegistry {
    slots: [Option<PendingRoot>; 3],
}

impl LaneRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `root` in `lane`, merging it into a root already waiting there.
    ///
    /// Returns `true` if a merge happened.
    pub fn submit(&mut self, lane: Lane, root: PendingRoot) -> bool {
        let slot = &mut self.slots[lane.slot()];
        if let Some(pending) = slot {
            pending.merge(root);
            tracing::debug!(?lane, requests = pending.requests, "merged pending root");
            true
        } else {
            *slot = Some(root);
            false
        }
    }

    /// The most urgent lane holding a pending root.
    pub fn select_next_lane(&self) -> Option<Lane> {
        Lane::ALL
            .into_iter()
            .find(|lane| self.slots[lane.slot()].is_some())
    }

    /// Adopt the pending root of `lane`, clearing the slot.
    ///
    /// A request submitted after this call starts a fresh pending root.
    pub fn take(&mut self, lane: Lane) -> Option<PendingRoot> {
        self.slots[lane.slot()].take()
    }

    /// The pending root of `lane`, if any.
    pub fn get(&self, lane: Lane) -> Option<&PendingRoot> {
        self.slots[lane.slot()].as_ref()
    }

    /// Returns true if any lane holds a pending root.
    pub fn has_pending(&self) -> bool {
        self.slots.iter().any(Option::is_some)
    }

    /// Drop every pending root.
    pub fn clear(&mut self) {
        self.slots = Default::default();
    }
}
