// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The commit phase: deletions, then placements and updates, then the swap and effects.

use alloc::vec::Vec;

use crate::error::Error;
use crate::fiber::{FiberFlags, FiberId, FiberKind};
use crate::host::HostAdapter;
use crate::lane::Lane;
use crate::reconcile::{Reconciler, WorkInProgress};

/// Summary of one committed pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommitReport {
    /// Lane the pass ran at.
    pub lane: Lane,
    /// Fibers tagged Placement.
    pub placements: usize,
    /// Fibers tagged Update.
    pub updates: usize,
    /// Fibers tagged Deletion (roots of removed subtrees).
    pub deletions: usize,
    /// Effects that ran after the commit.
    pub effects: usize,
}

impl CommitReport {
    /// Returns true if the pass tagged nothing.
    pub fn is_empty(&self) -> bool {
        self.placements == 0 && self.updates == 0 && self.deletions == 0
    }
}

impl<H: HostAdapter> Reconciler<H> {
    /// Apply a fully walked work-in-progress tree to the host and make it current.
    pub(crate) fn commit(
        &mut self,
        mut wip: WorkInProgress,
    ) -> Result<CommitReport, Error<H::Error>> {
        if let Err(err) = self.mutate_host(&wip) {
            self.abandon(wip);
            return Err(err);
        }

        let previous = self.current.replace(wip.root);
        let freed = previous.map_or(0, |previous| self.arena.free_subtree(previous));
        let mut next = Some(wip.root);
        while let Some(id) = next {
            let fiber = self.arena.get_mut(id);
            fiber.alternate = None;
            fiber.next_stable = None;
            fiber.flags = FiberFlags::empty();
            next = self.arena.preorder_next(id, wip.root);
        }

        let mut effects = 0;
        for effect in wip.effects.drain(..) {
            if effect.run() {
                effects += 1;
            }
        }

        let report = CommitReport {
            lane: wip.lane,
            placements: wip.placements,
            updates: wip.updates,
            deletions: wip.deletions.len(),
            effects,
        };
        tracing::debug!(
            lane = ?report.lane,
            placements = report.placements,
            updates = report.updates,
            deletions = report.deletions,
            effects = report.effects,
            freed,
            "committed"
        );
        Ok(report)
    }

    fn mutate_host(&mut self, wip: &WorkInProgress) -> Result<(), Error<H::Error>> {
        // Pass 1: deletions. Cleanups in a removed subtree run before anything is attached.
        for &old in &wip.deletions {
            self.unmount_hooks(old);
            // Old fibers keep their parent links until the previous tree is freed.
            let parent = self.host_parent(old);
            self.detach_subtree(&parent, old)?;
        }

        // Pass 2: placements and updates, depth first over the new tree.
        let mut next = Some(wip.root);
        while let Some(id) = next {
            let fiber = self.arena.get(id);
            if let Some(handle) = fiber.handle.clone() {
                if fiber.flags.contains(FiberFlags::PLACEMENT) {
                    let parent = self.host_parent(id);
                    let placed = match self.host_anchor(id) {
                        Some(anchor) => self.host.insert_before(&parent, &handle, &anchor),
                        None => self.host.attach(&parent, &handle),
                    };
                    placed.map_err(Error::commit)?;
                    self.arena.get_mut(id).flags.remove(FiberFlags::PLACEMENT);
                } else if fiber.flags.contains(FiberFlags::UPDATE) {
                    self.apply_update(id, &handle)?;
                }
            }
            next = self.arena.preorder_next(id, wip.root);
        }
        Ok(())
    }

    fn apply_update(&mut self, id: FiberId, handle: &H::Handle) -> Result<(), Error<H::Error>> {
        let fiber = self.arena.get(id);
        let result = match fiber.kind {
            FiberKind::Text => self.host.update_text_handle(handle, fiber.props.text()),
            _ => {
                let Some(alternate) = fiber.alternate else {
                    return Ok(());
                };
                let prev = &self.arena.get(alternate).props;
                self.host.apply_props_diff(handle, prev, &fiber.props)
            }
        };
        result.map_err(Error::commit)
    }

    /// Drop both trees after a commit failed part way through.
    ///
    /// The target no longer matches the committed tree, so none of it can be paired
    /// against again. Every hook in either tree is unmounted, the topmost handles are
    /// detached from the container, handles that were never placed are released, and the
    /// next pass mounts from an empty container.
    fn abandon(&mut self, wip: WorkInProgress) {
        let roots: Vec<FiberId> =
            core::iter::once(wip.root).chain(self.current.take()).collect();
        let mut tops = Vec::new();
        for &root in &roots {
            self.unmount_hooks(root);
            self.top_handles(root, &mut tops);
        }
        for handle in &tops {
            // Pass 1 may already have removed some of these.
            if let Err(err) = self.host.detach(&self.container, handle) {
                tracing::debug!(?handle, %err, "could not detach handle");
            }
        }
        self.release_unattached(wip.root);
        let freed: usize = roots.into_iter().map(|root| self.arena.free_subtree(root)).sum();
        tracing::warn!(lane = ?wip.lane, freed, "commit failed; dropped the committed tree");
    }

    /// Handles directly below `id` in the host tree, looking through handle-less fibers.
    fn top_handles(&self, id: FiberId, out: &mut Vec<H::Handle>) {
        for child in self.arena.children(id) {
            match &self.arena.get(child).handle {
                Some(handle) if !out.contains(handle) => out.push(handle.clone()),
                Some(_) => {}
                None => self.top_handles(child, out),
            }
        }
    }

    /// Run every effect cleanup in the subtree and make its state setters inert.
    fn unmount_hooks(&self, root: FiberId) {
        let mut next = Some(root);
        while let Some(id) = next {
            for slot in &self.arena.get(id).hooks {
                slot.unmount();
            }
            next = self.arena.preorder_next(id, root);
        }
    }

    /// Remove the topmost handles of an old subtree.
    ///
    /// Components own no handle, so their children are searched instead.
    fn detach_subtree(&mut self, parent: &H::Handle, id: FiberId) -> Result<(), Error<H::Error>> {
        if let Some(handle) = self.arena.get(id).handle.clone() {
            return self.host.detach(parent, &handle).map_err(Error::commit);
        }
        let mut child = self.arena.get(id).child;
        while let Some(c) = child {
            self.detach_subtree(parent, c)?;
            child = self.arena.get(c).sibling;
        }
        Ok(())
    }

    /// Handle of the nearest ancestor that owns one.
    ///
    /// Every tree is rooted at a fiber carrying the container handle, so this always succeeds.
    fn host_parent(&self, id: FiberId) -> H::Handle {
        let mut cursor = self.arena.get(id).parent;
        while let Some(parent) = cursor {
            let fiber = self.arena.get(parent);
            if let Some(handle) = &fiber.handle {
                return handle.clone();
            }
            cursor = fiber.parent;
        }
        self.container.clone()
    }

    /// The attached handle a placement must be inserted before, or `None` to append.
    ///
    /// Follows `next_stable` to the first later sibling that was already attached,
    /// climbing out of handle-less parents while they are the last thing in their host parent.
    fn host_anchor(&self, id: FiberId) -> Option<H::Handle> {
        let mut cursor = id;
        loop {
            let mut sibling = self.arena.get(cursor).next_stable;
            while let Some(s) = sibling {
                if let Some(handle) = self.first_stable_handle(s) {
                    return Some(handle);
                }
                sibling = self.arena.get(s).next_stable;
            }
            let parent = self.arena.get(cursor).parent?;
            if self.arena.get(parent).handle.is_some() {
                return None;
            }
            cursor = parent;
        }
    }

    /// First already-attached handle at or below `id`, in tree order.
    fn first_stable_handle(&self, id: FiberId) -> Option<H::Handle> {
        let fiber = self.arena.get(id);
        if fiber.flags.contains(FiberFlags::PLACEMENT) {
            return None;
        }
        if let Some(handle) = &fiber.handle {
            return Some(handle.clone());
        }
        self.arena
            .children(id)
            .find_map(|child| self.first_stable_handle(child))
    }
}
