// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The render phase: a depth-first walk over the work-in-progress tree.

use alloc::vec::Vec;

use crate::element::{Element, Props};
use crate::error::Error;
use crate::fiber::{Fiber, FiberArena, FiberFlags, FiberId, FiberKind};
use crate::hooks::{Hooks, PendingEffect};
use crate::host::HostAdapter;
use crate::lane::Lane;
use crate::session::Session;

/// Everything a pass collects before it is committed.
#[derive(Debug)]
pub(crate) struct WorkInProgress {
    pub(crate) root: FiberId,
    pub(crate) lane: Lane,
    pub(crate) deletions: Vec<FiberId>,
    pub(crate) effects: Vec<PendingEffect>,
    pub(crate) placements: usize,
    pub(crate) updates: usize,
}

/// Owns the adapter, the fiber arena, and the current tree.
pub(crate) struct Reconciler<H: HostAdapter> {
    pub(crate) host: H,
    pub(crate) container: H::Handle,
    pub(crate) arena: FiberArena<H::Handle>,
    pub(crate) current: Option<FiberId>,
    pub(crate) session: Session,
}

impl<H: HostAdapter> core::fmt::Debug for Reconciler<H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Reconciler")
            .field("container", &self.container)
            .field("arena", &self.arena)
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

impl<H: HostAdapter> Reconciler<H> {
    pub(crate) fn new(host: H, container: H::Handle, session: Session) -> Self {
        Self {
            host,
            container,
            arena: FiberArena::default(),
            current: None,
            session,
        }
    }

    /// Adopt the pending root of `lane`, walk it to exhaustion, and commit it.
    ///
    /// Returns `Ok(None)` if nothing was pending for `lane`. On a render error the
    /// work-in-progress tree is dropped and the current tree stays in place; on a commit
    /// error both trees are dropped.
    pub(crate) fn perform_work(
        &mut self,
        lane: Lane,
    ) -> Result<Option<crate::CommitReport>, Error<H::Error>> {
        let Some(pending) = self.session.adopt(lane) else {
            return Ok(None);
        };
        tracing::debug!(
            ?lane,
            inherited = pending.children.is_none(),
            requests = pending.requests,
            "adopted pending root"
        );
        let children = match pending.children {
            Some(children) => children,
            None => self
                .current
                .map(|current| self.arena.get(current).props.children().to_vec())
                .unwrap_or_default(),
        };

        let mut root = Fiber::new(FiberKind::Root, None, Props::with_children(children));
        root.handle = Some(self.container.clone());
        root.alternate = self.current;
        let root = self.arena.insert(root);
        let mut wip = WorkInProgress {
            root,
            lane,
            deletions: Vec::new(),
            effects: Vec::new(),
            placements: 0,
            updates: 0,
        };

        // The walk is resumable at every step, but it is not sliced: one task runs it to the end.
        let mut next = Some(root);
        while let Some(id) = next {
            if let Err(err) = self.perform_unit(&mut wip, id) {
                self.discard(wip);
                return Err(err);
            }
            next = self.arena.preorder_next(id, root);
        }

        self.commit(wip).map(Some)
    }

    /// Visit one fiber: render a component or prepare a host node, then diff its children.
    fn perform_unit(
        &mut self,
        wip: &mut WorkInProgress,
        id: FiberId,
    ) -> Result<(), Error<H::Error>> {
        let fiber = self.arena.get(id);
        tracing::trace!(fiber = fiber.kind.label(), "perform unit");
        match fiber.kind.clone() {
            FiberKind::Component(component) => {
                let (mut slots, mounting) = match fiber.alternate {
                    Some(alternate) => (self.arena.get(alternate).hooks.clone(), false),
                    None => (Vec::new(), true),
                };
                let props = fiber.props.clone();
                let child = {
                    let mut hooks = Hooks::new(
                        &mut slots,
                        mounting,
                        wip.lane,
                        &self.session,
                        &mut wip.effects,
                        component.name(),
                    );
                    let child = component.render(&mut hooks, &props);
                    hooks.finish();
                    child
                };
                self.arena.get_mut(id).hooks = slots;
                self.reconcile_children(wip, id, core::slice::from_ref(&child));
            }
            FiberKind::Root => {
                let children = fiber.props.children().to_vec();
                self.reconcile_children(wip, id, &children);
            }
            FiberKind::Host(tag) => {
                if fiber.handle.is_none() {
                    let handle = self.host.create_handle(&tag).map_err(Error::render)?;
                    let props = &self.arena.get(id).props;
                    if !props.is_empty() {
                        let applied = self.host.apply_props_diff(&handle, &Props::default(), props);
                        if let Err(err) = applied {
                            self.release(&handle);
                            return Err(Error::render(err));
                        }
                    }
                    self.arena.get_mut(id).handle = Some(handle);
                }
                let children = self.arena.get(id).props.children().to_vec();
                self.reconcile_children(wip, id, &children);
            }
            FiberKind::Text => {
                if fiber.handle.is_none() {
                    let handle = self
                        .host
                        .create_text_handle(fiber.props.text())
                        .map_err(Error::render)?;
                    self.arena.get_mut(id).handle = Some(handle);
                }
            }
        }
        Ok(())
    }

    /// Pair `elements` with the alternate's children by position and tag the differences.
    fn reconcile_children(
        &mut self,
        wip: &mut WorkInProgress,
        parent: FiberId,
        elements: &[Element],
    ) {
        let mut old = self
            .arena
            .get(parent)
            .alternate
            .and_then(|alternate| self.arena.get(alternate).child);
        let mut created = Vec::with_capacity(elements.len());

        for element in elements {
            let matched = old.filter(|&o| {
                let old_fiber = self.arena.get(o);
                old_fiber.kind.same_type(element.ty())
                    && old_fiber.key.as_ref() == element.key_ref()
            });
            let mut fiber = Fiber::from_element(element);
            fiber.parent = Some(parent);
            match matched {
                Some(o) => {
                    let old_fiber = self.arena.get(o);
                    fiber.handle = old_fiber.handle.clone();
                    fiber.alternate = Some(o);
                    if old_fiber.props.differs_from(&fiber.props) {
                        fiber.flags |= FiberFlags::UPDATE;
                        wip.updates += 1;
                    }
                }
                None => {
                    fiber.flags |= FiberFlags::PLACEMENT;
                    wip.placements += 1;
                    if let Some(o) = old {
                        self.mark_deletion(wip, o);
                    }
                }
            }
            let id = self.arena.insert(fiber);
            match created.last() {
                Some(&previous) => self.arena.get_mut(previous).sibling = Some(id),
                None => self.arena.get_mut(parent).child = Some(id),
            }
            created.push(id);
            old = old.and_then(|o| self.arena.get(o).sibling);
        }

        while let Some(o) = old {
            self.mark_deletion(wip, o);
            old = self.arena.get(o).sibling;
        }

        let mut next_stable = None;
        for &id in created.iter().rev() {
            let fiber = self.arena.get_mut(id);
            fiber.next_stable = next_stable;
            if !fiber.flags.contains(FiberFlags::PLACEMENT) {
                next_stable = Some(id);
            }
        }
    }

    fn mark_deletion(&mut self, wip: &mut WorkInProgress, old: FiberId) {
        self.arena.get_mut(old).flags |= FiberFlags::DELETION;
        wip.deletions.push(old);
    }

    /// Drop an unfinished work-in-progress tree, leaving the current tree untouched.
    ///
    /// Handles created for the tree's new fibers are released.
    pub(crate) fn discard(&mut self, wip: WorkInProgress) {
        self.release_unattached(wip.root);
        let freed = self.arena.free_subtree(wip.root);
        for old in wip.deletions {
            if self.arena.is_alive(old) {
                self.arena.get_mut(old).flags.remove(FiberFlags::DELETION);
            }
        }
        tracing::debug!(lane = ?wip.lane, freed, "discarded work in progress");
    }

    /// Release the handles of fibers under `root` still waiting for their placement.
    pub(crate) fn release_unattached(&mut self, root: FiberId) {
        let mut next = Some(root);
        while let Some(id) = next {
            let fiber = self.arena.get(id);
            let waiting = fiber
                .flags
                .contains(FiberFlags::PLACEMENT)
                .then(|| fiber.handle.clone())
                .flatten();
            if let Some(handle) = waiting {
                self.release(&handle);
            }
            next = self.arena.preorder_next(id, root);
        }
    }

    fn release(&mut self, handle: &H::Handle) {
        if let Err(err) = self.host.release(handle) {
            tracing::debug!(?handle, %err, "could not release handle");
        }
    }
}
