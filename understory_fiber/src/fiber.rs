// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fiber arena: work nodes addressed by generational ids.

use alloc::vec::Vec;

use crate::element::{Component, Element, ElementType, Key, Props};
use crate::hooks::HookSlot;

/// Identifier for a fiber in the arena.
///
/// Consists of a slot index and a generation counter.
///
/// - On insert, a fresh slot is allocated with generation `1`.
/// - On free, the slot is released; ids that pointed to it are now stale.
/// - On reuse, the slot's generation is incremented, producing a distinct id.
///
/// Stale ids never alias a live fiber because the generation must match.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct FiberId(u32, u32);

impl FiberId {
    const fn idx(self) -> usize {
        self.0 as usize
    }
}

bitflags::bitflags! {
    /// Effect tags computed during reconciliation and consumed by the commit.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub(crate) struct FiberFlags: u8 {
        /// The fiber's handle must be attached under its nearest ancestor handle.
        const PLACEMENT = 0b0000_0001;
        /// The fiber keeps its handle; its props changed.
        const UPDATE    = 0b0000_0010;
        /// The fiber (an old one) has no positional match and must be removed.
        const DELETION  = 0b0000_0100;
    }
}

/// What a fiber stands for.
#[derive(Clone, Debug)]
pub(crate) enum FiberKind {
    /// The container root of a pass.
    Root,
    Host(alloc::borrow::Cow<'static, str>),
    Component(Component),
    Text,
}

impl FiberKind {
    pub(crate) fn from_element(element: &Element) -> Self {
        match element.ty() {
            ElementType::Host(tag) => Self::Host(tag.clone()),
            ElementType::Component(c) => Self::Component(c.clone()),
            ElementType::Text => Self::Text,
        }
    }

    /// Same tag, same component function, or both text.
    pub(crate) fn same_type(&self, element: &ElementType) -> bool {
        match (self, element) {
            (Self::Host(a), ElementType::Host(b)) => a == b,
            (Self::Component(a), ElementType::Component(b)) => a == b,
            (Self::Text, ElementType::Text) => true,
            _ => false,
        }
    }

    pub(crate) fn label(&self) -> &str {
        match self {
            Self::Root => "#root",
            Self::Host(tag) => tag,
            Self::Component(c) => c.name(),
            Self::Text => "#text",
        }
    }
}

/// One work node.
#[derive(Debug)]
pub(crate) struct Fiber<H> {
    pub(crate) kind: FiberKind,
    pub(crate) key: Option<Key>,
    pub(crate) props: Props,
    pub(crate) handle: Option<H>,
    pub(crate) parent: Option<FiberId>,
    pub(crate) child: Option<FiberId>,
    pub(crate) sibling: Option<FiberId>,
    pub(crate) alternate: Option<FiberId>,
    pub(crate) flags: FiberFlags,
    pub(crate) hooks: Vec<HookSlot>,
    /// Nearest following sibling that is not being placed, if any.
    ///
    /// Placements use its handle as their insertion anchor.
    pub(crate) next_stable: Option<FiberId>,
}

impl<H> Fiber<H> {
    pub(crate) fn new(kind: FiberKind, key: Option<Key>, props: Props) -> Self {
        Self {
            kind,
            key,
            props,
            handle: None,
            parent: None,
            child: None,
            sibling: None,
            alternate: None,
            flags: FiberFlags::empty(),
            hooks: Vec::new(),
            next_stable: None,
        }
    }

    pub(crate) fn from_element(element: &Element) -> Self {
        Self::new(
            FiberKind::from_element(element),
            element.key_ref().cloned(),
            element.props().clone(),
        )
    }
}

#[derive(Debug)]
struct Slot<H> {
    generation: u32,
    fiber: Option<Fiber<H>>,
}

/// Generational storage for fibers of the current and work-in-progress trees.
pub(crate) struct FiberArena<H> {
    slots: Vec<Slot<H>>,
    free_list: Vec<usize>,
}

impl<H> core::fmt::Debug for FiberArena<H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FiberArena")
            .field("slots", &self.slots.len())
            .field("free_list", &self.free_list.len())
            .finish()
    }
}

impl<H> Default for FiberArena<H> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
        }
    }
}

impl<H> FiberArena<H> {
    pub(crate) fn insert(&mut self, fiber: Fiber<H>) -> FiberId {
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let slot = &mut self.slots[idx];
            slot.generation = slot.generation.saturating_add(1);
            slot.fiber = Some(fiber);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "FiberId uses 32-bit indices."
            )]
            (idx as u32, slot.generation)
        } else {
            self.slots.push(Slot {
                generation: 1,
                fiber: Some(fiber),
            });
            #[allow(
                clippy::cast_possible_truncation,
                reason = "FiberId uses 32-bit indices."
            )]
            ((self.slots.len() - 1) as u32, 1)
        };
        FiberId(idx, generation)
    }

    /// Release a fiber, returning it. Stale ids are ignored.
    pub(crate) fn free(&mut self, id: FiberId) -> Option<Fiber<H>> {
        let slot = self.slots.get_mut(id.idx())?;
        if slot.generation != id.1 {
            return None;
        }
        let fiber = slot.fiber.take()?;
        self.free_list.push(id.idx());
        Some(fiber)
    }

    pub(crate) fn is_alive(&self, id: FiberId) -> bool {
        self.slots
            .get(id.idx())
            .is_some_and(|s| s.generation == id.1 && s.fiber.is_some())
    }

    /// Number of live fibers.
    pub(crate) fn len(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }

    pub(crate) fn get(&self, id: FiberId) -> &Fiber<H> {
        let slot = &self.slots[id.idx()];
        debug_assert_eq!(slot.generation, id.1, "stale FiberId");
        slot.fiber.as_ref().expect("dangling FiberId")
    }

    pub(crate) fn get_mut(&mut self, id: FiberId) -> &mut Fiber<H> {
        let slot = &mut self.slots[id.idx()];
        debug_assert_eq!(slot.generation, id.1, "stale FiberId");
        slot.fiber.as_mut().expect("dangling FiberId")
    }

    /// Next fiber after `id` in a depth-first pre-order walk of the subtree under `root`.
    ///
    /// Child first, then sibling, then the sibling of the nearest ancestor that has one.
    /// Returns `None` once the walk would leave `root`.
    pub(crate) fn preorder_next(&self, id: FiberId, root: FiberId) -> Option<FiberId> {
        if let Some(child) = self.get(id).child {
            return Some(child);
        }
        self.next_skipping_children(id, root)
    }

    /// Like [`Self::preorder_next`] but never descends into `id`'s children.
    pub(crate) fn next_skipping_children(&self, mut id: FiberId, root: FiberId) -> Option<FiberId> {
        loop {
            if id == root {
                return None;
            }
            let fiber = self.get(id);
            if let Some(sibling) = fiber.sibling {
                return Some(sibling);
            }
            id = fiber.parent?;
        }
    }

    /// Children of `id` in sibling order.
    pub(crate) fn children(&self, id: FiberId) -> Children<'_, H> {
        Children {
            arena: self,
            next: self.get(id).child,
        }
    }

    /// Free `root` and every fiber below it.
    pub(crate) fn free_subtree(&mut self, root: FiberId) -> usize {
        let mut doomed = Vec::new();
        let mut cursor = Some(root);
        while let Some(id) = cursor {
            doomed.push(id);
            cursor = self.preorder_next(id, root);
        }
        let count = doomed.len();
        for id in doomed {
            self.free(id);
        }
        count
    }
}

/// Iterator over a fiber's children.
pub(crate) struct Children<'a, H> {
    arena: &'a FiberArena<H>,
    next: Option<FiberId>,
}

impl<H> Iterator for Children<'_, H> {
    type Item = FiberId;

    fn next(&mut self) -> Option<FiberId> {
        let id = self.next?;
        self.next = self.arena.get(id).sibling;
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn leaf(arena: &mut FiberArena<()>, parent: Option<FiberId>) -> FiberId {
        let id = arena.insert(Fiber::new(FiberKind::Text, None, Props::default()));
        arena.get_mut(id).parent = parent;
        id
    }

    fn link(arena: &mut FiberArena<()>, parent: FiberId, children: &[FiberId]) {
        arena.get_mut(parent).child = children.first().copied();
        for pair in children.windows(2) {
            arena.get_mut(pair[0]).sibling = Some(pair[1]);
        }
    }

    #[test]
    fn generations_increase_on_reuse() {
        let mut arena = FiberArena::<()>::default();
        let a = leaf(&mut arena, None);
        assert!(arena.free(a).is_some());
        assert!(!arena.is_alive(a));
        let b = leaf(&mut arena, None);
        assert_eq!(a.0, b.0, "slot reused");
        assert!(b.1 > a.1, "generation must increase on reuse");
        assert!(arena.free(a).is_none(), "stale id frees nothing");
        assert!(arena.is_alive(b));
    }

    #[test]
    fn preorder_walk_stays_within_root() {
        // r -> [a -> [c], b]
        let mut arena = FiberArena::<()>::default();
        let outside = leaf(&mut arena, None);
        let r = leaf(&mut arena, None);
        arena.get_mut(r).sibling = Some(outside);
        let a = leaf(&mut arena, Some(r));
        let b = leaf(&mut arena, Some(r));
        let c = leaf(&mut arena, Some(a));
        link(&mut arena, r, &[a, b]);
        link(&mut arena, a, &[c]);

        let mut order = vec![r];
        let mut cursor = r;
        while let Some(next) = arena.preorder_next(cursor, r) {
            order.push(next);
            cursor = next;
        }
        assert_eq!(order, vec![r, a, c, b], "root's own sibling is never visited");
        assert_eq!(arena.children(r).collect::<Vec<_>>(), vec![a, b]);

        assert_eq!(arena.free_subtree(a), 2);
        assert_eq!(arena.len(), 3, "outside, r and b remain");
    }
}
