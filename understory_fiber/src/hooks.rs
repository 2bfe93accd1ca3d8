// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hook runtime: call-order indexed state, effect, memo and ref slots.
//!
//! ## Slots
//!
//! Each component fiber owns a `Vec` of hook slots. When a component is rendered again,
//! the slots are copied by reference from its alternate and the `n`-th hook call of the
//! render is bound to the `n`-th slot. Calling hooks in a different order or number
//! between renders is a programmer error and panics with the component's name.
//!
//! ## State queues and lanes
//!
//! Setters never apply updates synchronously. Each update is appended to the slot's
//! queue tagged with the session's active [`Lane`] and a pending root is submitted for
//! that lane. A render pass at lane `L` replays the queue from the slot's base value:
//!
//! - updates tagged `L` or a more urgent lane are applied in order;
//! - less urgent updates are skipped and stay queued. The base value freezes just
//!   before the first skipped update, and every update after it stays queued as well
//!   (untagged, so it is applied again by whichever pass comes next).
//!
//! Replaying keeps submission order intact across lanes: an update never observes a
//! state that skips one submitted before it. This is why update actions must be
//! re-applicable (`Fn`, not `FnOnce`).
//!
//! ## Effects
//!
//! [`Hooks::use_effect`] compares dependency lists with [`deps_changed`]. A changed effect
//! is queued for the commit; when it runs, the previous cleanup runs first and the
//! callback's returned cleanup replaces it. When the owning fiber is deleted, the
//! pending cleanup runs exactly once.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::any::Any;
use core::cell::{Cell, RefCell};

use crate::element::Value;
use crate::lane::Lane;
use crate::session::Session;

/// Cleanup returned by an effect; runs before the effect's next execution or on unmount.
pub struct Cleanup(Box<dyn FnOnce()>);

impl Cleanup {
    /// Wrap a closure.
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Self(Box::new(f))
    }

    fn run(self) {
        (self.0)();
    }
}

impl core::fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Cleanup")
    }
}

/// Values an effect callback may return.
pub trait IntoCleanup {
    /// Convert into an optional cleanup.
    fn into_cleanup(self) -> Option<Cleanup>;
}

impl IntoCleanup for () {
    fn into_cleanup(self) -> Option<Cleanup> {
        None
    }
}

impl IntoCleanup for Cleanup {
    fn into_cleanup(self) -> Option<Cleanup> {
        Some(self)
    }
}

impl IntoCleanup for Option<Cleanup> {
    fn into_cleanup(self) -> Option<Cleanup> {
        self
    }
}

/// Returns true if an effect or memo with dependencies `prev` must rerun for `next`.
///
/// `None` means "no dependency list": a missing next list always counts as changed,
/// and so does a missing previous list. Lists of different length are changed;
/// otherwise values are compared element by element with [`Value`]'s shallow equality.
pub fn deps_changed(prev: Option<&[Value]>, next: Option<&[Value]>) -> bool {
    match (prev, next) {
        (Some(prev), Some(next)) => {
            prev.len() != next.len() || prev.iter().zip(next).any(|(a, b)| a != b)
        }
        _ => true,
    }
}

enum Action<T> {
    Replace(T),
    Apply(Rc<dyn Fn(&T) -> T>),
}

impl<T: Clone> Action<T> {
    fn apply(&self, prev: &T) -> T {
        match self {
            Self::Replace(value) => value.clone(),
            Self::Apply(f) => f(prev),
        }
    }
}

struct Update<T> {
    /// `None` once rebased: applied by every later pass.
    lane: Option<Lane>,
    action: Action<T>,
}

struct StateQueue<T> {
    base: T,
    updates: Vec<Update<T>>,
}

pub(crate) struct StateCell<T> {
    queue: RefCell<StateQueue<T>>,
    mounted: Cell<bool>,
    component: &'static str,
}

impl<T: Clone> StateCell<T> {
    fn new(initial: T, component: &'static str) -> Self {
        Self {
            queue: RefCell::new(StateQueue {
                base: initial,
                updates: Vec::new(),
            }),
            mounted: Cell::new(true),
            component,
        }
    }

    /// Replay the queue for a pass at `lane` and return the resulting value.
    fn process(&self, lane: Lane) -> T {
        let (base, updates) = {
            let mut queue = self.queue.borrow_mut();
            if queue.updates.is_empty() {
                return queue.base.clone();
            }
            (queue.base.clone(), core::mem::take(&mut queue.updates))
        };

        let mut state = base;
        let mut frozen_base: Option<T> = None;
        let mut kept = Vec::new();
        for update in updates {
            if update.lane.is_some_and(|l| l < lane) {
                if frozen_base.is_none() {
                    frozen_base = Some(state.clone());
                }
                kept.push(update);
                continue;
            }
            state = update.action.apply(&state);
            if frozen_base.is_some() {
                kept.push(Update {
                    lane: None,
                    action: update.action,
                });
            }
        }

        let mut queue = self.queue.borrow_mut();
        // Updates enqueued while actions ran go after the survivors.
        kept.append(&mut queue.updates);
        queue.updates = kept;
        queue.base = frozen_base.unwrap_or_else(|| state.clone());
        state
    }

    fn push(&self, update: Update<T>) {
        self.queue.borrow_mut().updates.push(update);
    }
}

/// Type-erased view of a state slot.
pub(crate) trait StateSlot: Any {
    fn unmount(&self);
}

impl<T: 'static> StateSlot for StateCell<T> {
    fn unmount(&self) {
        self.mounted.set(false);
        self.queue.borrow_mut().updates.clear();
    }
}

pub(crate) struct EffectCell {
    deps: Option<Vec<Value>>,
    cleanup: Option<Cleanup>,
    has_run: bool,
    mounted: bool,
}

impl EffectCell {
    fn unmount(&mut self) -> Option<Cleanup> {
        self.mounted = false;
        self.cleanup.take()
    }
}

/// An effect queued during a render, executed after the commit.
pub(crate) struct PendingEffect {
    cell: Rc<RefCell<EffectCell>>,
    deps: Option<Vec<Value>>,
    callback: Box<dyn FnOnce() -> Option<Cleanup>>,
}

impl core::fmt::Debug for PendingEffect {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PendingEffect")
            .field("deps", &self.deps)
            .finish_non_exhaustive()
    }
}

impl PendingEffect {
    /// Run the previous cleanup, then the callback. Returns false if the slot was unmounted.
    pub(crate) fn run(self) -> bool {
        let previous = {
            let mut cell = self.cell.borrow_mut();
            if !cell.mounted {
                return false;
            }
            cell.cleanup.take()
        };
        if let Some(cleanup) = previous {
            cleanup.run();
        }
        let next = (self.callback)();
        let orphaned = {
            let mut cell = self.cell.borrow_mut();
            cell.deps = self.deps;
            cell.has_run = true;
            if cell.mounted {
                cell.cleanup = next;
                None
            } else {
                next
            }
        };
        if let Some(cleanup) = orphaned {
            cleanup.run();
        }
        true
    }
}

#[derive(Clone)]
pub(crate) struct MemoSlot {
    deps: Option<Vec<Value>>,
    value: Rc<dyn Any>,
}

/// One call-order indexed hook cell.
#[derive(Clone)]
pub(crate) enum HookSlot {
    State(Rc<dyn StateSlot>),
    Effect(Rc<RefCell<EffectCell>>),
    Memo(MemoSlot),
    Ref(Rc<dyn Any>),
}

impl HookSlot {
    fn kind(&self) -> &'static str {
        match self {
            Self::State(_) => "state",
            Self::Effect(_) => "effect",
            Self::Memo(_) => "memo",
            Self::Ref(_) => "ref",
        }
    }

    /// Release the slot for good: effect cleanups run, state setters go inert.
    pub(crate) fn unmount(&self) {
        match self {
            Self::State(state) => state.unmount(),
            Self::Effect(cell) => {
                let cleanup = cell.borrow_mut().unmount();
                if let Some(cleanup) = cleanup {
                    cleanup.run();
                }
            }
            Self::Memo(_) | Self::Ref(_) => {}
        }
    }
}

impl core::fmt::Debug for HookSlot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.kind())
    }
}

/// Setter returned by [`Hooks::use_state`].
///
/// Calls enqueue an update under the session's active lane and request a render of
/// that lane; nothing changes until the next pass. After the owning component is
/// unmounted, updates are dropped with a warning.
pub struct StateSetter<T> {
    cell: Rc<StateCell<T>>,
    session: Session,
}

impl<T> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            session: self.session.clone(),
        }
    }
}

impl<T> core::fmt::Debug for StateSetter<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StateSetter")
            .field("component", &self.cell.component)
            .field("mounted", &self.cell.mounted.get())
            .finish_non_exhaustive()
    }
}

impl<T: Clone + 'static> StateSetter<T> {
    /// Replace the value.
    pub fn set(&self, value: T) {
        self.enqueue(Action::Replace(value));
    }

    /// Derive the next value from the previous one.
    ///
    /// `f` may run more than once if a less urgent update is queued ahead of it.
    pub fn update(&self, f: impl Fn(&T) -> T + 'static) {
        self.enqueue(Action::Apply(Rc::new(f)));
    }

    /// Returns false once the owning component has been unmounted.
    pub fn is_mounted(&self) -> bool {
        self.cell.mounted.get()
    }

    fn enqueue(&self, action: Action<T>) {
        if !self.cell.mounted.get() {
            tracing::warn!(
                component = self.cell.component,
                "state update on an unmounted component was dropped"
            );
            return;
        }
        let lane = self.session.active_lane();
        self.cell.push(Update {
            lane: Some(lane),
            action,
        });
        self.session.request_update(lane);
    }
}

/// Dispatcher returned by [`Hooks::use_reducer`].
pub struct Dispatch<S, A> {
    setter: StateSetter<S>,
    reducer: Rc<dyn Fn(&S, &A) -> S>,
}

impl<S, A> Clone for Dispatch<S, A> {
    fn clone(&self) -> Self {
        Self {
            setter: self.setter.clone(),
            reducer: self.reducer.clone(),
        }
    }
}

impl<S, A> core::fmt::Debug for Dispatch<S, A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Dispatch")
            .field("setter", &self.setter)
            .finish_non_exhaustive()
    }
}

impl<S: Clone + 'static, A: 'static> Dispatch<S, A> {
    /// Queue `action` for the reducer.
    pub fn dispatch(&self, action: A) {
        let reducer = self.reducer.clone();
        self.setter.update(move |state| reducer(state, &action));
    }
}

/// Handle returned by [`Hooks::use_transition`].
#[derive(Clone, Debug)]
pub struct Transition {
    set_pending: StateSetter<bool>,
    session: Session,
}

impl Transition {
    /// Run `f` under [`Lane::Transition`].
    ///
    /// The pending flag is raised with an [`Lane::Immediate`] update first and lowered
    /// inside the transition, so the urgent pass shows `true` and the transition pass
    /// that carries `f`'s updates shows `false`.
    pub fn start(&self, f: impl FnOnce()) {
        self.session
            .run_under_lane(Lane::Immediate, || self.set_pending.set(true));
        self.session.run_under_lane(Lane::Transition, || {
            self.set_pending.set(false);
            f();
        });
    }
}

/// Hook context handed to a component while it renders.
///
/// Only reachable during a component invocation, so hooks cannot be called from anywhere else.
pub struct Hooks<'a> {
    slots: &'a mut Vec<HookSlot>,
    cursor: usize,
    mounting: bool,
    lane: Lane,
    session: &'a Session,
    effects: &'a mut Vec<PendingEffect>,
    component: &'static str,
}

impl core::fmt::Debug for Hooks<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hooks")
            .field("component", &self.component)
            .field("cursor", &self.cursor)
            .field("slots", &self.slots.len())
            .field("lane", &self.lane)
            .finish_non_exhaustive()
    }
}

impl<'a> Hooks<'a> {
    pub(crate) fn new(
        slots: &'a mut Vec<HookSlot>,
        mounting: bool,
        lane: Lane,
        session: &'a Session,
        effects: &'a mut Vec<PendingEffect>,
        component: &'static str,
    ) -> Self {
        Self {
            slots,
            cursor: 0,
            mounting,
            lane,
            session,
            effects,
            component,
        }
    }

    /// Check that an update rendered as many hooks as the render before it.
    pub(crate) fn finish(self) {
        assert!(
            self.mounting || self.cursor == self.slots.len(),
            "{}: rendered {} hooks, previous render had {}",
            self.component,
            self.cursor,
            self.slots.len()
        );
    }

    /// The lane of the pass that is rendering.
    pub fn lane(&self) -> Lane {
        self.lane
    }

    /// The session, for callbacks that need [`Session::run_under_lane`].
    pub fn session(&self) -> &Session {
        self.session
    }

    fn next_slot(&mut self, kind: &'static str, init: impl FnOnce() -> HookSlot) -> &mut HookSlot {
        let index = self.cursor;
        self.cursor += 1;
        if index == self.slots.len() {
            assert!(
                self.mounting,
                "{}: rendered more hooks than during the previous render",
                self.component
            );
            self.slots.push(init());
        }
        let slot = &mut self.slots[index];
        assert!(
            slot.kind() == kind,
            "{}: hook #{index} was `{}` and is now `{kind}`; \
             hooks must be called in the same order on every render",
            self.component,
            slot.kind()
        );
        slot
    }

    /// A piece of state that survives re-renders.
    ///
    /// `init` runs on the first render only. The returned value reflects every queued
    /// update visible to this pass's lane, applied in submission order.
    pub fn use_state<T: Clone + 'static>(
        &mut self,
        init: impl FnOnce() -> T,
    ) -> (T, StateSetter<T>) {
        let component = self.component;
        let slot = self.next_slot("state", || {
            HookSlot::State(Rc::new(StateCell::new(init(), component)))
        });
        let HookSlot::State(state) = slot else {
            unreachable!("kind checked by next_slot");
        };
        let erased: Rc<dyn Any> = state.clone();
        let Ok(cell) = erased.downcast::<StateCell<T>>() else {
            panic!(
                "{component}: state hook changed type to `{}` between renders",
                core::any::type_name::<T>()
            );
        };
        let value = cell.process(self.lane);
        let setter = StateSetter {
            cell,
            session: self.session.clone(),
        };
        (value, setter)
    }

    /// State driven by a reducer: `dispatch(action)` queues `reducer(&state, &action)`.
    pub fn use_reducer<S, A>(
        &mut self,
        reducer: impl Fn(&S, &A) -> S + 'static,
        init: impl FnOnce() -> S,
    ) -> (S, Dispatch<S, A>)
    where
        S: Clone + 'static,
        A: 'static,
    {
        let (state, setter) = self.use_state(init);
        (
            state,
            Dispatch {
                setter,
                reducer: Rc::new(reducer),
            },
        )
    }

    /// Run `effect` after the commit when `deps` changed since it last ran.
    ///
    /// `deps = None` runs it after every commit. The effect may return a [`Cleanup`],
    /// which runs before its next execution and when the component unmounts.
    pub fn use_effect<F, R>(&mut self, deps: Option<Vec<Value>>, effect: F)
    where
        F: FnOnce() -> R + 'static,
        R: IntoCleanup,
    {
        let slot = self.next_slot("effect", || {
            HookSlot::Effect(Rc::new(RefCell::new(EffectCell {
                deps: None,
                cleanup: None,
                has_run: false,
                mounted: true,
            })))
        });
        let HookSlot::Effect(cell) = slot else {
            unreachable!("kind checked by next_slot");
        };
        let changed = {
            let current = cell.borrow();
            !current.has_run || deps_changed(current.deps.as_deref(), deps.as_deref())
        };
        if changed {
            let cell = cell.clone();
            self.effects.push(PendingEffect {
                cell,
                deps,
                callback: Box::new(move || effect().into_cleanup()),
            });
        }
    }

    /// Cache `compute()` until `deps` change.
    pub fn use_memo<T: Clone + 'static>(
        &mut self,
        deps: Option<Vec<Value>>,
        compute: impl FnOnce() -> T,
    ) -> T {
        let component = self.component;
        if self.cursor == self.slots.len() {
            let value = compute();
            let erased: Rc<dyn Any> = Rc::new(value.clone());
            self.next_slot("memo", move || HookSlot::Memo(MemoSlot { deps, value: erased }));
            return value;
        }
        let HookSlot::Memo(memo) = self.next_slot("memo", || unreachable!("slot exists")) else {
            unreachable!("kind checked by next_slot");
        };
        if deps_changed(memo.deps.as_deref(), deps.as_deref()) {
            let value = compute();
            memo.deps = deps;
            memo.value = Rc::new(value.clone());
            return value;
        }
        match memo.value.downcast_ref::<T>() {
            Some(value) => value.clone(),
            None => panic!(
                "{component}: memo hook changed type to `{}` between renders",
                core::any::type_name::<T>()
            ),
        }
    }

    /// A mutable cell that keeps its identity across renders.
    pub fn use_ref<T: 'static>(&mut self, init: impl FnOnce() -> T) -> Rc<RefCell<T>> {
        let slot = self.next_slot("ref", || HookSlot::Ref(Rc::new(RefCell::new(init()))));
        let HookSlot::Ref(any) = slot else {
            unreachable!("kind checked by next_slot");
        };
        let any = Rc::clone(any);
        match any.downcast::<RefCell<T>>() {
            Ok(cell) => cell,
            Err(_) => panic!(
                "{}: ref hook changed type to `{}` between renders",
                self.component,
                core::any::type_name::<T>()
            ),
        }
    }

    /// `(is_pending, transition)`: see [`Transition::start`].
    pub fn use_transition(&mut self) -> (bool, Transition) {
        let (pending, set_pending) = self.use_state(|| false);
        (
            pending,
            Transition {
                set_pending,
                session: self.session.clone(),
            },
        )
    }
}
