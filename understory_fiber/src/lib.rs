// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_fiber --heading-base-level=0

//! Understory Fiber: incremental reconciliation of declarative trees into an external target.
//!
//! Describe the tree you want with [`Element`]s and components; this crate works out the
//! smallest set of mutations that turns what was committed last time into it, and applies
//! them through a [`HostAdapter`] exactly once per pass.
//!
//! ## Where this fits
//!
//! - Element tree: an immutable description produced by application code.
//! - Fiber tree: the persistent work tree kept here, double buffered between the committed
//!   tree and a work-in-progress tree.
//! - Host tree: whatever the adapter mutates (a DOM, a widget tree, or [`MemoryHost`]).
//!
//! ## Passes
//!
//! Every request (a [`Root::render`], a state setter, a transition) records a pending root
//! for a priority [`Lane`]. When the host flushes, the most urgent lane is adopted and walked
//! depth first:
//!
//! - component fibers are rendered with a [`Hooks`] context;
//! - host and text fibers get a handle on first visit;
//! - children are paired with the previous pass's children by position and tagged
//!   Placement, Update or Deletion.
//!
//! The commit then removes deleted subtrees (running their effect cleanups), attaches and
//! updates in tree order, swaps the work-in-progress tree in as current, and runs the
//! effects queued during the walk.
//!
//! Children are paired by position, not by key. Reordering a keyed list whose items share a
//! type updates each position in place instead of moving handles.
//!
//! ## Lanes
//!
//! [`Lane::Immediate`] beats [`Lane::Transition`] beats [`Lane::Idle`]. At most one pending
//! root exists per lane; later requests merge into it. A lane's pass only applies state
//! updates from that lane or more urgent ones, so an urgent pass can commit while a large
//! transition is still queued. Use [`Session::run_under_lane`] or [`Hooks::use_transition`]
//! to tag updates.
//!
//! ## Time slicing
//!
//! [`Root::flush`] runs on an [`understory_scheduler::Scheduler`]. Each lane is processed by
//! its own task and the budget is checked between tasks, so the host regains control between
//! lanes. A single lane's walk is not interrupted.
//!
//! ## Example
//!
//! ```
//! use understory_fiber::{Component, Element, Hooks, MemoryHost, Props, Root};
//! use understory_scheduler::ManualClock;
//!
//! fn counter(cx: &mut Hooks<'_>, _: &Props) -> Element {
//!     let (count, set_count) = cx.use_state(|| 0_i64);
//!     cx.use_effect(Some(vec![]), move || {
//!         for _ in 0..3 {
//!             set_count.update(|c| c + 1);
//!         }
//!     });
//!     Element::host("p").child(count)
//! }
//!
//! let mut host = MemoryHost::new();
//! let container = host.create_container();
//! let mut root = Root::new(host, container);
//! root.render(Element::component(Component::new(counter)));
//!
//! let clock = ManualClock::new();
//! root.flush_until_idle(&clock).unwrap();
//! assert_eq!(root.host().render_to_string(container), "<p>3</p>");
//! assert_eq!(root.commit_count(), 2, "mount, then one pass for all three updates");
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod commit;
mod element;
mod error;
mod fiber;
mod hooks;
mod host;
mod lane;
mod memory;
mod reconcile;
mod root;
mod session;

pub use commit::CommitReport;
pub use element::{
    Callback, Component, Element, ElementType, IntoChildren, Key, Props, RenderFn, Value,
    create_element,
};
pub use error::{Error, Phase};
pub use hooks::{
    Cleanup, Dispatch, Hooks, IntoCleanup, StateSetter, Transition, deps_changed,
};
pub use host::HostAdapter;
pub use lane::{Lane, LaneRegistry, PendingRoot};
pub use memory::{HostOp, MemoryHandle, MemoryHost, MemoryHostError, MemoryNode, NodeContent};
pub use root::{Root, RootConfig};
pub use session::Session;
