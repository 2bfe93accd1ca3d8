// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The renderer adapter seam.

use crate::element::Props;

/// Turns committed fiber changes into mutations of an external target.
///
/// The reconciler calls the `create_*` methods while walking a tree (to give new host
/// and text fibers their handles) and everything else only during commit, so a host
/// never observes a partially reconciled tree attached to its container.
///
/// Every method is fallible. An error aborts the pass:
///
/// - during the walk, the work-in-progress tree is discarded, the handles it created are
///   passed to [`release`](Self::release), and the previously committed tree stays current;
/// - during the commit, the target may already be partly mutated, so both trees are
///   dropped, their topmost handles are detached from the container, and the next pass
///   mounts from scratch.
///
/// ## Contract
///
/// - A handle is created at most once per logical tree position; the core transfers
///   it across passes instead of recreating it.
/// - `attach`, `insert_before` and `detach` receive the handle of the nearest
///   ancestor that owns one (components own no handle).
/// - `apply_props_diff` receives the previously committed props (empty for a new handle)
///   and the next props. Children are managed separately and can be ignored.
pub trait HostAdapter {
    /// Opaque reference to a node of the external target.
    type Handle: Clone + PartialEq + core::fmt::Debug;
    /// Failure reported by the target.
    type Error: core::error::Error + 'static;

    /// Create an unattached node for a host tag.
    fn create_handle(&mut self, tag: &str) -> Result<Self::Handle, Self::Error>;

    /// Create an unattached text node.
    fn create_text_handle(&mut self, text: &str) -> Result<Self::Handle, Self::Error>;

    /// Replace the contents of a text node.
    fn update_text_handle(&mut self, handle: &Self::Handle, text: &str) -> Result<(), Self::Error>;

    /// Reconcile attributes and listeners from `prev` to `next`.
    fn apply_props_diff(
        &mut self,
        handle: &Self::Handle,
        prev: &Props,
        next: &Props,
    ) -> Result<(), Self::Error>;

    /// Append `handle` as the last child of `parent`.
    fn attach(&mut self, parent: &Self::Handle, handle: &Self::Handle) -> Result<(), Self::Error>;

    /// Insert `handle` under `parent` immediately before `anchor`.
    fn insert_before(
        &mut self,
        parent: &Self::Handle,
        handle: &Self::Handle,
        anchor: &Self::Handle,
    ) -> Result<(), Self::Error>;

    /// Remove `handle` from `parent` and release it.
    fn detach(&mut self, parent: &Self::Handle, handle: &Self::Handle) -> Result<(), Self::Error>;

    /// Release a handle that was created but never attached.
    ///
    /// Only called while abandoning a failed pass. The default keeps nothing to release.
    fn release(&mut self, handle: &Self::Handle) -> Result<(), Self::Error> {
        let _ = handle;
        Ok(())
    }
}
