// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! An in-memory renderer adapter with an operation log.
//!
//! [`MemoryHost`] keeps a plain node tree and records every adapter call as a [`HostOp`],
//! which makes it the reference target for tests: counting operations is how the
//! "no adapter calls" and "no handle recreation" guarantees are checked.
//!
//! ```
//! use understory_fiber::{HostAdapter, MemoryHost};
//!
//! let mut host = MemoryHost::new();
//! let root = host.create_container();
//! let p = host.create_handle("p").unwrap();
//! let text = host.create_text_handle("hi").unwrap();
//! host.attach(&p, &text).unwrap();
//! host.attach(&root, &p).unwrap();
//! assert_eq!(host.render_to_string(root), "<p>hi</p>");
//! assert_eq!(host.ops().len(), 4, "the container itself is not logged");
//! ```

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt::Write as _;

use crate::element::{Props, Value};
use crate::host::HostAdapter;

/// Handle to a node of a [`MemoryHost`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemoryHandle(u32);

impl core::fmt::Display for MemoryHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Failures of the in-memory target.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MemoryHostError {
    /// The handle was never created or has been detached.
    #[error("unknown handle {0}")]
    UnknownHandle(MemoryHandle),
    /// `handle` (or an anchor) is not a child of `parent`.
    #[error("{handle} is not a child of {parent}")]
    NotAChild {
        /// The parent that was searched.
        parent: MemoryHandle,
        /// The missing child.
        handle: MemoryHandle,
    },
    /// A text operation was applied to an element node.
    #[error("{0} is not a text node")]
    NotText(MemoryHandle),
    /// Creation of this tag was set up to fail with [`MemoryHost::fail_creating`].
    #[error("refusing to create <{0}>")]
    Refused(String),
    /// Placement was set up to fail with [`MemoryHost::fail_next_placement`].
    #[error("refusing to place {0}")]
    RefusedPlacement(MemoryHandle),
}

/// One recorded adapter call.
#[derive(Clone, Debug, PartialEq)]
pub enum HostOp {
    /// `create_handle`.
    Create {
        /// The new node.
        handle: MemoryHandle,
        /// Its tag.
        tag: String,
    },
    /// `create_text_handle`.
    CreateText {
        /// The new node.
        handle: MemoryHandle,
        /// Its contents.
        text: String,
    },
    /// `update_text_handle`.
    UpdateText {
        /// The text node.
        handle: MemoryHandle,
        /// New contents.
        text: String,
    },
    /// `apply_props_diff`.
    SetProps {
        /// The element node.
        handle: MemoryHandle,
        /// Attribute names that were added, changed or removed.
        changed: Vec<String>,
    },
    /// `attach`.
    Attach {
        /// New parent.
        parent: MemoryHandle,
        /// Attached node.
        handle: MemoryHandle,
    },
    /// `insert_before`.
    InsertBefore {
        /// New parent.
        parent: MemoryHandle,
        /// Inserted node.
        handle: MemoryHandle,
        /// Sibling it was inserted before.
        anchor: MemoryHandle,
    },
    /// `detach`.
    Detach {
        /// Former parent.
        parent: MemoryHandle,
        /// Removed node.
        handle: MemoryHandle,
    },
    /// `release`.
    Release {
        /// Freed node.
        handle: MemoryHandle,
    },
}

/// Contents of one node.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeContent {
    /// An element with a tag and attributes.
    Element {
        /// Tag name.
        tag: String,
        /// Current attributes.
        attrs: BTreeMap<String, Value>,
    },
    /// A text run.
    Text(String),
}

/// A node of the in-memory tree.
#[derive(Clone, Debug, PartialEq)]
pub struct MemoryNode {
    /// Tag and attributes, or text.
    pub content: NodeContent,
    /// Attached children in order.
    pub children: Vec<MemoryHandle>,
    /// Parent, if attached.
    pub parent: Option<MemoryHandle>,
}

/// In-memory [`HostAdapter`].
#[derive(Debug, Default)]
pub struct MemoryHost {
    nodes: Vec<Option<MemoryNode>>,
    ops: Vec<HostOp>,
    refuse: Option<String>,
    refuse_placement: bool,
}

impl MemoryHost {
    /// An empty host.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a container element to render into. Not recorded in the log.
    pub fn create_container(&mut self) -> MemoryHandle {
        self.alloc(NodeContent::Element {
            tag: "#container".to_string(),
            attrs: BTreeMap::new(),
        })
    }

    /// Make every later `create_handle(tag)` fail with [`MemoryHostError::Refused`].
    pub fn fail_creating(&mut self, tag: impl Into<String>) {
        self.refuse = Some(tag.into());
    }

    /// Make the next `attach` or `insert_before` fail with
    /// [`MemoryHostError::RefusedPlacement`].
    pub fn fail_next_placement(&mut self) {
        self.refuse_placement = true;
    }

    /// Undo [`MemoryHost::fail_creating`] and [`MemoryHost::fail_next_placement`].
    pub fn stop_failing(&mut self) {
        self.refuse = None;
        self.refuse_placement = false;
    }

    fn check_placement(&mut self, handle: MemoryHandle) -> Result<(), MemoryHostError> {
        if core::mem::take(&mut self.refuse_placement) {
            return Err(MemoryHostError::RefusedPlacement(handle));
        }
        Ok(())
    }

    /// Every operation recorded since the last [`MemoryHost::take_ops`].
    pub fn ops(&self) -> &[HostOp] {
        &self.ops
    }

    /// Drain the operation log.
    pub fn take_ops(&mut self) -> Vec<HostOp> {
        core::mem::take(&mut self.ops)
    }

    /// Look up a live node.
    pub fn node(&self, handle: MemoryHandle) -> Option<&MemoryNode> {
        self.nodes.get(handle.0 as usize)?.as_ref()
    }

    /// Number of live nodes, including containers.
    pub fn live_nodes(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    /// Attached children of `handle` (empty for unknown handles).
    pub fn children(&self, handle: MemoryHandle) -> &[MemoryHandle] {
        self.node(handle).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// An attribute of an element node.
    pub fn attr(&self, handle: MemoryHandle, name: &str) -> Option<&Value> {
        match &self.node(handle)?.content {
            NodeContent::Element { attrs, .. } => attrs.get(name),
            NodeContent::Text(_) => None,
        }
    }

    /// Concatenated text of the subtree under `handle`.
    pub fn text_content(&self, handle: MemoryHandle) -> String {
        let mut out = String::new();
        self.collect_text(handle, &mut out);
        out
    }

    fn collect_text(&self, handle: MemoryHandle, out: &mut String) {
        let Some(node) = self.node(handle) else {
            return;
        };
        if let NodeContent::Text(text) = &node.content {
            out.push_str(text);
        }
        for child in &node.children {
            self.collect_text(*child, out);
        }
    }

    /// Serialize the children of `handle` as markup.
    ///
    /// Callback and shared attributes are omitted; strings are quoted.
    pub fn render_to_string(&self, handle: MemoryHandle) -> String {
        let mut out = String::new();
        for child in self.children(handle) {
            self.write_node(*child, &mut out);
        }
        out
    }

    fn write_node(&self, handle: MemoryHandle, out: &mut String) {
        let Some(node) = self.node(handle) else {
            return;
        };
        match &node.content {
            NodeContent::Text(text) => out.push_str(text),
            NodeContent::Element { tag, attrs } => {
                let _ = write!(out, "<{tag}");
                for (name, value) in attrs {
                    let _ = match value {
                        Value::Str(s) => write!(out, " {name}=\"{s}\""),
                        Value::Int(v) => write!(out, " {name}={v}"),
                        Value::Float(v) => write!(out, " {name}={v}"),
                        Value::Bool(v) => write!(out, " {name}={v}"),
                        Value::Null | Value::Callback(_) | Value::Shared(_) => Ok(()),
                    };
                }
                out.push('>');
                for child in &node.children {
                    self.write_node(*child, out);
                }
                let _ = write!(out, "</{tag}>");
            }
        }
    }

    /// Invoke the callback stored in attribute `event` of `handle`.
    ///
    /// Returns `Ok(false)` if the attribute is missing or not a callback.
    pub fn dispatch(&self, handle: MemoryHandle, event: &str) -> Result<bool, MemoryHostError> {
        let node = self
            .node(handle)
            .ok_or(MemoryHostError::UnknownHandle(handle))?;
        let NodeContent::Element { attrs, .. } = &node.content else {
            return Ok(false);
        };
        let Some(callback) = attrs.get(event).and_then(Value::as_callback).cloned() else {
            return Ok(false);
        };
        callback.call();
        Ok(true)
    }

    /// Find the first element with attribute `name` equal to `value`, searching depth first.
    pub fn find_by_attr(
        &self,
        root: MemoryHandle,
        name: &str,
        value: &Value,
    ) -> Option<MemoryHandle> {
        if self.attr(root, name) == Some(value) {
            return Some(root);
        }
        self.children(root)
            .iter()
            .find_map(|child| self.find_by_attr(*child, name, value))
    }

    fn alloc(&mut self, content: NodeContent) -> MemoryHandle {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "MemoryHandle uses 32-bit indices."
        )]
        let handle = MemoryHandle(self.nodes.len() as u32);
        self.nodes.push(Some(MemoryNode {
            content,
            children: Vec::new(),
            parent: None,
        }));
        handle
    }

    fn node_mut(&mut self, handle: MemoryHandle) -> Result<&mut MemoryNode, MemoryHostError> {
        self.nodes
            .get_mut(handle.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(MemoryHostError::UnknownHandle(handle))
    }

    fn unlink(&mut self, handle: MemoryHandle) -> Result<(), MemoryHostError> {
        if let Some(old) = self.node_mut(handle)?.parent.take() {
            self.node_mut(old)?.children.retain(|c| *c != handle);
        }
        Ok(())
    }

    fn free_node(&mut self, handle: MemoryHandle) {
        let Some(node) = self.nodes.get_mut(handle.0 as usize).and_then(Option::take) else {
            return;
        };
        for child in node.children {
            self.free_node(child);
        }
    }
}

impl HostAdapter for MemoryHost {
    type Handle = MemoryHandle;
    type Error = MemoryHostError;

    fn create_handle(&mut self, tag: &str) -> Result<MemoryHandle, MemoryHostError> {
        if self.refuse.as_deref() == Some(tag) {
            return Err(MemoryHostError::Refused(tag.to_string()));
        }
        let handle = self.alloc(NodeContent::Element {
            tag: tag.to_string(),
            attrs: BTreeMap::new(),
        });
        self.ops.push(HostOp::Create {
            handle,
            tag: tag.to_string(),
        });
        Ok(handle)
    }

    fn create_text_handle(&mut self, text: &str) -> Result<MemoryHandle, MemoryHostError> {
        let handle = self.alloc(NodeContent::Text(text.to_string()));
        self.ops.push(HostOp::CreateText {
            handle,
            text: text.to_string(),
        });
        Ok(handle)
    }

    fn update_text_handle(
        &mut self,
        handle: &MemoryHandle,
        text: &str,
    ) -> Result<(), MemoryHostError> {
        match &mut self.node_mut(*handle)?.content {
            NodeContent::Text(current) => {
                current.clear();
                current.push_str(text);
            }
            NodeContent::Element { .. } => return Err(MemoryHostError::NotText(*handle)),
        }
        self.ops.push(HostOp::UpdateText {
            handle: *handle,
            text: text.to_string(),
        });
        Ok(())
    }

    fn apply_props_diff(
        &mut self,
        handle: &MemoryHandle,
        prev: &Props,
        next: &Props,
    ) -> Result<(), MemoryHostError> {
        let changed: Vec<String> = prev.changed_names(next).map(ToString::to_string).collect();
        if let NodeContent::Element { attrs, .. } = &mut self.node_mut(*handle)?.content {
            for name in &changed {
                match next.get(name) {
                    Some(value) => {
                        attrs.insert(name.clone(), value.clone());
                    }
                    None => {
                        attrs.remove(name);
                    }
                }
            }
        }
        self.ops.push(HostOp::SetProps {
            handle: *handle,
            changed,
        });
        Ok(())
    }

    fn attach(
        &mut self,
        parent: &MemoryHandle,
        handle: &MemoryHandle,
    ) -> Result<(), MemoryHostError> {
        self.check_placement(*handle)?;
        self.node_mut(*parent)?;
        self.unlink(*handle)?;
        self.node_mut(*handle)?.parent = Some(*parent);
        self.node_mut(*parent)?.children.push(*handle);
        self.ops.push(HostOp::Attach {
            parent: *parent,
            handle: *handle,
        });
        Ok(())
    }

    fn insert_before(
        &mut self,
        parent: &MemoryHandle,
        handle: &MemoryHandle,
        anchor: &MemoryHandle,
    ) -> Result<(), MemoryHostError> {
        self.check_placement(*handle)?;
        if !self.node_mut(*parent)?.children.contains(anchor) {
            return Err(MemoryHostError::NotAChild {
                parent: *parent,
                handle: *anchor,
            });
        }
        self.unlink(*handle)?;
        self.node_mut(*handle)?.parent = Some(*parent);
        let siblings = &mut self.node_mut(*parent)?.children;
        let at = siblings
            .iter()
            .position(|c| c == anchor)
            .unwrap_or(siblings.len());
        siblings.insert(at, *handle);
        self.ops.push(HostOp::InsertBefore {
            parent: *parent,
            handle: *handle,
            anchor: *anchor,
        });
        Ok(())
    }

    fn detach(
        &mut self,
        parent: &MemoryHandle,
        handle: &MemoryHandle,
    ) -> Result<(), MemoryHostError> {
        let siblings = &mut self.node_mut(*parent)?.children;
        let Some(at) = siblings.iter().position(|c| c == handle) else {
            return Err(MemoryHostError::NotAChild {
                parent: *parent,
                handle: *handle,
            });
        };
        siblings.remove(at);
        self.free_node(*handle);
        self.ops.push(HostOp::Detach {
            parent: *parent,
            handle: *handle,
        });
        Ok(())
    }

    fn release(&mut self, handle: &MemoryHandle) -> Result<(), MemoryHostError> {
        self.unlink(*handle)?;
        self.free_node(*handle);
        self.ops.push(HostOp::Release { handle: *handle });
        Ok(())
    }
}
