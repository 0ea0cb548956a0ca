//! Arena-backed composition graph.
//!
//! Every node lives in a slot of a [`Graph`] and is addressed by a
//! generational [`NodeId`]. Compositions own their children's handles in
//! order; each child keeps a lookup-only handle to its parent. A node has at
//! most one parent and the graph never contains a cycle: both are checked on
//! every insertion and a failed insertion leaves the graph untouched.

use smallvec::SmallVec;
use splice_core::{Result, SpliceError};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::node::Node;

/// Handle to a node inside a [`Graph`].
///
/// Handles are only meaningful for the graph that issued them (or a clone
/// of it); any other graph rejects them. A handle to a destroyed node is
/// rejected even if its slot has been reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
    graph: u32,
}

impl NodeId {
    pub fn index(self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}v{}g{}", self.index, self.generation, self.graph)
    }
}

type Children = SmallVec<[NodeId; 4]>;

#[derive(Debug, Clone)]
struct Entry {
    node: Node,
    parent: Option<NodeId>,
    children: Children,
}

#[derive(Debug, Clone, Default)]
struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

/// An owned forest of nodes, optionally with a designated root.
///
/// Cloning a graph deep-copies every node; handles stay valid in the clone.
#[derive(Debug, Clone)]
pub struct Graph {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: Option<NodeId>,
    len: usize,
    tag: u32,
}

static NEXT_GRAPH_TAG: AtomicU32 = AtomicU32::new(1);

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: None,
            len: 0,
            tag: NEXT_GRAPH_TAG.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Create a graph whose root is `node`.
    pub fn with_root(node: impl Into<Node>) -> (Self, NodeId) {
        let mut graph = Self::new();
        let id = graph.add(node);
        graph.root = Some(id);
        (graph, id)
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Designate a parentless node as the root, or clear the root.
    pub fn set_root(&mut self, root: Option<NodeId>) -> Result<()> {
        if let Some(id) = root {
            if self.entry(id)?.parent.is_some() {
                return Err(SpliceError::NodeStillParented(self.describe(id)));
            }
        }
        self.root = root;
        Ok(())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.entry(id).is_ok()
    }

    /// Add a detached node.
    pub fn add(&mut self, node: impl Into<Node>) -> NodeId {
        let entry = Entry {
            node: node.into(),
            parent: None,
            children: Children::new(),
        };
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entry = Some(entry);
            NodeId {
                index,
                generation: slot.generation,
                graph: self.tag,
            }
        } else {
            self.slots.push(Slot {
                generation: 0,
                entry: Some(entry),
            });
            NodeId {
                index: (self.slots.len() - 1) as u32,
                generation: 0,
                graph: self.tag,
            }
        }
    }

    pub fn get(&self, id: NodeId) -> Result<&Node> {
        Ok(&self.entry(id)?.node)
    }

    /// Mutable access to a payload. Ownership links are not reachable from
    /// here, so the parent/child invariants cannot be broken through it.
    pub fn get_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        Ok(&mut self.entry_mut(id)?.node)
    }

    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>> {
        Ok(self.entry(id)?.parent)
    }

    /// Ordered children of a node. Leaves have none.
    pub fn children(&self, id: NodeId) -> Result<&[NodeId]> {
        Ok(&self.entry(id)?.children)
    }

    /// Live node handles, in slot order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.entry.as_ref().map(|_| NodeId {
                index: index as u32,
                generation: slot.generation,
                graph: self.tag,
            })
        })
    }

    // ── Ownership ───────────────────────────────────────────────

    /// Append `child` as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let len = self.children(parent)?.len();
        self.insert_child(parent, len, child)
    }

    /// Insert `child` at `index`; indices past the end append.
    ///
    /// Inserting the graph's root clears the root designation.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<()> {
        self.check_insertable(parent, child)?;
        let children = &mut self.entry_mut(parent)?.children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.adopt(parent, child)
    }

    /// Replace the child at `index` with `child`, returning the detached
    /// previous child.
    pub fn set_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<NodeId> {
        let len = self.children(parent)?.len();
        if index >= len {
            return Err(SpliceError::IndexOutOfBounds { index, len });
        }
        let previous = self.entry(parent)?.children[index];
        if previous == child {
            return Ok(child);
        }
        self.check_insertable(parent, child)?;
        self.entry_mut(parent)?.children[index] = child;
        self.entry_mut(previous)?.parent = None;
        self.adopt(parent, child)?;
        Ok(previous)
    }

    /// Detach and return the child at `index`.
    pub fn remove_child(&mut self, parent: NodeId, index: usize) -> Result<NodeId> {
        let children = &mut self.entry_mut(parent)?.children;
        if index >= children.len() {
            return Err(SpliceError::IndexOutOfBounds {
                index,
                len: children.len(),
            });
        }
        let child = children.remove(index);
        self.entry_mut(child)?.parent = None;
        Ok(child)
    }

    /// Detach every child of `parent`, returning them in order.
    pub fn clear_children(&mut self, parent: NodeId) -> Result<Vec<NodeId>> {
        let children = std::mem::take(&mut self.entry_mut(parent)?.children);
        for &child in &children {
            self.entry_mut(child)?.parent = None;
        }
        Ok(children.into_vec())
    }

    pub fn index_of_child(&self, parent: NodeId, child: NodeId) -> Result<usize> {
        self.children(parent)?
            .iter()
            .position(|&c| c == child)
            .ok_or_else(|| {
                SpliceError::NotAChild(format!(
                    "{} under {}",
                    self.describe(child),
                    self.describe(parent)
                ))
            })
    }

    /// Free a detached node and its whole subtree.
    pub fn destroy(&mut self, id: NodeId) -> Result<()> {
        if self.entry(id)?.parent.is_some() {
            return Err(SpliceError::NodeStillParented(self.describe(id)));
        }
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            let slot = &mut self.slots[next.index()];
            if let Some(entry) = slot.entry.take() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(next.index);
                self.len -= 1;
                pending.extend(entry.children);
            }
        }
        if self.root == Some(id) {
            self.root = None;
        }
        Ok(())
    }

    /// Deep-copy the subtree at `id` of `other` into this graph as a new
    /// detached subtree.
    pub fn import(&mut self, other: &Graph, id: NodeId) -> Result<NodeId> {
        let source = other.entry(id)?;
        let copy = self.add(source.node.clone());
        for &child in &source.children {
            let child_copy = self.import(other, child)?;
            self.entry_mut(child_copy)?.parent = Some(copy);
            self.entry_mut(copy)?.children.push(child_copy);
        }
        Ok(copy)
    }

    /// Deep-copy the subtree at `id` into a new graph rooted at the copy.
    pub fn extract(&self, id: NodeId) -> Result<Graph> {
        let mut graph = Graph::new();
        let root = graph.import(self, id)?;
        graph.root = Some(root);
        Ok(graph)
    }

    /// Whether two subtrees hold equal payloads in the same shape.
    pub fn same_structure(&self, a: NodeId, other: &Graph, b: NodeId) -> Result<bool> {
        let left = self.entry(a)?;
        let right = other.entry(b)?;
        if left.node != right.node || left.children.len() != right.children.len() {
            return Ok(false);
        }
        for (&l, &r) in left.children.iter().zip(right.children.iter()) {
            if !self.same_structure(l, other, r)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    // ── Ancestry ────────────────────────────────────────────────

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Result<Vec<NodeId>> {
        let mut result = Vec::new();
        let mut current = self.entry(id)?.parent;
        while let Some(parent) = current {
            result.push(parent);
            current = self.entry(parent)?.parent;
        }
        Ok(result)
    }

    /// Whether `ancestor` lies strictly above `node`.
    pub fn is_ancestor_of(&self, ancestor: NodeId, node: NodeId) -> Result<bool> {
        self.entry(ancestor)?;
        let mut current = self.entry(node)?.parent;
        while let Some(parent) = current {
            if parent == ancestor {
                return Ok(true);
            }
            current = self.entry(parent)?.parent;
        }
        Ok(false)
    }

    /// The topmost ancestor of `id`, or `id` itself when detached.
    pub fn highest_ancestor(&self, id: NodeId) -> Result<NodeId> {
        let mut current = id;
        while let Some(parent) = self.entry(current)?.parent {
            current = parent;
        }
        Ok(current)
    }

    /// `id` and every node below it, depth first in child order.
    pub fn descendants(&self, id: NodeId) -> Result<Vec<NodeId>> {
        let mut result = Vec::new();
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            result.push(next);
            pending.extend(self.entry(next)?.children.iter().rev().copied());
        }
        Ok(result)
    }

    /// Label for error messages; stale handles print as the handle itself.
    pub fn describe(&self, id: NodeId) -> String {
        match self.entry(id) {
            Ok(entry) => entry.node.describe(),
            Err(_) => id.to_string(),
        }
    }

    // ── Internals ───────────────────────────────────────────────

    fn entry(&self, id: NodeId) -> Result<&Entry> {
        if id.graph != self.tag {
            return Err(SpliceError::InvalidNode(format!("{id} belongs to another graph")));
        }
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_ref())
            .ok_or_else(|| SpliceError::InvalidNode(id.to_string()))
    }

    fn entry_mut(&mut self, id: NodeId) -> Result<&mut Entry> {
        if id.graph != self.tag {
            return Err(SpliceError::InvalidNode(format!("{id} belongs to another graph")));
        }
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_mut())
            .ok_or_else(|| SpliceError::InvalidNode(id.to_string()))
    }

    fn adopt(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.entry_mut(child)?.parent = Some(parent);
        if self.root == Some(child) {
            self.root = None;
        }
        Ok(())
    }

    /// Validate that `child` may be placed under `parent` without breaking
    /// single ownership or acyclicity.
    fn check_insertable(&self, parent: NodeId, child: NodeId) -> Result<()> {
        let parent_entry = self.entry(parent)?;
        let child_entry = self.entry(child)?;
        if !parent_entry.node.is_composition() {
            return Err(SpliceError::NotAComposition(self.describe(parent)));
        }
        if child_entry.parent.is_some() {
            return Err(SpliceError::ChildAlreadyParented {
                child: self.describe(child),
            });
        }
        if child == parent || self.is_ancestor_of(child, parent)? {
            return Err(SpliceError::WouldCreateCycle {
                child: self.describe(child),
                parent: self.describe(parent),
            });
        }
        Ok(())
    }
}
