//! Parent/child links between nodes.
//!
//! Nodes never store references to each other; the scene owns every node and
//! this table owns the relationships between their ids.

use std::collections::HashMap;

use crate::error::{Result, SceneError};
use crate::node::NodeId;

#[derive(Debug, Default, Clone)]
pub struct Hierarchy {
    parents: HashMap<NodeId, NodeId>,
    children: HashMap<NodeId, Vec<NodeId>>,
    roots: Vec<NodeId>,
}

impl Hierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new node as a root.
    pub fn insert(&mut self, id: NodeId) {
        if self.children.contains_key(&id) {
            return;
        }
        self.children.insert(id, Vec::new());
        self.roots.push(id);
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.children.contains_key(&id)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parents.get(&id).copied()
    }

    /// Direct children in insertion order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Iterates from the parent of `id` up to its root.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            hierarchy: self,
            current: self.parent(id),
        }
    }

    /// True when `ancestor` is a strict ancestor of `id`.
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        self.ancestors(id).any(|candidate| candidate == ancestor)
    }

    /// Checks that making `parent` the parent of `node` keeps the graph acyclic.
    pub fn check_link(&self, node: NodeId, parent: NodeId) -> Result<()> {
        if !self.contains(node) {
            return Err(SceneError::NodeNotFound(node));
        }
        if !self.contains(parent) {
            return Err(SceneError::NodeNotFound(parent));
        }
        if node == parent || self.is_ancestor(node, parent) {
            return Err(SceneError::CycleDetected { node, parent });
        }
        Ok(())
    }

    /// Moves `node` under `parent`, or to the roots when `parent` is `None`.
    pub fn link(&mut self, node: NodeId, parent: Option<NodeId>) -> Result<()> {
        match parent {
            Some(parent) => self.check_link(node, parent)?,
            None if !self.contains(node) => return Err(SceneError::NodeNotFound(node)),
            None => {}
        }

        self.unlink(node);

        match parent {
            Some(parent) => {
                self.parents.insert(node, parent);
                if let Some(siblings) = self.children.get_mut(&parent) {
                    siblings.push(node);
                }
            }
            None => self.roots.push(node),
        }
        Ok(())
    }

    /// Forgets `id`. Its children become roots.
    pub fn remove(&mut self, id: NodeId) {
        if !self.contains(id) {
            return;
        }
        self.unlink(id);

        for child in self.children.remove(&id).unwrap_or_default() {
            self.parents.remove(&child);
            self.roots.push(child);
        }
    }

    fn unlink(&mut self, id: NodeId) {
        match self.parents.remove(&id) {
            Some(parent) => {
                if let Some(siblings) = self.children.get_mut(&parent) {
                    siblings.retain(|&child| child != id);
                }
            }
            None => self.roots.retain(|&root| root != id),
        }
    }
}

/// Iterator over the ancestors of a node, nearest first.
pub struct Ancestors<'a> {
    hierarchy: &'a Hierarchy,
    current: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.current?;
        self.current = self.hierarchy.parent(id);
        Some(id)
    }
}
