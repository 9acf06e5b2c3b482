use crate::node::{NodeId, TransformNode};
use crate::scene::Scene;

/// Trait for implementing tree traversal operations.
///
/// Implementors of this trait can be passed to [`walk_tree`] to perform
/// arbitrary operations on each node during traversal.
pub trait TreeVisitor {
    /// Called when entering a node (before its children).
    ///
    /// Returns true to continue into the children, false to skip the subtree.
    fn enter_node(&mut self, node: &TransformNode) -> bool;

    /// Called when exiting a node (after its children).
    fn exit_node(&mut self, _node: &TransformNode) {}
}

/// Walks the scene tree depth-first starting from `node_id`.
pub fn walk_tree<V: TreeVisitor>(scene: &Scene, node_id: NodeId, visitor: &mut V) {
    let Some(node) = scene.get_node(node_id) else {
        return;
    };

    if visitor.enter_node(node) {
        for &child_id in scene.children(node_id) {
            walk_tree(scene, child_id, visitor);
        }
    }

    visitor.exit_node(node);
}

/// Collects the ids of visited nodes in pre-order.
#[derive(Debug, Default)]
pub(crate) struct CollectIds {
    pub ids: Vec<NodeId>,
    /// Stop descending below this depth (0 = only the start node).
    pub max_depth: Option<usize>,
    depth: usize,
}

impl CollectIds {
    pub fn with_max_depth(max_depth: Option<usize>) -> Self {
        Self {
            max_depth,
            ..Self::default()
        }
    }
}

impl TreeVisitor for CollectIds {
    fn enter_node(&mut self, node: &TransformNode) -> bool {
        self.ids.push(node.id());
        self.depth += 1;
        self.max_depth.is_none_or(|max| self.depth <= max)
    }

    fn exit_node(&mut self, _node: &TransformNode) {
        self.depth -= 1;
    }
}
