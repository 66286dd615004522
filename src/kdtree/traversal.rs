//! Utilities to traverse the KDTree structure.

use crate::allocator::NodeId;
use crate::distance::Distance;
use crate::kdtree::index::NodeKind;
use crate::kdtree::KDTreeIndex;
use crate::r#type::IndexableNum;

/// A read-only handle on a node of a [`KDTreeIndex`].
#[derive(Debug, Clone, Copy)]
pub struct Node<'i, 'a, N: IndexableNum, D: Distance<N>> {
    /// The tree that this node is a reference onto
    tree: &'i KDTreeIndex<'a, N, D>,
    id: NodeId,
}

impl<'i, 'a, N: IndexableNum, D: Distance<N>> Node<'i, 'a, N, D> {
    pub(crate) fn new(tree: &'i KDTreeIndex<'a, N, D>, id: NodeId) -> Self {
        Self { tree, id }
    }

    #[inline]
    fn kind(&self) -> &'i NodeKind<N> {
        &self.tree.pool.get(self.id).kind
    }

    /// Returns `true` if this is a leaf node holding points.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind(), NodeKind::Leaf { .. })
    }

    /// Returns `true` if this is an intermediate node with children.
    #[inline]
    pub fn is_parent(&self) -> bool {
        !self.is_leaf()
    }

    /// The dimension this node splits, or `None` for a leaf.
    pub fn split_dim(&self) -> Option<usize> {
        match self.kind() {
            NodeKind::Split { dim, .. } => Some(*dim),
            NodeKind::Leaf { .. } => None,
        }
    }

    /// The largest coordinate of the left child and the smallest coordinate of the right
    /// child along [`split_dim`][Node::split_dim], or `None` for a leaf.
    pub fn split_bounds(&self) -> Option<(N, N)> {
        match self.kind() {
            NodeKind::Split { low, high, .. } => Some((*low, *high)),
            NodeKind::Leaf { .. } => None,
        }
    }

    /// The child holding the points below the split.
    ///
    /// Returns `None` for a leaf, or once every point of that child has been removed.
    pub fn left_child(&self) -> Option<Node<'i, 'a, N, D>> {
        match self.kind() {
            NodeKind::Split { child1, .. } => child1.map(|id| Self::new(self.tree, id)),
            NodeKind::Leaf { .. } => None,
        }
    }

    /// The child holding the points above the split.
    ///
    /// Returns `None` for a leaf, or once every point of that child has been removed.
    pub fn right_child(&self) -> Option<Node<'i, 'a, N, D>> {
        match self.kind() {
            NodeKind::Split { child2, .. } => child2.map(|id| Self::new(self.tree, id)),
            NodeKind::Leaf { .. } => None,
        }
    }

    /// The children that still hold points, left first.
    pub fn children(&self) -> impl Iterator<Item = Node<'i, 'a, N, D>> {
        self.left_child().into_iter().chain(self.right_child())
    }

    /// The ids of the active points held by a leaf. Empty for an intermediate node.
    pub fn point_ids(&self) -> impl Iterator<Item = usize> + 'i {
        let ids = &self.tree.ids;
        let slots = match self.kind() {
            NodeKind::Leaf { start, len } => *start..*start + *len,
            NodeKind::Split { .. } => 0..0,
        };
        slots.map(move |slot| ids.get(slot))
    }
}
