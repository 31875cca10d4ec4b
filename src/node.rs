//! Node representation for the persistent B-Tree.
//!
//! A node is either a leaf holding sorted values, or a branch holding `k`
//! keys and `k + 1` children. Values double as their own keys; the tree
//! orders them through a caller-supplied comparator. Nodes are immutable
//! once reachable from a published root and are shared between successive
//! roots by reference count.
//!
//! # Invariants
//!
//! - A branch holds exactly `keys.len() + 1` children.
//! - Keys within a node are strictly increasing under the tree's comparator.
//! - Every key inside child `i` orders strictly below `keys[i]`; the last
//!   child is bounded by the parent's upper bound.
//! - All children of a branch are uniformly leaves or uniformly branches.
//! - Every non-root node holds between `fan / 2` and `fan` keys.

use std::sync::Arc;

/// One node of a tree: the tree *is* its root node.
#[derive(Debug)]
pub(crate) enum Node<V> {
    /// Terminal node: sorted values only. The empty tree is an empty leaf.
    Leaf(Box<[V]>),

    /// Interior node: `k` sorted keys and `k + 1` subtrees.
    Branch {
        keys: Box<[V]>,
        children: Box<[Arc<Node<V>>]>,
    },
}

impl<V> Node<V> {
    /// Build a leaf from already-sorted values.
    pub(crate) fn leaf(keys: Vec<V>) -> Self {
        Self::Leaf(keys.into_boxed_slice())
    }

    /// Build a branch from already-sorted keys and their subtrees.
    pub(crate) fn branch(keys: Vec<V>, children: Vec<Arc<Node<V>>>) -> Self {
        debug_assert_eq!(children.len(), keys.len() + 1);

        Self::Branch {
            keys: keys.into_boxed_slice(),
            children: children.into_boxed_slice(),
        }
    }

    /// The empty leaf, which is also the empty tree.
    pub(crate) fn empty_leaf() -> Arc<Self> {
        Arc::new(Self::leaf(Vec::new()))
    }

    /// A zero-key branch used only to seed a freshly spilled builder level.
    ///
    /// Its single placeholder child is consumed by the level accounting
    /// before any copy can reach it; it is never part of a returned tree.
    pub(crate) fn empty_branch() -> Arc<Self> {
        Arc::new(Self::branch(Vec::new(), vec![Self::empty_leaf()]))
    }

    #[inline]
    pub(crate) const fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    /// Number of populated key slots.
    #[inline]
    pub(crate) fn key_end(&self) -> usize {
        self.keys().len()
    }

    /// The node's sorted keys.
    #[inline]
    pub(crate) fn keys(&self) -> &[V] {
        match self {
            Self::Leaf(keys) => keys,

            Self::Branch { keys, .. } => keys,
        }
    }

    /// The node's children; empty for a leaf.
    #[inline]
    pub(crate) fn children(&self) -> &[Arc<Node<V>>] {
        match self {
            Self::Leaf(_) => &[],

            Self::Branch { children, .. } => children,
        }
    }

    /// True for the empty tree.
    #[inline]
    pub(crate) fn is_empty_tree(&self) -> bool {
        match self {
            Self::Leaf(keys) => keys.is_empty(),

            Self::Branch { .. } => false,
        }
    }
}
