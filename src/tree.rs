//! Filepath: src/tree.rs
//!
//! The persistent tree value and its public operations.
//!
//! A [`Tree`] is an immutable root node. Updating one returns a *new* tree
//! that shares every unmodified subtree with its predecessor, so snapshots
//! are free: clone the tree (a reference-count bump) and keep reading while
//! newer versions are built and published elsewhere.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::builder::{Builder, KeepIncoming, ReplaceFn};
use crate::config::{quick_merge_limit, DEFAULT_FAN};
use crate::cursor::{Cursor, FullCursor};
use crate::ksearch;
use crate::node::Node;
use crate::tracing_helpers::trace_log;

mod check;

// ============================================================================
//  Tree
// ============================================================================

/// An immutable, persistent B-Tree of comparable values.
///
/// Values double as their own keys: every keyed operation takes a comparator
/// `impl Fn(&V, &V) -> Ordering` imposing a strict total order. The same
/// comparator must be used for every operation over the lifetime of a tree;
/// mixing comparators is not detected and yields nonsense.
///
/// `F` is the fan factor: the maximum number of keys per node, a power of
/// two of at least 4. It is fixed per tree *type*, so trees of different fan
/// never mix.
///
/// # Sharing
///
/// `Clone` is a reference-count bump. A cloned tree is a snapshot: updates
/// applied to either copy never affect the other. Trees are `Send + Sync`
/// whenever `V` is, and readers need no synchronization.
///
/// # Example
///
/// ```
/// use snaptree::Tree;
///
/// let cmp = |a: &u32, b: &u32| a.cmp(b);
/// let tree: Tree<u32> = Tree::build((1..=100).collect(), cmp, true);
/// let bigger = tree.update(cmp, vec![250, 350], false);
///
/// assert_eq!(tree.slice_all(true).count(), 100);
/// assert_eq!(bigger.slice_all(true).count(), 102);
/// assert_eq!(bigger.find(cmp, &350), Some(&350));
/// ```
pub struct Tree<V, const F: usize = DEFAULT_FAN> {
    root: Arc<Node<V>>,
}

impl<V, const F: usize> Clone for Tree<V, F> {
    fn clone(&self) -> Self {
        Self {
            root: Arc::clone(&self.root),
        }
    }
}

impl<V, const F: usize> Default for Tree<V, F> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<V, const F: usize> fmt::Debug for Tree<V, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("fan", &F)
            .field("root_is_leaf", &self.root.is_leaf())
            .field("root_keys", &self.root.key_end())
            .finish_non_exhaustive()
    }
}

impl<V, const F: usize> Tree<V, F> {
    const FAN_CHECK: () = {
        assert!(F >= 4, "fan factor must be at least 4");

        assert!(F.is_power_of_two(), "fan factor must be a power of two");
    };

    /// The empty tree.
    #[must_use]
    pub fn empty() -> Self {
        let () = Self::FAN_CHECK;

        Self {
            root: Node::empty_leaf(),
        }
    }

    /// True when the tree holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_empty_tree()
    }

    /// True when both trees share the same root node.
    ///
    /// This is pointer identity, not structural equality; it is the test a
    /// publisher uses to detect whether the base of a computed update is
    /// still current.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.root, &other.root)
    }

    /// Point lookup: the unique value comparing equal to `key`, if any.
    ///
    /// Descends root to leaf with one binary search per node; no allocation.
    pub fn find<C>(&self, cmp: C, key: &V) -> Option<&V>
    where
        C: Fn(&V, &V) -> Ordering,
    {
        let mut node: &Node<V> = &self.root;

        loop {
            let search = ksearch::find_in(node.keys(), 0, node.key_end(), |slot| cmp(key, slot));

            match search {
                Ok(i) => return Some(&node.keys()[i]),

                Err(i) => {
                    if node.is_leaf() {
                        return None;
                    }
                    node = &node.children()[i];
                }
            }
        }
    }

    /// Cursor over every value, ascending (`forward`) or descending.
    #[must_use]
    pub fn slice_all(&self, forward: bool) -> FullCursor<'_, V, F> {
        Cursor::over_all(&self.root, forward)
    }

    /// Cursor over `[lo, hi]`, both bounds inclusive.
    pub fn slice<C>(&self, cmp: C, lo: V, hi: V, forward: bool) -> Cursor<'_, V, C, F>
    where
        C: Fn(&V, &V) -> Ordering,
    {
        Cursor::over_range(&self.root, cmp, lo, true, hi, true, forward)
    }

    /// Cursor over `lo..hi` with explicit inclusivity on each end.
    pub fn slice_bounds<C>(
        &self,
        cmp: C,
        lo: V,
        lo_inclusive: bool,
        hi: V,
        hi_inclusive: bool,
        forward: bool,
    ) -> Cursor<'_, V, C, F>
    where
        C: Fn(&V, &V) -> Ordering,
    {
        Cursor::over_range(&self.root, cmp, lo, lo_inclusive, hi, hi_inclusive, forward)
    }

    /// Verify the structural invariants and key ordering under `cmp`.
    ///
    /// Intended for tests: production paths do not defend against comparator
    /// inconsistency, this is where it surfaces.
    pub fn is_well_formed<C>(&self, cmp: C) -> bool
    where
        C: Fn(&V, &V) -> Ordering,
    {
        check::well_formed(&self.root, Some(&cmp), F)
    }

    /// Verify the structural invariants only (node sizes, child counts,
    /// uniform child kinds), ignoring key order.
    #[must_use]
    pub fn is_structurally_well_formed(&self) -> bool {
        check::well_formed::<V, fn(&V, &V) -> Ordering>(&self.root, None, F)
    }
}

impl<V: Clone, const F: usize> Tree<V, F> {
    /// Build a tree from a finite collection.
    ///
    /// Pass `sorted = true` only if `source` is already sorted under `cmp`;
    /// otherwise the collection is stably sorted first. Equal values are
    /// all kept, in input order - `build` never collapses duplicates.
    #[must_use]
    pub fn build<C>(source: Vec<V>, cmp: C, sorted: bool) -> Self
    where
        C: Fn(&V, &V) -> Ordering,
    {
        let mut builder = Builder::new();
        Self::build_in(&mut builder, source, cmp, sorted)
    }

    /// [`build`](Self::build) with caller-provided scratch.
    pub fn build_in<C>(builder: &mut Builder<V, F>, mut source: Vec<V>, cmp: C, sorted: bool) -> Self
    where
        C: Fn(&V, &V) -> Ordering,
    {
        let () = Self::FAN_CHECK;

        if !sorted {
            source.sort_by(|a, b| cmp(a, b));
        }

        if source.len() < F {
            return Self {
                root: Arc::new(Node::leaf(source)),
            };
        }

        Self {
            root: builder.build(source),
        }
    }

    /// A new tree with `incoming` inserted, replacing any equal values.
    ///
    /// The receiver is unchanged; subtrees untouched by `incoming` are
    /// shared between both trees. Pass `sorted = true` only if `incoming`
    /// is already sorted under `cmp`.
    #[must_use]
    pub fn update<C>(&self, cmp: C, incoming: Vec<V>, sorted: bool) -> Self
    where
        C: Fn(&V, &V) -> Ordering,
    {
        match self.update_where(cmp, incoming, sorted, KeepIncoming, || false) {
            Some(tree) => tree,

            None => unreachable!("update without a terminate hook always completes"),
        }
    }

    /// [`update`](Self::update) with a replace hook and an early-terminate
    /// predicate.
    ///
    /// `replace` is applied to every key the update writes (two-argument
    /// form on a match, one-argument form on a pure insertion). `terminate`
    /// is polled once per incoming key; returning true abandons the build
    /// and yields `None`, leaving the receiver untouched.
    pub fn update_where<C, R, T>(
        &self,
        cmp: C,
        incoming: Vec<V>,
        sorted: bool,
        replace: R,
        terminate: T,
    ) -> Option<Self>
    where
        C: Fn(&V, &V) -> Ordering,
        R: ReplaceFn<V>,
        T: FnMut() -> bool,
    {
        let mut builder = Builder::new();
        self.update_in(&mut builder, cmp, incoming, sorted, replace, terminate)
    }

    /// [`update_where`](Self::update_where) with caller-provided scratch.
    ///
    /// Threading one [`Builder`] through successive updates amortizes its
    /// scratch allocations, the way a per-worker builder would.
    pub fn update_in<C, R, T>(
        &self,
        builder: &mut Builder<V, F>,
        cmp: C,
        mut incoming: Vec<V>,
        sorted: bool,
        mut replace: R,
        mut terminate: T,
    ) -> Option<Self>
    where
        C: Fn(&V, &V) -> Ordering,
        R: ReplaceFn<V>,
        T: FnMut() -> bool,
    {
        let () = Self::FAN_CHECK;

        if self.is_empty() {
            // every admitted key still passes through the insertion hook
            let admitted: Vec<V> = incoming.into_iter().map(|v| replace.insert(v)).collect();
            return Some(Self::build_in(builder, admitted, cmp, sorted));
        }

        if !sorted {
            // stable, so equal incoming keys keep their order through the
            // replace hook
            incoming.sort_by(|a, b| cmp(a, b));
        }

        if let Node::Leaf(keys) = self.root.as_ref() {
            if keys.len() + incoming.len() < quick_merge_limit(F) {
                trace_log!(
                    existing = keys.len(),
                    incoming = incoming.len(),
                    "quick merge"
                );
                return Some(Self {
                    root: quick_merge::<V, C, R, F>(keys, incoming, &cmp, &mut replace),
                });
            }
        }

        let root = builder.update(&self.root, &cmp, incoming, &mut replace, &mut terminate)?;
        Some(Self { root })
    }
}

// ============================================================================
//  Quick merge
// ============================================================================

/// Single-pass linear merge for a single-leaf tree and a small update set.
///
/// Walks `incoming` once, copying the untouched gaps of the original leaf
/// around it. If the result outgrows one node it splits at an even midpoint
/// into a two-leaf branch - unreachable at the default fan factor, where the
/// quick-merge cutoff keeps results inside one leaf, but required for small
/// fans.
fn quick_merge<V, C, R, const F: usize>(
    leaf: &[V],
    incoming: Vec<V>,
    cmp: &C,
    replace: &mut R,
) -> Arc<Node<V>>
where
    V: Clone,
    C: Fn(&V, &V) -> Ordering,
    R: ReplaceFn<V>,
{
    let key_end = leaf.len();
    let mut merged: Vec<V> = Vec::with_capacity(quick_merge_limit(F));
    let mut offset: usize = 0;

    for value in incoming {
        let search = ksearch::find_in(leaf, offset, key_end, |slot| cmp(&value, slot));

        match search {
            Ok(i) => {
                merged.extend(leaf[offset..i].iter().cloned());
                offset = i + 1;
                merged.push(replace.merge(&leaf[i], value));
            }

            Err(i) => {
                merged.extend(leaf[offset..i].iter().cloned());
                offset = i;
                merged.push(replace.insert(value));
            }
        }
    }
    merged.extend(leaf[offset..key_end].iter().cloned());

    if merged.len() > F {
        // midpoint split, rounded down to an even index
        let mid = (merged.len() >> 1) & !1;
        let right: Vec<V> = merged.split_off(mid + 1);
        let Some(separator) = merged.pop() else {
            unreachable!("split point is within the merged run")
        };

        let children = vec![
            Arc::new(Node::leaf(merged)),
            Arc::new(Node::leaf(right)),
        ];
        return Arc::new(Node::branch(vec![separator], children));
    }

    Arc::new(Node::leaf(merged))
}
