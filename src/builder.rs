//! Filepath: src/builder.rs
//!
//! Bulk build/update machinery for the persistent B-Tree.
//!
//! A [`Builder`] holds one [`Level`] of scratch state per tree level, linked
//! parent/child like a stack that can grow in both directions: downward when
//! the merge descends into a subtree, upward when a level overflows and must
//! spill a finished node into a (possibly brand-new) parent. An update walks
//! the original tree in key order exactly once, copying only the spine the
//! incoming keys actually touch; untouched subtrees move into the new tree
//! by reference.
//!
//! The per-level dispatch mirrors the three outcomes of placing one key:
//! consumed here, retry in a child that owns the key's range, or retry in
//! the parent because the key lies past this level's upper bound.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::bound::Bound;
use crate::config::{max_build_children, max_build_keys, max_depth, DEFAULT_FAN};
use crate::ksearch;
use crate::node::Node;
use crate::tracing_helpers::{debug_log, trace_log};

// ============================================================================
//  ReplaceFn
// ============================================================================

/// Hook applied to every key an update writes into the new tree.
///
/// `merge` runs when the incoming key matched an existing one; `insert` runs
/// on a pure insertion. Implementations may maintain external bookkeeping
/// (size counters, secondary indexes) but the returned value must compare
/// equal to the incoming one under the tree's comparator.
pub trait ReplaceFn<V> {
    /// Combine an existing value with the incoming one; the result replaces
    /// the existing value in the new tree.
    fn merge(&mut self, existing: &V, incoming: V) -> V;

    /// Admit a value with no existing counterpart.
    fn insert(&mut self, incoming: V) -> V;
}

/// The right projection: incoming values always win, insertions pass
/// through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepIncoming;

impl<V> ReplaceFn<V> for KeepIncoming {
    #[inline]
    fn merge(&mut self, _existing: &V, incoming: V) -> V {
        incoming
    }

    #[inline]
    fn insert(&mut self, incoming: V) -> V {
        incoming
    }
}

/// Adapts a closure of shape `|existing: Option<&V>, incoming: V| -> V`
/// into a replace hook: `existing` is `Some` on a match and `None` on a
/// pure insertion.
#[derive(Debug, Clone, Copy)]
pub struct ReplaceWith<G>(pub G);

impl<V, G> ReplaceFn<V> for ReplaceWith<G>
where
    G: FnMut(Option<&V>, V) -> V,
{
    #[inline]
    fn merge(&mut self, existing: &V, incoming: V) -> V {
        (self.0)(Some(existing), incoming)
    }

    #[inline]
    fn insert(&mut self, incoming: V) -> V {
        (self.0)(None, incoming)
    }
}

// ============================================================================
//  Placement
// ============================================================================

/// Outcome of offering one key to a level.
enum Placement<V> {
    /// The key was written into this level's scratch.
    Consumed,

    /// The key belongs to a child range; retry there.
    Descend { child: usize, key: Bound<V> },

    /// The key lies past this level's upper bound; this level has been
    /// finished into the parent, retry there.
    Ascend { parent: usize, key: Bound<V> },
}

// ============================================================================
//  Level
// ============================================================================

/// Scratch state for one level of an in-progress build.
struct Level<V> {
    /// Level above, if one has been allocated.
    parent: Option<usize>,

    /// Level below, if one has been allocated.
    child: Option<usize>,

    /// Keys accumulated for the node(s) under construction at this level.
    build_keys: Vec<V>,

    /// Children accumulated alongside `build_keys`; unused at leaf levels.
    build_children: Vec<Arc<Node<V>>>,

    /// The original node this level is mirroring; `None` when the level is
    /// dormant.
    copy_from: Option<Arc<Node<V>>>,

    /// First key of `copy_from` not yet copied into `build_keys`.
    copy_key_pos: usize,

    /// First child of `copy_from` not yet copied into `build_children`.
    copy_child_pos: usize,

    /// Strict upper bound of the key range this level currently owns.
    /// `None` marks a dormant level, distinct from `Some(PosInf)` at the
    /// root.
    upper_bound: Option<Bound<V>>,
}

impl<V> Level<V> {
    fn with_capacity(fan: usize) -> Self {
        Self {
            parent: None,
            child: None,
            build_keys: Vec::with_capacity(max_build_keys(fan)),
            build_children: Vec::with_capacity(max_build_children(fan)),
            copy_from: None,
            copy_key_pos: 0,
            copy_child_pos: 0,
            upper_bound: None,
        }
    }
}

// ============================================================================
//  Builder
// ============================================================================

/// Reusable scratch for [`Tree::build`] and [`Tree::update`].
///
/// A builder is single-threaded: it may be reused across any number of
/// operations, but never shared between concurrent ones. [`Builder::clear`]
/// drops all borrowed subtree references while keeping scratch capacity, so
/// a long-lived builder amortizes allocation across updates.
///
/// [`Tree::build`]: crate::Tree::build
/// [`Tree::update`]: crate::Tree::update
pub struct Builder<V, const F: usize = DEFAULT_FAN> {
    /// Level arena; entries link to each other by index and are reused
    /// across operations.
    levels: Vec<Level<V>>,
}

impl<V, const F: usize> Default for Builder<V, F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, const F: usize> Builder<V, F> {
    const FAN_CHECK: () = {
        assert!(F >= 4, "fan factor must be at least 4");

        assert!(F.is_power_of_two(), "fan factor must be a power of two");
    };

    /// Create a builder with no allocated levels.
    #[must_use]
    pub fn new() -> Self {
        let () = Self::FAN_CHECK;

        Self { levels: Vec::new() }
    }

    /// Release every subtree and value reference held in scratch, keeping
    /// the scratch capacity for the next operation.
    pub fn clear(&mut self) {
        for level in &mut self.levels {
            if level.upper_bound.is_some() {
                level.build_keys.clear();
                level.build_children.clear();
                level.copy_from = None;
                level.copy_key_pos = 0;
                level.copy_child_pos = 0;
                level.upper_bound = None;
            }
        }
    }

    /// Allocate a fresh dormant level, enforcing the depth bound.
    fn push_level(&mut self) -> usize {
        assert!(
            self.levels.len() <= max_depth(F),
            "tree depth exceeds the maximum for fan factor {F}"
        );

        self.levels.push(Level::with_capacity(F));
        self.levels.len() - 1
    }

    /// Index of the entry level, allocating it on first use.
    fn entry_level(&mut self) -> usize {
        if self.levels.is_empty() {
            self.push_level();
        }
        0
    }

    /// Point a level at the node it will mirror.
    fn reset(&mut self, lvl: usize, copy_from: Arc<Node<V>>, upper_bound: Bound<V>) {
        let level = &mut self.levels[lvl];
        level.build_keys.clear();
        level.build_children.clear();
        level.copy_from = Some(copy_from);
        level.copy_key_pos = 0;
        level.copy_child_pos = 0;
        level.upper_bound = Some(upper_bound);
    }

    /// The node a level is mirroring.
    #[expect(clippy::expect_used, reason = "callers only address initialized levels")]
    fn source(&self, lvl: usize) -> Arc<Node<V>> {
        Arc::clone(self.levels[lvl].copy_from.as_ref().expect("level is initialized"))
    }

    /// A level is the operation root when no initialized parent sits above
    /// it and its scratch still fits in a single node.
    fn is_root(&self, lvl: usize) -> bool {
        let level = &self.levels[lvl];
        let no_parent = match level.parent {
            None => true,

            Some(p) => self.levels[p].upper_bound.is_none(),
        };
        no_parent && level.build_keys.len() <= F
    }

    /// The child level, allocating (but not initializing) it on demand.
    fn ensure_child(&mut self, lvl: usize) -> usize {
        if let Some(child) = self.levels[lvl].child {
            return child;
        }

        let child = self.push_level();
        self.levels[child].parent = Some(lvl);
        self.levels[lvl].child = Some(child);
        child
    }
}

impl<V: Clone, const F: usize> Builder<V, F> {
    /// The parent level, allocating and initializing it on demand.
    ///
    /// A parent that exists but is dormant is woken with a zero-key branch
    /// to mirror: this is how the original root spills into a brand-new one.
    fn ensure_parent(&mut self, lvl: usize) -> usize {
        let parent = match self.levels[lvl].parent {
            Some(p) => p,

            None => {
                let p = self.push_level();
                self.levels[p].child = Some(lvl);
                self.levels[lvl].parent = Some(p);
                p
            }
        };

        if self.levels[parent].upper_bound.is_none() {
            let upper = self.upper_bound_of(lvl);
            self.reset(parent, Node::empty_branch(), upper);
        }
        parent
    }

    /// Clone of a level's current upper bound.
    #[expect(clippy::expect_used, reason = "callers only address initialized levels")]
    fn upper_bound_of(&self, lvl: usize) -> Bound<V> {
        self.levels[lvl]
            .upper_bound
            .clone()
            .expect("level is initialized")
    }

    // ========================================================================
    //  Merge primitives
    // ========================================================================

    /// Bulk-copy keys of the mirrored node up to `to` (exclusive) into this
    /// level's scratch.
    fn copy_keys(&mut self, lvl: usize, to: usize, node: &Node<V>) {
        let from = self.levels[lvl].copy_key_pos;
        if from >= to {
            return;
        }

        let len = to - from;
        debug_assert!(len <= F, "copy range exceeds one node");

        let next = self.levels[lvl].build_keys.len() + len;
        self.ensure_room(lvl, next, node.is_leaf());

        let level = &mut self.levels[lvl];
        level.build_keys.extend(node.keys()[from..to].iter().cloned());
        level.copy_key_pos = to;
    }

    /// Emit one key in place of the next not-yet-copied key of the mirrored
    /// node.
    fn replace_next_key<R>(&mut self, lvl: usize, incoming: V, node: &Node<V>, replace: &mut R)
    where
        R: ReplaceFn<V>,
    {
        let next = self.levels[lvl].build_keys.len() + 1;
        self.ensure_room(lvl, next, node.is_leaf());

        let level = &mut self.levels[lvl];
        let kept = replace.merge(&node.keys()[level.copy_key_pos], incoming);
        level.build_keys.push(kept);
        level.copy_key_pos += 1;
    }

    /// Emit one key with no counterpart in the mirrored node.
    fn add_new_key<R>(&mut self, lvl: usize, incoming: V, is_leaf: bool, replace: &mut R)
    where
        R: ReplaceFn<V>,
    {
        let next = self.levels[lvl].build_keys.len() + 1;
        self.ensure_room(lvl, next, is_leaf);

        let admitted = replace.insert(incoming);
        self.levels[lvl].build_keys.push(admitted);
    }

    /// Bulk-copy children of the mirrored node up to `to` (exclusive).
    ///
    /// No room check: children always trail the key additions that made
    /// space for them.
    fn copy_children(&mut self, lvl: usize, to: usize, node: &Node<V>) {
        let from = self.levels[lvl].copy_child_pos;
        if from >= to {
            return;
        }

        let level = &mut self.levels[lvl];
        level
            .build_children
            .extend(node.children()[from..to].iter().map(Arc::clone));
        level.copy_child_pos = to;
    }

    /// Append an unexpected extra child with the key that bounds it; called
    /// on behalf of a child level that overflowed.
    fn add_extra_child(&mut self, lvl: usize, child: Arc<Node<V>>, key_above: V) {
        let next = self.levels[lvl].build_keys.len() + 1;
        self.ensure_room(lvl, next, false);

        let level = &mut self.levels[lvl];
        level.build_keys.push(key_above);
        level.build_children.push(child);
    }

    /// Append the replacement for an expected child; called by a child
    /// level as it finishes.
    fn finish_child(&mut self, lvl: usize, child: Arc<Node<V>>) {
        let level = &mut self.levels[lvl];
        level.build_children.push(child);
        level.copy_child_pos += 1;
    }

    /// Spill the first `F` keys (and `F + 1` children) into the parent if
    /// the pending addition would overflow this level's scratch.
    fn ensure_room(&mut self, lvl: usize, next_key_count: usize, is_leaf: bool) {
        if next_key_count < max_build_keys(F) {
            return;
        }

        trace_log!(level = lvl, "scratch overflow, spilling up");

        let flushed = self.take_node(lvl, F, is_leaf);
        let separator = self.levels[lvl].build_keys.remove(0);
        let parent = self.ensure_parent(lvl);
        self.add_extra_child(parent, flushed, separator);
    }

    /// Materialize an immutable node from the first `key_count` keys (and
    /// `key_count + 1` children for a branch), draining them from scratch.
    fn take_node(&mut self, lvl: usize, key_count: usize, is_leaf: bool) -> Arc<Node<V>> {
        let level = &mut self.levels[lvl];
        let keys: Vec<V> = level.build_keys.drain(..key_count).collect();

        if is_leaf {
            Arc::new(Node::leaf(keys))
        } else {
            let children: Vec<Arc<Node<V>>> =
                level.build_children.drain(..=key_count).collect();
            Arc::new(Node::branch(keys, children))
        }
    }

    /// Finish this level into its parent: a single node if the scratch fits,
    /// otherwise a midpoint split whose separator moves up. Returns the
    /// parent level.
    fn ascend(&mut self, lvl: usize) -> usize {
        let parent = self.ensure_parent(lvl);
        let is_leaf = self.source(lvl).is_leaf();
        let key_count = self.levels[lvl].build_keys.len();

        if key_count > F {
            let mid = key_count / 2;
            let left = self.take_node(lvl, mid, is_leaf);
            let separator = self.levels[lvl].build_keys.remove(0);
            self.add_extra_child(parent, left, separator);

            let remaining = self.levels[lvl].build_keys.len();
            let right = self.take_node(lvl, remaining, is_leaf);
            self.finish_child(parent, right);
        } else {
            let node = self.take_node(lvl, key_count, is_leaf);
            self.finish_child(parent, node);
        }
        parent
    }

    /// Ascend until the current level is a valid operation root.
    fn ascend_to_root(&mut self, mut lvl: usize) -> usize {
        while !self.is_root(lvl) {
            lvl = self.ascend(lvl);
        }
        lvl
    }

    /// Materialize the finished root node; must be called on the operation
    /// root.
    fn to_node(&mut self, lvl: usize) -> Arc<Node<V>> {
        let key_count = self.levels[lvl].build_keys.len();
        debug_assert!(key_count > 0 && key_count <= F, "root scratch out of range");

        let is_leaf = self.source(lvl).is_leaf();
        self.take_node(lvl, key_count, is_leaf)
    }

    // ========================================================================
    //  Per-level dispatch
    // ========================================================================

    /// Offer one key to a level, copying everything that precedes it from
    /// the mirrored node on the way.
    fn apply<C, R>(&mut self, lvl: usize, key: Bound<V>, cmp: &C, replace: &mut R) -> Placement<V>
    where
        C: Fn(&V, &V) -> Ordering,
        R: ReplaceFn<V>,
    {
        let node = self.source(lvl);
        let key_end = node.key_end();
        let from = self.levels[lvl].copy_key_pos;

        let search = ksearch::find_in(node.keys(), from, key_end, |slot| {
            key.compare_to_value(slot, cmp)
        });
        let (index, found) = match search {
            Ok(i) => (i, true),

            Err(i) => (i, false),
        };

        // This level owns the key iff the key orders strictly below the
        // level's upper bound; an insertion point past the last key is the
        // only position where that can fail.
        let mut owns = true;
        if !found && index == key_end {
            let level = &self.levels[lvl];
            #[expect(clippy::expect_used, reason = "callers only address initialized levels")]
            let upper = level.upper_bound.as_ref().expect("level is initialized");
            if upper.compare(&key, cmp) != Ordering::Greater {
                owns = false;
            }
        }

        if node.is_leaf() {
            self.copy_keys(lvl, index, &node);

            if owns {
                let Bound::Value(value) = key else {
                    unreachable!("sentinels are never owned by a level")
                };
                if found {
                    self.replace_next_key(lvl, value, &node, replace);
                } else {
                    self.add_new_key(lvl, value, true, replace);
                }
                return Placement::Consumed;
            }
            // Not owned: everything in this leaf is already copied (the
            // insertion point is the key end), so fall through and ascend.
        } else if found {
            // The subtree right of a replaced branch key is untouched.
            self.copy_keys(lvl, index, &node);
            let Bound::Value(value) = key else {
                unreachable!("sentinels are never owned by a level")
            };
            self.replace_next_key(lvl, value, &node, replace);
            self.copy_children(lvl, index + 1, &node);
            return Placement::Consumed;
        } else if owns {
            self.copy_keys(lvl, index, &node);
            self.copy_children(lvl, index, &node);

            // The key belongs to the owning child's range; descend with the
            // bound that child inherits.
            let next_upper = if index < key_end {
                Bound::Value(node.keys()[index].clone())
            } else {
                self.upper_bound_of(lvl)
            };
            let descend_into = Arc::clone(&node.children()[index]);

            let child = self.ensure_child(lvl);
            self.reset(child, descend_into, next_upper);
            return Placement::Descend { child, key };
        } else {
            self.copy_keys(lvl, key_end, &node);
            // A branch holds exactly one more child than keys.
            self.copy_children(lvl, key_end + 1, &node);
        }

        if key.is_pos_inf() && self.is_root(lvl) {
            return Placement::Consumed;
        }

        let parent = self.ascend(lvl);
        Placement::Ascend { parent, key }
    }

    /// Drive one key through the levels until some level consumes it.
    /// Returns the level the next key should start from.
    fn dispatch<C, R>(&mut self, mut lvl: usize, mut key: Bound<V>, cmp: &C, replace: &mut R) -> usize
    where
        C: Fn(&V, &V) -> Ordering,
        R: ReplaceFn<V>,
    {
        loop {
            match self.apply(lvl, key, cmp, replace) {
                Placement::Consumed => return lvl,

                Placement::Descend { child, key: k } => {
                    lvl = child;
                    key = k;
                }

                Placement::Ascend { parent, key: k } => {
                    lvl = parent;
                    key = k;
                }
            }
        }
    }

    // ========================================================================
    //  Drivers
    // ========================================================================

    /// Merge sorted `incoming` into `root`, producing a new root that shares
    /// every untouched subtree with the old one.
    ///
    /// Returns `None` iff `terminate` reported true before some key was
    /// placed; the partial build is abandoned and `root` is unaffected.
    pub(crate) fn update<C, R, T>(
        &mut self,
        root: &Arc<Node<V>>,
        cmp: &C,
        incoming: Vec<V>,
        replace: &mut R,
        terminate: &mut T,
    ) -> Option<Arc<Node<V>>>
    where
        C: Fn(&V, &V) -> Ordering,
        R: ReplaceFn<V>,
        T: FnMut() -> bool,
    {
        debug_log!(incoming = incoming.len(), "bulk update");

        self.clear();
        let entry = self.entry_level();
        self.reset(entry, Arc::clone(root), Bound::PosInf);

        let mut current = entry;
        for value in incoming {
            if terminate() {
                debug_log!("update terminated early");
                self.clear();
                return None;
            }
            current = self.dispatch(current, Bound::Value(value), cmp, replace);
        }

        // Drive +inf through the spine: every level copies its remainder
        // and finishes into its parent, up to the operation root.
        current = self.dispatch(current, Bound::PosInf, cmp, replace);
        current = self.ascend_to_root(current);

        let new_root = self.to_node(current);
        self.clear();
        Some(new_root)
    }

    /// Build a tree from a sorted stream of at least `F` values.
    pub(crate) fn build(&mut self, source: Vec<V>) -> Arc<Node<V>> {
        debug_log!(size = source.len(), "bulk build");

        self.clear();
        let entry = self.entry_level();
        self.reset(entry, Node::empty_leaf(), Bound::PosInf);

        let mut keep = KeepIncoming;
        for value in source {
            self.add_new_key(entry, value, true, &mut keep);
        }

        let root = self.ascend_to_root(entry);
        let new_root = self.to_node(root);
        self.clear();
        new_root
    }
}
