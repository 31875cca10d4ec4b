//! A published tree root shared between threads.
//!
//! The tree itself is a pure value: updates return new roots and never touch
//! the old one. What concurrent callers need on top is a place to *publish*
//! the current root and a way to linearize competing publishers. That is all
//! this cell does: readers take snapshots through a briefly-held lock,
//! writers compute their update outside the lock and re-check that the base
//! they started from is still the published root before swapping.

use std::cmp::Ordering;

use parking_lot::RwLock;

use crate::builder::ReplaceFn;
use crate::config::DEFAULT_FAN;
use crate::tree::Tree;

/// A concurrently shared, updatable tree root.
///
/// Readers call [`snapshot`](Self::snapshot) and iterate without further
/// synchronization; the snapshot stays consistent no matter how many updates
/// are published afterwards.
pub struct SharedTree<V, const F: usize = DEFAULT_FAN> {
    root: RwLock<Tree<V, F>>,
}

impl<V, const F: usize> Default for SharedTree<V, F> {
    fn default() -> Self {
        Self::new(Tree::empty())
    }
}

impl<V, const F: usize> SharedTree<V, F> {
    /// Publish an initial tree.
    #[must_use]
    pub fn new(tree: Tree<V, F>) -> Self {
        Self {
            root: RwLock::new(tree),
        }
    }

    /// The currently published tree; a cheap reference-count bump.
    #[must_use]
    pub fn snapshot(&self) -> Tree<V, F> {
        self.root.read().clone()
    }

    /// Publish `next` iff the published root is still `expected`'s root.
    ///
    /// Returns false when another publisher won the race; the caller should
    /// recompute from a fresh snapshot.
    pub fn compare_and_set(&self, expected: &Tree<V, F>, next: Tree<V, F>) -> bool {
        let mut guard = self.root.write();
        if guard.ptr_eq(expected) {
            *guard = next;
            true
        } else {
            false
        }
    }
}

impl<V: Clone, const F: usize> SharedTree<V, F> {
    /// Apply a bulk update to the published tree, retrying against fresh
    /// snapshots until the publish wins. Returns the published result.
    ///
    /// The update itself runs outside any lock; only the root swap is
    /// guarded.
    pub fn update<C, R>(&self, cmp: C, incoming: Vec<V>, sorted: bool, replace: R) -> Tree<V, F>
    where
        C: Fn(&V, &V) -> Ordering,
        R: ReplaceFn<V> + Clone,
    {
        loop {
            let base = self.snapshot();
            let attempt =
                base.update_where(&cmp, incoming.clone(), sorted, replace.clone(), || false);
            let next = match attempt {
                Some(tree) => tree,

                None => unreachable!("update without a terminate hook always completes"),
            };

            if self.compare_and_set(&base, next.clone()) {
                return next;
            }
        }
    }
}
