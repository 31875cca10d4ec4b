//! Well-formedness checker.
//!
//! Recursively validates a tree against the structural invariants, and -
//! when a comparator is supplied - the key-ordering invariants, walking with
//! a `(min, max)` bound pair that starts at `(-inf, +inf)` and narrows at
//! each branch key.

use std::cmp::Ordering;

use crate::bound::Bound;
use crate::node::Node;

/// Validate `node` as a root. `cmp = None` checks structure only.
pub(crate) fn well_formed<V, C>(node: &Node<V>, cmp: Option<&C>, fan: usize) -> bool
where
    C: Fn(&V, &V) -> Ordering,
{
    well_formed_in(node, cmp, true, Bound::NegInf, Bound::PosInf, fan)
}

fn well_formed_in<V, C>(
    node: &Node<V>,
    cmp: Option<&C>,
    is_root: bool,
    min: Bound<&V>,
    max: Bound<&V>,
    fan: usize,
) -> bool
where
    C: Fn(&V, &V) -> Ordering,
{
    if let Some(cmp) = cmp {
        if !node_ordered(node, cmp, min.clone(), max.clone()) {
            return false;
        }
    }

    let key_count = node.key_end();
    if key_count > fan {
        return false;
    }
    if !is_root && key_count < fan / 2 {
        return false;
    }

    match node {
        Node::Leaf(_) => true,

        Node::Branch { keys, children } => {
            if children.len() != keys.len() + 1 {
                return false;
            }

            let mut leaves = 0usize;
            let mut branches = 0usize;
            let mut lower = min;

            for (i, child) in children.iter().enumerate() {
                let upper = if i < keys.len() {
                    Bound::Value(&keys[i])
                } else {
                    max.clone()
                };

                if !well_formed_in(child, cmp, false, lower, upper.clone(), fan) {
                    return false;
                }

                if child.is_leaf() {
                    leaves += 1;
                } else {
                    branches += 1;
                }
                lower = upper;
            }

            // all leaves or all branches, never a mix
            leaves == 0 || branches == 0
        }
    }
}

/// Keys strictly increasing, all inside the open interval `(min, max)`.
fn node_ordered<V, C>(node: &Node<V>, cmp: &C, min: Bound<&V>, max: Bound<&V>) -> bool
where
    C: Fn(&V, &V) -> Ordering,
{
    let mut previous = min;

    for current in node.keys() {
        if !strictly_less(&previous, &Bound::Value(current), cmp) {
            return false;
        }
        previous = Bound::Value(current);
    }

    strictly_less(&previous, &max, cmp)
}

fn strictly_less<V, C>(a: &Bound<&V>, b: &Bound<&V>, cmp: &C) -> bool
where
    C: Fn(&V, &V) -> Ordering,
{
    match (a, b) {
        (Bound::PosInf, _) | (_, Bound::NegInf) => false,

        (Bound::NegInf, _) | (_, Bound::PosInf) => true,

        (Bound::Value(x), Bound::Value(y)) => cmp(x, y) == Ordering::Less,
    }
}
