//! Key search inside a node's key range.
//!
//! A single binary search serves point lookup, cursor positioning, and the
//! builder's merge dispatch. The comparator is a closure over the slot value
//! so callers can search with a plain key, a sentinel bound, or anything
//! else that knows how to order itself against stored values.

use std::cmp::Ordering;

/// Binary search for a key over `keys[from..to)`.
///
/// `compare` receives a slot value and returns the ordering of the *search
/// key* relative to it. Returns `Ok(index)` on an exact match and
/// `Err(insertion_point)` otherwise.
///
/// The first slot is probed before the bisection loop: bulk updates walk the
/// tree in key order, so the next incoming key very often falls at or before
/// the first not-yet-consumed slot.
pub(crate) fn find_in<V, C>(keys: &[V], from: usize, to: usize, compare: C) -> Result<usize, usize>
where
    C: Fn(&V) -> Ordering,
{
    if from >= to {
        return Err(from);
    }

    match compare(&keys[from]) {
        Ordering::Equal => return Ok(from),

        Ordering::Less => return Err(from),

        Ordering::Greater => {}
    }

    let mut low: usize = from + 1;
    let mut high: usize = to;

    while low < high {
        let mid: usize = (low + high) >> 1;

        match compare(&keys[mid]) {
            Ordering::Greater => low = mid + 1,

            Ordering::Less => high = mid,

            Ordering::Equal => return Ok(mid),
        }
    }

    Err(low)
}
