//! Property-based tests for cursors: ordering and range correctness.
//!
//! The oracle is a sorted `Vec` filtered with plain comparisons.

use proptest::prelude::*;
use snaptree::Tree;

mod common;

/// Small fan so trees are several levels deep at modest sizes.
const FAN: usize = 4;

// ============================================================================
//  Strategies
// ============================================================================

fn keys(max_count: usize) -> impl Strategy<Value = Vec<i32>> {
    prop::collection::btree_set(-400..400i32, 0..=max_count)
        .prop_map(|s| s.into_iter().collect::<Vec<i32>>())
        .prop_shuffle()
}

fn tree_of(keys: Vec<i32>) -> Tree<i32, FAN> {
    Tree::build(keys, i32::cmp, false)
}

/// What a range cursor must yield, computed the slow way.
fn range_oracle(
    sorted: &[i32],
    lo: i32,
    lo_inclusive: bool,
    hi: i32,
    hi_inclusive: bool,
) -> Vec<i32> {
    sorted
        .iter()
        .copied()
        .filter(|&v| {
            let above = if lo_inclusive { v >= lo } else { v > lo };
            let below = if hi_inclusive { v <= hi } else { v < hi };
            above && below
        })
        .collect()
}

// ============================================================================
//  Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// P3: a full forward cursor is strictly increasing and complete;
    /// the reverse cursor is its mirror image.
    #[test]
    fn full_cursors_are_ordered(base in keys(250)) {
        common::init_tracing();

        let tree = tree_of(base.clone());
        let mut expected = base;
        expected.sort_unstable();

        let forward: Vec<i32> = tree.slice_all(true).copied().collect();
        prop_assert_eq!(&forward, &expected);
        prop_assert!(forward.windows(2).all(|w| w[0] < w[1]));

        let mut reverse: Vec<i32> = tree.slice_all(false).copied().collect();
        reverse.reverse();
        prop_assert_eq!(reverse, expected);
    }

    /// P4: range cursors yield exactly the oracle's slice, for every
    /// combination of inclusivity, in both directions.
    #[test]
    fn range_cursors_match_oracle(
        base in keys(250),
        lo in -450..450i32,
        hi in -450..450i32,
        lo_inclusive: bool,
        hi_inclusive: bool,
    ) {
        prop_assume!(lo <= hi);

        let tree = tree_of(base.clone());
        let mut sorted = base;
        sorted.sort_unstable();
        let expected = range_oracle(&sorted, lo, lo_inclusive, hi, hi_inclusive);

        let forward: Vec<i32> = tree
            .slice_bounds(i32::cmp, lo, lo_inclusive, hi, hi_inclusive, true)
            .copied()
            .collect();
        prop_assert_eq!(&forward, &expected);

        let mut reverse: Vec<i32> = tree
            .slice_bounds(i32::cmp, lo, lo_inclusive, hi, hi_inclusive, false)
            .copied()
            .collect();
        reverse.reverse();
        prop_assert_eq!(reverse, expected);
    }

    /// The inclusive convenience form equals the explicit form.
    #[test]
    fn slice_is_inclusive_slice_bounds(base in keys(150), lo in -450..450i32, hi in -450..450i32) {
        prop_assume!(lo <= hi);

        let tree = tree_of(base);

        let via_slice: Vec<i32> = tree.slice(i32::cmp, lo, hi, true).copied().collect();
        let via_bounds: Vec<i32> = tree
            .slice_bounds(i32::cmp, lo, true, hi, true, true)
            .copied()
            .collect();
        prop_assert_eq!(via_slice, via_bounds);
    }

    /// Cursors are restartable: a second cursor over the same tree yields
    /// the same sequence.
    #[test]
    fn cursors_are_restartable(base in keys(150), lo in -450..450i32, hi in -450..450i32) {
        prop_assume!(lo <= hi);

        let tree = tree_of(base);

        let first: Vec<i32> = tree.slice(i32::cmp, lo, hi, true).copied().collect();
        let second: Vec<i32> = tree.slice(i32::cmp, lo, hi, true).copied().collect();
        prop_assert_eq!(first, second);
    }

    /// An empty range (`lo == hi` with an exclusive end) yields nothing.
    #[test]
    fn point_ranges_respect_exclusivity(base in keys(150), point in -400..400i32) {
        let tree = tree_of(base.clone());
        let present = base.contains(&point);

        let closed: Vec<i32> = tree.slice(i32::cmp, point, point, true).copied().collect();
        if present {
            prop_assert_eq!(closed, vec![point]);
        } else {
            prop_assert!(closed.is_empty());
        }

        let half_open: Vec<i32> = tree
            .slice_bounds(i32::cmp, point, true, point, false, true)
            .copied()
            .collect();
        prop_assert!(half_open.is_empty());
    }
}
