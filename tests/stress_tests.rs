//! Stress tests: large builds, long update chains, and snapshot reads
//! racing published updates across threads.

#![expect(clippy::unwrap_used, reason = "fail fast in tests")]

use rayon::prelude::*;
use snaptree::{KeepIncoming, SharedTree, Tree};
use std::cmp::Ordering;

mod common;

fn nat(a: &u64, b: &u64) -> Ordering {
    a.cmp(b)
}

#[test]
fn large_build_default_fan() {
    common::init_tracing();

    let n: u64 = 200_000;
    // reverse order forces the unsorted path
    let tree: Tree<u64> = Tree::build((0..n).rev().collect(), nat, false);

    assert!(tree.is_well_formed(nat));
    assert_eq!(tree.slice_all(true).count(), usize::try_from(n).unwrap());
    for probe in [0, 1, n / 2, n - 1] {
        assert_eq!(tree.find(nat, &probe), Some(&probe));
    }
}

#[test]
fn long_update_chain_small_fan() {
    let mut tree: Tree<u64, 4> = Tree::empty();

    for round in 0..200u64 {
        let batch: Vec<u64> = (0..50).map(|i| round * 50 + i).collect();
        tree = tree.update(nat, batch, true);
    }

    assert!(tree.is_well_formed(nat));
    assert_eq!(tree.slice_all(true).count(), 10_000);
}

#[test]
fn overlapping_updates_replace_not_duplicate() {
    let mut tree: Tree<u64, 4> = Tree::build((0..1000).collect(), nat, true);

    // every round rewrites a window straddling existing keys
    for start in (0..1000u64).step_by(100) {
        let batch: Vec<u64> = (start..start + 150).collect();
        tree = tree.update(nat, batch, true);
    }

    assert!(tree.is_well_formed(nat));
    assert_eq!(tree.slice_all(true).count(), 1050);
}

#[test]
fn parallel_readers_see_stable_snapshots() {
    let shared: SharedTree<u64> = SharedTree::new(Tree::build((0..10_000).collect(), nat, true));

    // capture snapshots interleaved with published updates
    let mut snapshots: Vec<(usize, Tree<u64>)> = Vec::new();
    for round in 0..20u64 {
        snapshots.push((usize::try_from(10_000 + round * 100).unwrap(), shared.snapshot()));
        let batch: Vec<u64> = (0..100).map(|i| 1_000_000 + round * 100 + i).collect();
        shared.update(nat, batch, true, KeepIncoming);
    }

    // every snapshot still reads its own point-in-time contents, in
    // parallel, regardless of the updates published after it
    snapshots.par_iter().for_each(|(expected_len, snapshot)| {
        assert_eq!(snapshot.slice_all(true).count(), *expected_len);
        assert!(snapshot.is_well_formed(nat));
    });

    assert_eq!(shared.snapshot().slice_all(true).count(), 12_000);
}

#[test]
fn concurrent_publishers_all_land() {
    let shared: SharedTree<u64> = SharedTree::new(Tree::empty());

    (0..8u64).into_par_iter().for_each(|worker| {
        for round in 0..10u64 {
            let batch: Vec<u64> = (0..25).map(|i| worker * 10_000 + round * 25 + i).collect();
            shared.update(nat, batch, true, KeepIncoming);
        }
    });

    let tree = shared.snapshot();
    assert!(tree.is_well_formed(nat));
    assert_eq!(tree.slice_all(true).count(), 8 * 10 * 25);
}
