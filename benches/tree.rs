//! Benchmarks for `Tree` bulk operations using Divan.
//!
//! Run with: `cargo bench --bench tree`

use divan::{black_box, Bencher};
use snaptree::Tree;
use std::cmp::Ordering;

fn main() {
    divan::main();
}

fn nat(a: &u64, b: &u64) -> Ordering {
    a.cmp(b)
}

fn tree_of(n: u64) -> Tree<u64> {
    Tree::build((0..n).collect(), nat, true)
}

// =============================================================================
// Build
// =============================================================================

#[divan::bench_group]
mod build {
    use super::{black_box, nat, Bencher, Tree};

    #[divan::bench(args = [100, 10_000, 1_000_000])]
    fn sorted(bencher: Bencher, n: u64) {
        bencher
            .with_inputs(|| (0..n).collect::<Vec<u64>>())
            .bench_values(|source| Tree::<u64>::build(black_box(source), nat, true));
    }

    #[divan::bench(args = [100, 10_000, 1_000_000])]
    fn unsorted(bencher: Bencher, n: u64) {
        bencher
            .with_inputs(|| (0..n).rev().collect::<Vec<u64>>())
            .bench_values(|source| Tree::<u64>::build(black_box(source), nat, false));
    }
}

// =============================================================================
// Update
// =============================================================================

#[divan::bench_group]
mod update {
    use super::{black_box, nat, tree_of, Bencher, Tree};

    /// Single-leaf tree, small batch: the quick-merge fast path.
    #[divan::bench]
    fn quick_merge(bencher: Bencher) {
        let tree: Tree<u64> = Tree::build(vec![10, 20, 30, 40], nat, true);

        bencher
            .with_inputs(|| vec![15, 25])
            .bench_values(|batch| tree.update(nat, black_box(batch), true));
    }

    /// Narrow batch against a large tree: most subtrees move by reference.
    #[divan::bench(args = [10, 1_000])]
    fn sparse_batch(bencher: Bencher, batch: u64) {
        let tree = tree_of(1_000_000);

        bencher
            .with_inputs(|| (0..batch).map(|i| i * (1_000_000 / batch)).collect::<Vec<u64>>())
            .bench_values(|incoming| tree.update(nat, black_box(incoming), true));
    }

    /// Batch of fresh keys appended past the existing range.
    #[divan::bench]
    fn append_batch(bencher: Bencher) {
        let tree = tree_of(100_000);

        bencher
            .with_inputs(|| (100_000..101_000).collect::<Vec<u64>>())
            .bench_values(|incoming| tree.update(nat, black_box(incoming), true));
    }
}

// =============================================================================
// Read paths
// =============================================================================

#[divan::bench_group]
mod read {
    use super::{black_box, nat, tree_of, Bencher};

    #[divan::bench]
    fn find_hit(bencher: Bencher) {
        let tree = tree_of(1_000_000);

        bencher.bench(|| tree.find(nat, black_box(&499_999)));
    }

    #[divan::bench]
    fn find_miss(bencher: Bencher) {
        let tree = tree_of(1_000_000);

        bencher.bench(|| tree.find(nat, black_box(&2_000_000)));
    }

    #[divan::bench]
    fn full_scan(bencher: Bencher) {
        let tree = tree_of(100_000);

        bencher.bench(|| tree.slice_all(true).count());
    }

    #[divan::bench]
    fn range_scan(bencher: Bencher) {
        let tree = tree_of(100_000);

        bencher.bench(|| tree.slice(nat, black_box(25_000), black_box(75_000), true).count());
    }

    #[divan::bench]
    fn reverse_scan(bencher: Bencher) {
        let tree = tree_of(100_000);

        bencher.bench(|| tree.slice_all(false).count());
    }
}
