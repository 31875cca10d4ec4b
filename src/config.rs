//! Fan-factor constants and the bounds derived from them.
//!
//! The fan factor `F` is the maximum number of keys any node may hold. It is
//! a power of two so the depth bound below stays a closed form. Every other
//! runtime bound (builder scratch capacity, quick-merge cutoff, path-stack
//! depth) is derived from `F` by the functions in this module.

/// Default fan factor: at most 32 keys per node.
pub const DEFAULT_FAN: usize = 32;

/// Number of bits of key index per level, `log2(fan)`.
#[inline]
#[must_use]
pub const fn fan_shift(fan: usize) -> u32 {
    fan.trailing_zeros()
}

/// Maximum depth of any tree with the given fan factor.
///
/// A depth sufficient to hold `2^31` values: each level below the first
/// contributes at least `fan / 2` children per node, so
/// `max_depth = ceil(31 / (shift - 1))`.
#[must_use]
pub const fn max_depth(fan: usize) -> usize {
    31usize.div_ceil(fan_shift(fan) as usize - 1)
}

/// Size cutoff below which a single-leaf tree is updated by a linear merge
/// instead of the level builder.
#[must_use]
pub const fn quick_merge_limit(fan: usize) -> usize {
    let base = if fan < 16 { fan } else { 16 };
    base * 2
}

/// Capacity of a builder level's key scratch.
///
/// A level may legitimately accumulate `2 * fan` keys before it is forced to
/// spill into its parent; one extra slot lets the overflow check run before
/// the write.
pub(crate) const fn max_build_keys(fan: usize) -> usize {
    1 + 2 * fan
}

/// Capacity of a builder level's child scratch (one more than keys).
pub(crate) const fn max_build_children(fan: usize) -> usize {
    2 + 2 * fan
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_fan_bounds() {
        assert_eq!(fan_shift(DEFAULT_FAN), 5);
        assert_eq!(max_depth(DEFAULT_FAN), 8);
        assert_eq!(quick_merge_limit(DEFAULT_FAN), 32);
    }

    #[test]
    fn small_fan_bounds() {
        // fan = 4 is the smallest legal configuration
        assert_eq!(fan_shift(4), 2);
        assert_eq!(max_depth(4), 31);
        assert_eq!(quick_merge_limit(4), 8);
    }

    #[test]
    fn scratch_capacities() {
        assert_eq!(max_build_keys(4), 9);
        assert_eq!(max_build_children(4), 10);
        assert_eq!(max_build_keys(32), 65);
    }

    #[test]
    fn quick_merge_limit_saturates() {
        // beyond fan = 16 the cutoff stops growing
        assert_eq!(quick_merge_limit(16), 32);
        assert_eq!(quick_merge_limit(64), 32);
        assert_eq!(quick_merge_limit(256), 32);
    }
}
