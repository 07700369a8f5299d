//! Work-pair enumeration and rank partitioning.
//!
//! Pairs are enumerated in canonical `(high, low)` order: (1,0), (2,0),
//! (2,1), (3,0)… Rank `r` of a `w`-rank world takes every pair whose index
//! `k` satisfies `k ≡ r (mod w)`, which balances the load within one pair
//! per rank while preserving in-rank order for positional gathering.

/// An unordered pair of database indices, canonicalized so `low < high`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pair {
    low: u32,
    high: u32,
}

impl Pair {
    /// Canonicalizes `(one, two)` regardless of argument order.
    ///
    /// # Panics
    ///
    /// Panics if `one == two`; a sequence is never paired with itself.
    pub fn new(one: u32, two: u32) -> Self {
        assert_ne!(one, two, "a pair needs two distinct sequences");
        Pair { low: one.min(two), high: one.max(two) }
    }

    #[inline]
    pub fn low(&self) -> u32 {
        self.low
    }

    #[inline]
    pub fn high(&self) -> u32 {
        self.high
    }

    /// The pair's position in canonical enumeration order.
    #[inline]
    pub fn index(&self) -> usize {
        let high = self.high as usize;
        high * (high - 1) / 2 + self.low as usize
    }
}

/// Number of distinct pairs over `count` sequences.
#[inline]
pub fn total(count: usize) -> usize {
    count * count.saturating_sub(1) / 2
}

/// All pairs over `count` sequences in canonical order.
pub fn generate(count: usize) -> impl Iterator<Item = Pair> {
    (1..count as u32).flat_map(|high| (0..high).map(move |low| Pair { low, high }))
}

/// The pairs assigned to `rank` out of `world` ranks, in canonical order.
pub fn partition(count: usize, rank: usize, world: usize) -> Vec<Pair> {
    generate(count)
        .enumerate()
        .filter(|(k, _)| k % world == rank)
        .map(|(_, pair)| pair)
        .collect()
}

/// How many pairs `rank` owns; the counterpart of [`partition`] used when
/// reassembling gathered results positionally.
pub fn quota(count: usize, rank: usize, world: usize) -> usize {
    let total = total(count);
    total / world + usize::from(total % world > rank)
}
