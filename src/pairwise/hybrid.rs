//! Runtime backend selection.

use indicatif::ProgressBar;

use super::needleman::Needleman;
use super::pairs::Pair;
use super::sequential::Sequential;
use super::{Algorithm, Score};
use crate::db::Database;
use crate::error::Result;
use crate::scoring::ScoringTable;

/// Minimum rank-local pair count before block dispatch pays off.
const DISPATCH_THRESHOLD: usize = 64;

/// Picks the block backend for large local workloads and the plain CPU
/// backend below the dispatch threshold.
pub struct Hybrid {
    threshold: usize,
}

impl Default for Hybrid {
    fn default() -> Self {
        Hybrid { threshold: DISPATCH_THRESHOLD }
    }
}

impl Algorithm for Hybrid {
    fn align(
        &self,
        pairs: &[Pair],
        db: &Database,
        table: &ScoringTable,
        progress: &ProgressBar,
    ) -> Result<Vec<Score>> {
        if pairs.len() >= self.threshold {
            Needleman.align(pairs, db, table, progress)
        } else {
            Sequential.align(pairs, db, table, progress)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pairwise::pairs;
    use crate::scoring;

    #[test]
    fn both_sides_of_the_threshold_agree() {
        let mut db = Database::new();
        for i in 0..14usize {
            let residues: Vec<u8> = (0..10 + i).map(|j| b"ACDEFGHIKL"[(i + j) % 10]).collect();
            db.push_raw(None, &residues);
        }
        let table = scoring::make("blosum62").unwrap();
        let all: Vec<Pair> = pairs::generate(db.count()).collect();
        assert!(all.len() >= DISPATCH_THRESHOLD);

        let bar = ProgressBar::hidden();
        let above = Hybrid::default().align(&all, &db, &table, &bar).unwrap();
        let below = Hybrid { threshold: usize::MAX }.align(&all, &db, &table, &bar).unwrap();
        assert_eq!(above, below);
    }
}
