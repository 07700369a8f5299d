//! Single-threaded Needleman-Wunsch backend.

use indicatif::ProgressBar;

use super::pairs::Pair;
use super::{Algorithm, Score};
use crate::db::Database;
use crate::encode::{SequenceView, PADDING};
use crate::error::Result;
use crate::scoring::ScoringTable;

/// Globally aligns two sequences with a rolling one-row dynamic program.
/// `one` must be the longer sequence so the row buffer is bounded by the
/// shorter one. A padding symbol ends the remaining work early: rows past
/// the end of `one` are skipped, and padded columns of `two` carry the
/// diagonal value through unchanged.
pub(super) fn align_pair(one: SequenceView<'_>, two: SequenceView<'_>, table: &ScoringTable) -> Score {
    let penalty = table.penalty();
    let mut line: Vec<Score> = (0..=two.len()).map(|j| -(j as Score) * penalty).collect();

    for i in 0..one.len() {
        if one.symbol(i) == PADDING {
            break;
        }

        let mut done = line[0];
        line[0] = -((i + 1) as Score) * penalty;

        for j in 1..=two.len() {
            let mut value = line[j - 1];

            if two.symbol(j - 1) != PADDING {
                let matched = done + table.score(one.symbol(i), two.symbol(j - 1));
                let inserted = value - penalty;
                let removed = line[j] - penalty;
                value = matched.max(inserted).max(removed);
            }

            done = line[j];
            line[j] = value;
        }
    }

    line[two.len()]
}

/// The CPU algorithm: no parallelism beyond the cluster-level pair
/// distribution.
pub struct Sequential;

impl Algorithm for Sequential {
    fn align(
        &self,
        pairs: &[Pair],
        db: &Database,
        table: &ScoringTable,
        progress: &ProgressBar,
    ) -> Result<Vec<Score>> {
        let mut scores = Vec::with_capacity(pairs.len());
        for pair in pairs {
            let one = db.sequence(pair.high() as usize);
            let two = db.sequence(pair.low() as usize);

            let score = if one.len() >= two.len() {
                align_pair(one, two, table)
            } else {
                align_pair(two, one, table)
            };

            scores.push(score);
            progress.inc(1);
        }
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::Sequence;
    use crate::scoring;

    fn score_of(one: &[u8], two: &[u8]) -> Score {
        let table = scoring::make("blosum62").unwrap();
        let a = Sequence::encode(one);
        let b = Sequence::encode(two);
        if a.len() >= b.len() {
            align_pair(a.as_view(), b.as_view(), &table)
        } else {
            align_pair(b.as_view(), a.as_view(), &table)
        }
    }

    #[test]
    fn identical_sequences_score_the_identity_diagonal() {
        assert_eq!(score_of(b"AAAA", b"AAAA"), 16.0);
        assert_eq!(score_of(b"WW", b"WW"), 22.0);
    }

    #[test]
    fn empty_versus_one_residue_pays_one_gap() {
        assert_eq!(score_of(b"", b"A"), -4.0);
        assert_eq!(score_of(b"A", b""), -4.0);
    }

    #[test]
    fn both_empty_scores_zero() {
        assert_eq!(score_of(b"", b""), 0.0);
    }

    #[test]
    fn mismatched_pair_uses_the_substitution_matrix() {
        // A-G = 0, C-T = -1 under blosum62.
        assert_eq!(score_of(b"AC", b"GT"), -1.0);
        assert_eq!(score_of(b"AC", b"AC"), 4.0 + 9.0);
    }

    #[test]
    fn explicit_padding_terminates_scoring_early() {
        assert_eq!(score_of(b"ACTG***", b"ACTG"), score_of(b"ACTG", b"ACTG"));
        assert_eq!(score_of(b"ACTG**", b"AC"), score_of(b"ACTG", b"AC"));
    }

    #[test]
    fn gap_runs_cost_linearly() {
        // Aligning AAAA against AA: two matches and two gap columns.
        assert_eq!(score_of(b"AAAA", b"AA"), 8.0 - 8.0);
    }
}
