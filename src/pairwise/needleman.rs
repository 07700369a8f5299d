//! Block-parallel Needleman-Wunsch backend.
//!
//! The device tier of the engine: rank-local pairs are carved into blocks of
//! 32 lanes, each block runs on its own worker with a private copy of the
//! device scoring table, and every lane rolls one DP row with the longer
//! sequence on the row axis so the workspace is bounded by the shorter one.
//! Numeric semantics are identical to the sequential backend, including the
//! early exit on the padding symbol.

use indicatif::ProgressBar;
use rayon::prelude::*;

use super::pairs::Pair;
use super::{Algorithm, Score};
use crate::db::Database;
use crate::encode::{SequenceView, PADDING};
use crate::error::{Error, Result};
use crate::scoring::{DeviceTable, ScoringTable};

/// Lanes per block; each lane aligns one pair.
const BLOCK_LANES: usize = 32;

/// Row workspace available to one block, in bytes.
const WORKSPACE_BUDGET: usize = 256 << 20;

fn kernel(one: SequenceView<'_>, two: SequenceView<'_>, table: &DeviceTable) -> Score {
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

fn align_lane(pair: Pair, db: &Database, table: &DeviceTable) -> Score {
    let one = db.sequence(pair.high() as usize);
    let two = db.sequence(pair.low() as usize);

    if one.len() >= two.len() {
        kernel(one, two, table)
    } else {
        kernel(two, one, table)
    }
}

/// The block-parallel algorithm.
pub struct Needleman;

impl Needleman {
    /// Rejects workloads whose row workspace would not fit a block's budget.
    fn check_workspace(&self, pairs: &[Pair], db: &Database) -> Result<()> {
        let widest = pairs
            .iter()
            .map(|pair| {
                db.sequence(pair.high() as usize)
                    .len()
                    .min(db.sequence(pair.low() as usize).len())
            })
            .max()
            .unwrap_or(0);

        let needed = BLOCK_LANES * (widest + 1) * std::mem::size_of::<Score>();
        if needed > WORKSPACE_BUDGET {
            return Err(Error::DeviceOutOfMemory { needed, budget: WORKSPACE_BUDGET });
        }
        Ok(())
    }
}

impl Algorithm for Needleman {
    fn align(
        &self,
        pairs: &[Pair],
        db: &Database,
        table: &ScoringTable,
        progress: &ProgressBar,
    ) -> Result<Vec<Score>> {
        self.check_workspace(pairs, db)?;

        let device = table.to_device();

        let scores: Vec<Score> = pairs
            .par_chunks(BLOCK_LANES)
            .flat_map_iter(|block| {
                // Each block works from its own copy of the device table.
                let table = device;
                let scores: Vec<Score> =
                    block.iter().map(|&pair| align_lane(pair, db, &table)).collect();
                progress.inc(block.len() as u64);
                scores
            })
            .collect();

        Ok(scores)
    }
}
