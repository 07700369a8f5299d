//! Pairwise distance-matrix engine.
//!
//! Aligns every sequence pair of a database under a scoring table and
//! assembles the full symmetric score matrix on every rank. Backends are
//! name-keyed and hot-swappable; the distribution, gathering and collective
//! error handling live here so each backend only aligns its local pairs.

pub mod distance;
pub mod pairs;

mod hybrid;
mod needleman;
mod sequential;

use std::sync::OnceLock;

use indicatif::{ProgressBar, ProgressStyle};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::cluster::{elevate, Transport};
use crate::db::Database;
use crate::error::{Error, Result};
use crate::scoring::ScoringTable;

pub use distance::DistanceMatrix;
pub use pairs::Pair;

/// Alignment score type shared across the engine and the tree builder.
pub type Score = f64;

/// A pairwise alignment backend. Implementations align the rank-local pairs
/// they are handed and never communicate; distribution happens in [`run`].
pub trait Algorithm: Send + Sync {
    fn align(
        &self,
        pairs: &[Pair],
        db: &Database,
        table: &ScoringTable,
        progress: &ProgressBar,
    ) -> Result<Vec<Score>>;
}

type Factory = fn() -> Box<dyn Algorithm>;

fn registry() -> &'static FxHashMap<&'static str, Factory> {
    static REGISTRY: OnceLock<FxHashMap<&'static str, Factory>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut map: FxHashMap<&'static str, Factory> = FxHashMap::default();
        map.insert("default", || Box::new(needleman::Needleman));
        map.insert("needleman", || Box::new(needleman::Needleman));
        map.insert("sequential", || Box::new(sequential::Sequential));
        map.insert("hybrid", || Box::new(hybrid::Hybrid::default()));
        map
    })
}

/// Whether an algorithm name is registered. Names are case-sensitive.
pub fn has(name: &str) -> bool {
    registry().contains_key(name)
}

/// Instantiates the named backend.
pub fn make(name: &str) -> Result<Box<dyn Algorithm>> {
    registry()
        .get(name)
        .map(|factory| factory())
        .ok_or_else(|| Error::UnknownAlgorithm(name.to_string()))
}

/// The registered algorithm names, sorted.
pub fn list() -> Vec<&'static str> {
    let mut names: Vec<_> = registry().keys().copied().collect();
    names.sort_unstable();
    names
}

/// Engine execution states, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Idle,
    Partitioning,
    Executing,
    Gathering,
    Ready,
}

fn advance(stage: &mut Stage, next: Stage, rank: usize) {
    debug!(rank, from = ?stage, to = ?next, "pairwise engine transition");
    *stage = next;
}

fn progress_bar(rank: usize, pairs: usize) -> ProgressBar {
    if rank != 0 || pairs == 0 {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(pairs as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} pairs")
            .unwrap(),
    );
    bar
}

/// Aligns every pair of `db` and returns the complete distance matrix,
/// identical on every rank. Rank-collective: all ranks must call with the
/// same arguments, and any failure is surfaced on all of them.
pub fn run<T: Transport>(
    db: &Database,
    table: &ScoringTable,
    algorithm: &str,
    transport: &T,
) -> Result<DistanceMatrix> {
    let rank = transport.rank();
    let world = transport.size();
    let mut stage = Stage::Idle;

    let backend = elevate(transport, make(algorithm))?;

    advance(&mut stage, Stage::Partitioning, rank);
    let local = pairs::partition(db.count(), rank, world);

    advance(&mut stage, Stage::Executing, rank);
    let bar = progress_bar(rank, local.len());
    let local_scores = elevate(transport, backend.align(&local, db, table, &bar))?;
    bar.finish_and_clear();

    advance(&mut stage, Stage::Gathering, rank);
    let gathered = transport.allgather(local_scores)?;

    let total = pairs::total(db.count());
    if gathered.len() != total {
        return elevate(
            transport,
            Err(Error::InternalInvariant(format!(
                "gathered {} scores for {} pairs",
                gathered.len(),
                total
            ))),
        );
    }

    // Rank r's j-th score belongs to pair index r + j·w; the gather keeps
    // per-rank order, so placement is purely positional.
    let mut cells = vec![0.0; total];
    let mut cursor = 0;
    for source in 0..world {
        for slot in 0..pairs::quota(db.count(), source, world) {
            cells[source + slot * world] = gathered[cursor];
            cursor += 1;
        }
    }

    advance(&mut stage, Stage::Ready, rank);
    Ok(DistanceMatrix::from_cells(cells, db.count()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::Solo;

    fn sample_database() -> Database {
        let mut db = Database::new();
        db.push_raw(Some("one".into()), b"AAAA");
        db.push_raw(Some("two".into()), b"AAAA");
        db.push_raw(Some("three".into()), b"GT");
        db
    }

    #[test]
    fn registry_knows_every_backend() {
        for name in ["default", "needleman", "sequential", "hybrid"] {
            assert!(has(name), "missing algorithm {name}");
        }
        assert!(!has("smith"));
        assert!(matches!(make("smith"), Err(Error::UnknownAlgorithm(_))));
        assert_eq!(list(), vec!["default", "hybrid", "needleman", "sequential"]);
    }

    #[test]
    fn solo_run_produces_the_expected_matrix() {
        let db = sample_database();
        let table = crate::scoring::make("blosum62").unwrap();
        let matrix = run(&db, &table, "sequential", &Solo).unwrap();

        assert_eq!(matrix.count(), 3);
        assert_eq!(matrix.get(0, 1), 16.0);
        assert_eq!(matrix.get(0, 2), matrix.get(1, 2));
    }

    #[test]
    fn backends_agree_through_the_engine() {
        let db = sample_database();
        let table = crate::scoring::make("blosum62").unwrap();
        let scalar = run(&db, &table, "sequential", &Solo).unwrap();
        let block = run(&db, &table, "needleman", &Solo).unwrap();
        let hybrid = run(&db, &table, "hybrid", &Solo).unwrap();
        assert_eq!(scalar, block);
        assert_eq!(scalar, hybrid);
    }

    #[test]
    fn unknown_algorithm_fails_collectively() {
        let db = sample_database();
        let table = crate::scoring::make("blosum62").unwrap();
        assert!(matches!(
            run(&db, &table, "smith", &Solo),
            Err(Error::UnknownAlgorithm(_))
        ));
    }

    #[test]
    fn degenerate_databases_yield_empty_matrices() {
        let table = crate::scoring::make("blosum62").unwrap();
        let mut db = Database::new();
        let matrix = run(&db, &table, "sequential", &Solo).unwrap();
        assert_eq!(matrix.count(), 0);

        db.push_raw(None, b"ACTG");
        let matrix = run(&db, &table, "sequential", &Solo).unwrap();
        assert_eq!(matrix.count(), 1);
        assert!(matrix.cells().is_empty());
    }
}
