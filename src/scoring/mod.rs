//! Substitution-table catalog.
//!
//! Tables are published in `ARNDCQEGHILKMFPSTWYVBJZX*` order; the catalog
//! permutes them into residue-code order on construction so the hot path
//! indexes the matrix directly by encoded symbols. A table can be cloned
//! into a flat device layout shared read-only by every worker block.

mod tables;

use std::sync::OnceLock;

use rustc_hash::FxHashMap;

use crate::encode::{self, Symbol, ALPHABET_SIZE};
use crate::error::{Error, Result};

pub use tables::{MATRIX_DIM, PUBLICATION_ORDER};

const CELLS: usize = MATRIX_DIM * MATRIX_DIM;

/// Every built-in table uses the same linear gap penalty.
const DEFAULT_PENALTY: f64 = 4.0;

/// A substitution table in residue-code order plus its linear gap penalty.
#[derive(Debug, Clone)]
pub struct ScoringTable {
    name: &'static str,
    matrix: [i8; CELLS],
    penalty: f64,
}

impl ScoringTable {
    /// Builds a table from a publication-order matrix, permuting it into
    /// residue-code order.
    fn from_publication(name: &'static str, raw: &[i8; CELLS], penalty: f64) -> Self {
        let mut to_publication = [0usize; ALPHABET_SIZE];
        for (code, slot) in to_publication.iter_mut().enumerate() {
            let letter = encode::decode(code as Symbol);
            *slot = PUBLICATION_ORDER
                .iter()
                .position(|&c| c == letter)
                .expect("alphabet letter missing from publication order");
        }

        let mut matrix = [0i8; CELLS];
        for row in 0..MATRIX_DIM {
            for col in 0..MATRIX_DIM {
                matrix[row * MATRIX_DIM + col] =
                    raw[to_publication[row] * MATRIX_DIM + to_publication[col]];
            }
        }

        ScoringTable { name, matrix, penalty }
    }

    /// The catalog name this table was created under.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Substitution score for a residue-code pair.
    #[inline(always)]
    pub fn score(&self, one: Symbol, two: Symbol) -> f64 {
        f64::from(self.matrix[one as usize * MATRIX_DIM + two as usize])
    }

    /// The linear gap penalty. Non-negative; subtracted per gap column.
    #[inline(always)]
    pub fn penalty(&self) -> f64 {
        self.penalty
    }

    /// Clones the table into its flat device layout.
    pub fn to_device(&self) -> DeviceTable {
        DeviceTable { matrix: self.matrix, penalty: self.penalty }
    }
}

/// A device-resident table copy. Plain data with no indirection so worker
/// blocks can keep a private copy in their local storage.
#[derive(Debug, Clone, Copy)]
pub struct DeviceTable {
    matrix: [i8; CELLS],
    penalty: f64,
}

impl DeviceTable {
    /// Substitution score for a residue-code pair; identical to the host
    /// table's accessor for every (row, col) pair.
    #[inline(always)]
    pub fn score(&self, one: Symbol, two: Symbol) -> f64 {
        f64::from(self.matrix[one as usize * MATRIX_DIM + two as usize])
    }

    #[inline(always)]
    pub fn penalty(&self) -> f64 {
        self.penalty
    }
}

type TableSource = (&'static str, &'static [i8; CELLS]);

fn catalog() -> &'static FxHashMap<&'static str, TableSource> {
    static CATALOG: OnceLock<FxHashMap<&'static str, TableSource>> = OnceLock::new();
    CATALOG.get_or_init(|| {
        let mut map: FxHashMap<&'static str, TableSource> = FxHashMap::default();
        map.insert("default", ("blosum62", &tables::BLOSUM62));
        map.insert("blosum62", ("blosum62", &tables::BLOSUM62));
        map.insert("blosum45", ("blosum45", &tables::BLOSUM45));
        map.insert("blosum50", ("blosum50", &tables::BLOSUM50));
        map.insert("blosum80", ("blosum80", &tables::BLOSUM80));
        map.insert("blosum90", ("blosum90", &tables::BLOSUM90));
        map.insert("pam250", ("pam250", &tables::PAM250));
        map
    })
}

/// Whether a table name exists in the catalog. Names are case-sensitive.
pub fn has(name: &str) -> bool {
    catalog().contains_key(name)
}

/// Builds the named scoring table.
pub fn make(name: &str) -> Result<ScoringTable> {
    let &(canonical, raw) = catalog()
        .get(name)
        .ok_or_else(|| Error::UnknownTable(name.to_string()))?;
    Ok(ScoringTable::from_publication(canonical, raw, DEFAULT_PENALTY))
}

/// The available table names, sorted, for the CLI and config surface.
pub fn list() -> Vec<&'static str> {
    let mut names: Vec<_> = catalog().keys().copied().collect();
    names.sort_unstable();
    names
}
