//! Shared fixtures for the integration tests.

use phyloalign::cluster::Solo;
use phyloalign::db::Database;
use phyloalign::pairwise::{self, DistanceMatrix};
use phyloalign::scoring;

pub fn database(sequences: &[&[u8]]) -> Database {
    let mut db = Database::new();
    for (index, residues) in sequences.iter().enumerate() {
        db.push_raw(Some(format!("seq{index}")), residues);
    }
    db
}

pub fn solo_matrix(db: &Database, algorithm: &str) -> DistanceMatrix {
    let table = scoring::make("blosum62").unwrap();
    pairwise::run(db, &table, algorithm, &Solo).unwrap()
}
