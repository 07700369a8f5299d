//! Rank-count equivalence: the same input must produce identical results
//! whatever the world size.

use phyloalign::cluster::{LocalCluster, Solo};
use phyloalign::error::Error;
use phyloalign::pairwise;
use phyloalign::phylogeny;
use phyloalign::scoring;

use super::helpers;

const RESIDUES: [&[u8]; 7] = [
    b"MKVLITGAGSGIG",
    b"MKVLATGAGSGLG",
    b"HEAVYMETAL",
    b"ACTGACTG",
    b"AC",
    b"",
    b"WWYYFFPP",
];

#[test]
fn distance_matrices_match_across_world_sizes() {
    let reference = helpers::solo_matrix(&helpers::database(&RESIDUES), "sequential");

    for world in [1usize, 2, 3] {
        let results = LocalCluster::run(world, |transport| {
            let db = helpers::database(&RESIDUES);
            let table = scoring::make("blosum62").unwrap();
            pairwise::run(&db, &table, "sequential", &transport).unwrap()
        });

        for matrix in results {
            assert_eq!(matrix.cells(), reference.cells(), "world size {world} diverged");
        }
    }
}

#[test]
fn block_backend_matches_across_world_sizes() {
    let reference = helpers::solo_matrix(&helpers::database(&RESIDUES), "needleman");

    for world in [2usize, 3] {
        let results = LocalCluster::run(world, |transport| {
            let db = helpers::database(&RESIDUES);
            let table = scoring::make("blosum62").unwrap();
            pairwise::run(&db, &table, "needleman", &transport).unwrap()
        });

        for matrix in results {
            assert_eq!(matrix.cells(), reference.cells());
        }
    }
}

#[test]
fn guide_trees_match_across_world_sizes() {
    let db = helpers::database(&RESIDUES);
    let matrix = helpers::solo_matrix(&db, "sequential");
    let reference = phylogeny::run(&matrix, "njoining", &Solo)
        .unwrap()
        .to_newick(&|leaf| leaf.to_string());

    for world in [2usize, 3, 4] {
        let matrix = &matrix;
        let results = LocalCluster::run(world, |transport| {
            phylogeny::run(matrix, "njoining", &transport)
                .unwrap()
                .to_newick(&|leaf| leaf.to_string())
        });

        for newick in results {
            assert_eq!(newick, reference, "world size {world} diverged");
        }
    }
}

#[test]
fn unknown_algorithm_surfaces_on_every_rank() {
    let results = LocalCluster::run(3, |transport| {
        let db = helpers::database(&RESIDUES);
        let table = scoring::make("blosum62").unwrap();
        pairwise::run(&db, &table, "smith", &transport)
    });

    for result in results {
        match result {
            Err(error) => {
                assert!(matches!(error, Error::UnknownAlgorithm(_)));
                assert_eq!(error.exit_code(), 1);
            }
            Ok(_) => panic!("unknown algorithm should fail on every rank"),
        }
    }
}

#[test]
fn unknown_table_surfaces_on_every_rank() {
    let results = LocalCluster::run(3, |transport| {
        phyloalign::cluster::elevate(&transport, scoring::make("blosum99"))
    });

    for result in results {
        match result {
            Err(error) => {
                assert!(matches!(error, Error::UnknownTable(_)));
                assert_eq!(error.exit_code(), 1);
            }
            Ok(_) => panic!("unknown table should fail on every rank"),
        }
    }
}

#[test]
fn world_sizes_larger_than_the_workload_still_agree() {
    let small: [&[u8]; 2] = [b"AAAA", b"AAAA"];
    let reference = helpers::solo_matrix(&helpers::database(&small), "sequential");

    // Five ranks, one pair: four ranks own nothing and must still converge.
    let results = LocalCluster::run(5, |transport| {
        let db = helpers::database(&small);
        let table = scoring::make("blosum62").unwrap();
        pairwise::run(&db, &table, "sequential", &transport).unwrap()
    });

    for matrix in results {
        assert_eq!(matrix.cells(), reference.cells());
    }
}
