//! End-to-end behavior over small, hand-checked inputs.

use phyloalign::cluster::Solo;
use phyloalign::encode::{Sequence, PADDING};
use phyloalign::error::Error;
use phyloalign::phylogeny;
use phyloalign::scoring;

use super::helpers;

#[test]
fn identical_pair_scores_the_full_diagonal() {
    let db = helpers::database(&[b"AAAA", b"AAAA"]);
    let matrix = helpers::solo_matrix(&db, "default");

    assert_eq!(matrix.cells().len(), 1);
    assert_eq!(matrix.get(0, 1), 16.0);

    let tree = phylogeny::run(&matrix, "njoining", &Solo).unwrap();
    assert_eq!(tree.len(), 3);
    let root = tree.node(tree.root());
    assert_eq!((root.left, root.right), (0, 1));
    assert_eq!(root.branch_length_left, 8.0);
    assert_eq!(root.branch_length_right, 8.0);
}

#[test]
fn empty_against_one_residue_costs_a_single_gap() {
    let db = helpers::database(&[b"", b"A"]);
    let matrix = helpers::solo_matrix(&db, "sequential");
    assert_eq!(matrix.get(0, 1), -4.0);
}

#[test]
fn the_closest_pair_joins_first() {
    let db = helpers::database(&[b"AC", b"AC", b"GT"]);
    let matrix = helpers::solo_matrix(&db, "default");

    assert_eq!(matrix.get(0, 1), 13.0);
    assert_eq!(matrix.get(0, 2), matrix.get(1, 2));

    let tree = phylogeny::run(&matrix, "njoining", &Solo).unwrap();
    let first_join = tree.node(3);
    assert_eq!((first_join.left, first_join.right), (0, 1));
}

#[test]
fn trailing_padding_behaves_like_the_bare_sequence() {
    let padded = helpers::database(&[b"ACGT***", b"MKVLIT", b"AC"]);
    let bare = helpers::database(&[b"ACGT", b"MKVLIT", b"AC"]);

    for algorithm in ["sequential", "needleman"] {
        let padded_matrix = helpers::solo_matrix(&padded, algorithm);
        let bare_matrix = helpers::solo_matrix(&bare, algorithm);
        assert_eq!(padded_matrix.get(0, 1), bare_matrix.get(0, 1));
        assert_eq!(padded_matrix.get(0, 2), bare_matrix.get(0, 2));
        assert_eq!(padded_matrix.get(1, 2), bare_matrix.get(1, 2));
    }
}

#[test]
fn unknown_table_names_exit_as_config_errors() {
    let error = scoring::make("blosum99").unwrap_err();
    assert!(matches!(error, Error::UnknownTable(_)));
    assert_eq!(error.exit_code(), 1);
}

#[test]
fn encoding_round_trips_over_the_alphabet() {
    let text = b"ACTGRNDQEHILKMFPSWYVBJZX";
    let sequence = Sequence::encode(text);
    assert_eq!(sequence.decode().as_bytes(), text);
    assert_eq!(sequence.symbol(text.len()), PADDING);
}

#[test]
fn self_similarity_bounds_cross_scores() {
    let db = helpers::database(&[b"MKVLITGAGS", b"MKVLATGAGS", b"WWYYFF"]);
    let matrix = helpers::solo_matrix(&db, "default");
    let table = scoring::make("blosum62").unwrap();

    for i in 0..db.count() {
        let seq = db.sequence(i);
        let self_score: f64 = (0..seq.len()).map(|p| table.score(seq.symbol(p), seq.symbol(p))).sum();
        for j in 0..db.count() {
            assert!(matrix.get(i, j) <= self_score);
        }
    }
}
