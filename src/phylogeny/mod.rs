//! Phylogeny stage: guide-tree construction from the distance matrix.

pub mod tree;

mod njoining;

use tracing::debug;

use crate::cluster::{elevate, Transport};
use crate::error::{Error, Result};
use crate::pairwise::DistanceMatrix;

pub use tree::{GuideTree, Node, OtuRef, UNDEFINED};

/// Branch length type of the guide tree.
pub type BranchLength = f64;

/// A tree-building algorithm. Builders run collectively: every rank calls
/// [`Algorithm::build`] with its replica of the distance matrix and all
/// ranks return the identical tree.
pub trait Algorithm<T: Transport> {
    fn build(&self, matrix: &DistanceMatrix, transport: &T) -> Result<GuideTree>;
}

const NAMES: &[&str] = &["default", "njoining"];

/// Whether an algorithm name is registered. Names are case-sensitive.
pub fn has(name: &str) -> bool {
    NAMES.contains(&name)
}

/// Instantiates the named builder.
pub fn make<T: Transport>(name: &str) -> Result<Box<dyn Algorithm<T>>> {
    match name {
        "default" | "njoining" => Ok(Box::new(njoining::NeighborJoining)),
        _ => Err(Error::UnknownAlgorithm(name.to_string())),
    }
}

/// The registered algorithm names.
pub fn list() -> Vec<&'static str> {
    NAMES.to_vec()
}

/// Builds the guide tree for `matrix`. Rank-collective; failures surface on
/// every rank.
pub fn run<T: Transport>(
    matrix: &DistanceMatrix,
    algorithm: &str,
    transport: &T,
) -> Result<GuideTree> {
    let builder = elevate(transport, make::<T>(algorithm))?;
    debug!(rank = transport.rank(), algorithm, otus = matrix.count(), "building guide tree");
    let tree = elevate(transport, builder.build(matrix, transport))?;

    if tree.len() != 2 * matrix.count() - 1 {
        return Err(Error::InternalInvariant(format!(
            "tree holds {} nodes for {} OTUs",
            tree.len(),
            matrix.count()
        )));
    }
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::Solo;

    #[test]
    fn registry_accepts_the_default_alias() {
        assert!(has("default"));
        assert!(has("njoining"));
        assert!(!has("upgma"));
        assert!(matches!(make::<Solo>("upgma"), Err(Error::UnknownAlgorithm(_))));
        assert_eq!(list(), vec!["default", "njoining"]);
    }

    #[test]
    fn run_builds_a_complete_tree() {
        let mut matrix = DistanceMatrix::new(3);
        matrix.set(0, 1, 13.0);
        matrix.set(0, 2, -1.0);
        matrix.set(1, 2, -1.0);

        let tree = run(&matrix, "default", &Solo).unwrap();
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.node(3).left, 0);
        assert_eq!(tree.node(3).right, 1);
    }

    #[test]
    fn empty_matrices_fail_collectively() {
        let matrix = DistanceMatrix::new(1);
        assert!(matches!(run(&matrix, "njoining", &Solo), Err(Error::EmptyDatabase)));
    }
}
