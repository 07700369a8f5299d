//! Distributed neighbor-joining tree builder.
//!
//! Iterative star contraction over the pairwise score matrix. Scores are
//! similarities, so each step joins the candidate pair maximizing
//! `Q(u,v) = (k-2)·D[u,v] - S_u - S_v`; ties break toward the smaller `u`,
//! then the smaller `v`, which keeps the reduction total and the tree
//! deterministic across any rank count.

use tracing::debug;

use super::tree::{GuideTree, OtuRef, UNDEFINED};
use super::{Algorithm, BranchLength};
use crate::cluster::Transport;
use crate::error::{Error, Result};
use crate::pairwise::DistanceMatrix;

/// A join candidate moving through the cluster-wide reduction. The owner of
/// the winning pair has already attached both branch deltas.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    q: f64,
    u: OtuRef,
    v: OtuRef,
    delta_u: BranchLength,
    delta_v: BranchLength,
}

impl Candidate {
    fn none() -> Self {
        Candidate { q: f64::NEG_INFINITY, u: UNDEFINED, v: UNDEFINED, delta_u: 0.0, delta_v: 0.0 }
    }
}

/// Pure reducer selecting the candidate with the larger Q; ties go to the
/// smaller `u`, then the smaller `v`.
fn best_candidate(a: &Candidate, b: &Candidate) -> Candidate {
    if a.q > b.q {
        *a
    } else if b.q > a.q {
        *b
    } else if (a.u, a.v) <= (b.u, b.v) {
        *a
    } else {
        *b
    }
}

/// Working state: a full symmetric replica of the evolving distance matrix
/// over all `2N-1` possible OTUs plus the active reference set, kept sorted
/// so position scans visit candidates in tie-break order.
struct State {
    dist: Vec<f64>,
    dim: usize,
    active: Vec<OtuRef>,
}

impl State {
    fn new(matrix: &DistanceMatrix) -> Self {
        let count = matrix.count();
        let dim = 2 * count - 1;
        let mut state =
            State { dist: vec![0.0; dim * dim], dim, active: (0..count as OtuRef).collect() };
        for one in 0..count {
            for two in 0..count {
                state.set(one as OtuRef, two as OtuRef, matrix.get(one, two));
            }
        }
        state
    }

    #[inline]
    fn get(&self, one: OtuRef, two: OtuRef) -> f64 {
        self.dist[one as usize * self.dim + two as usize]
    }

    #[inline]
    fn set(&mut self, one: OtuRef, two: OtuRef, value: f64) {
        self.dist[one as usize * self.dim + two as usize] = value;
        self.dist[two as usize * self.dim + one as usize] = value;
    }

    /// Sum of distances from each active OTU to every other active OTU,
    /// indexed by active position.
    fn row_sums(&self) -> Vec<f64> {
        self.active
            .iter()
            .map(|&u| self.active.iter().map(|&v| self.get(u, v)).sum())
            .collect()
    }

    fn position(&self, reference: OtuRef) -> Result<usize> {
        self.active
            .iter()
            .position(|&x| x == reference)
            .ok_or_else(|| Error::InternalInvariant(format!("OTU {reference} not active")))
    }
}

/// The neighbor-joining algorithm.
pub struct NeighborJoining;

impl NeighborJoining {
    /// Scans this rank's owned candidate pairs (first element's active
    /// position striped by rank) and raises the local best with its branch
    /// deltas attached.
    fn pick_joinable(state: &State, sums: &[f64], rank: usize, world: usize) -> Candidate {
        let k = state.active.len();
        let mut chosen = Candidate::none();
        let mut chosen_positions = (0usize, 0usize);

        for p in (rank..k).step_by(world) {
            for q in (p + 1)..k {
                let u = state.active[p];
                let v = state.active[q];
                let score = (k as f64 - 2.0) * state.get(u, v) - sums[p] - sums[q];

                if score > chosen.q || (score == chosen.q && (u, v) < (chosen.u, chosen.v)) {
                    chosen = Candidate { q: score, u, v, delta_u: 0.0, delta_v: 0.0 };
                    chosen_positions = (p, q);
                }
            }
        }

        if chosen.u != UNDEFINED {
            let (p, q) = chosen_positions;
            let distance = state.get(chosen.u, chosen.v);
            chosen.delta_u =
                distance / 2.0 + (sums[p] - sums[q]) / (2.0 * (k as f64 - 2.0));
            chosen.delta_v = distance - chosen.delta_u;
        }

        chosen
    }

    /// Joins the winning pair into `parent`, merges its row into the matrix
    /// through an owner broadcast and contracts the active set.
    fn join_pair<T: Transport>(
        state: &mut State,
        tree: &mut GuideTree,
        vote: Candidate,
        transport: &T,
    ) -> Result<()> {
        let parent = tree.join(vote.u, vote.v, vote.delta_u, vote.delta_v);

        // The rank owning the surviving row emits the merged distances;
        // everyone else installs the broadcast copy.
        let owner = state.position(vote.u)? % transport.size();
        let row = if transport.rank() == owner {
            let joined = state.get(vote.u, vote.v);
            state
                .active
                .iter()
                .filter(|&&z| z != vote.u && z != vote.v)
                .map(|&z| (state.get(vote.u, z) + state.get(vote.v, z) - joined) / 2.0)
                .collect()
        } else {
            Vec::new()
        };
        let row = transport.broadcast(row, owner)?;

        state.active.retain(|&z| z != vote.u && z != vote.v);
        for (&z, value) in state.active.iter().zip(row) {
            state.dist[parent as usize * state.dim + z as usize] = value;
            state.dist[z as usize * state.dim + parent as usize] = value;
        }
        state.active.push(parent);
        Ok(())
    }
}

impl<T: Transport> Algorithm<T> for NeighborJoining {
    fn build(&self, matrix: &DistanceMatrix, transport: &T) -> Result<GuideTree> {
        let count = matrix.count();
        if count < 2 {
            return Err(Error::EmptyDatabase);
        }
        for high in 1..count {
            for low in 0..high {
                if !matrix.get(high, low).is_finite() {
                    return Err(Error::DegenerateDistance(high as u32, low as u32));
                }
            }
        }

        let rank = transport.rank();
        let world = transport.size();
        let mut state = State::new(matrix);
        let mut tree = GuideTree::with_leaves(count);

        for step in 0..count - 2 {
            let sums = state.row_sums();
            let local = Self::pick_joinable(&state, &sums, rank, world);
            let vote = transport.allreduce(local, best_candidate)?;

            if vote.u == UNDEFINED {
                return Err(Error::InternalInvariant("no joinable candidate found".into()));
            }

            debug!(step, u = vote.u, v = vote.v, q = vote.q, "joining OTU pair");
            Self::join_pair(&mut state, &mut tree, vote, transport)?;
        }

        // The last two references join at the implicit root, splitting their
        // distance evenly.
        let (u, v) = (state.active[0], state.active[1]);
        let distance = state.get(u, v);
        tree.join(u, v, distance / 2.0, distance / 2.0);

        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::Solo;

    fn build_solo(matrix: &DistanceMatrix) -> Result<GuideTree> {
        NeighborJoining.build(matrix, &Solo)
    }

    fn similarity_matrix(count: usize, cells: &[(usize, usize, f64)]) -> DistanceMatrix {
        let mut matrix = DistanceMatrix::new(count);
        for &(one, two, value) in cells {
            matrix.set(one, two, value);
        }
        matrix
    }

    #[test]
    fn two_leaves_join_at_the_root() {
        let matrix = similarity_matrix(2, &[(0, 1, 16.0)]);
        let tree = build_solo(&matrix).unwrap();

        assert_eq!(tree.len(), 3);
        let root = tree.node(tree.root());
        assert_eq!((root.left, root.right), (0, 1));
        assert_eq!(root.branch_length_left, 8.0);
        assert_eq!(root.branch_length_right, 8.0);
        assert_eq!(root.subtree_leaves, 2);
    }

    #[test]
    fn the_most_similar_pair_joins_first() {
        let matrix = similarity_matrix(
            4,
            &[
                (0, 1, 10.0),
                (2, 3, 10.0),
                (0, 2, 1.0),
                (0, 3, 1.0),
                (1, 2, 1.0),
                (1, 3, 1.0),
            ],
        );
        let tree = build_solo(&matrix).unwrap();

        assert_eq!(tree.len(), 7);
        let first = tree.node(4);
        assert_eq!((first.left, first.right), (0, 1));
        let second = tree.node(5);
        assert_eq!((second.left, second.right), (2, 3));
    }

    #[test]
    fn equal_candidates_break_ties_toward_low_references() {
        // Identical rows everywhere: every Q ties, so (0, 1) must win.
        let mut matrix = DistanceMatrix::new(3);
        for (one, two) in [(0, 1), (0, 2), (1, 2)] {
            matrix.set(one, two, 5.0);
        }
        let tree = build_solo(&matrix).unwrap();
        let first = tree.node(3);
        assert_eq!((first.left, first.right), (0, 1));
    }

    #[test]
    fn node_count_is_always_two_n_minus_one() {
        for count in 2..=7 {
            let mut matrix = DistanceMatrix::new(count);
            for high in 1..count {
                for low in 0..high {
                    matrix.set(high, low, ((high * 31 + low * 7) % 13) as f64);
                }
            }
            let tree = build_solo(&matrix).unwrap();
            assert_eq!(tree.len(), 2 * count - 1);
            assert_eq!(tree.leaves(), count);
            assert_eq!(tree.node(tree.root()).subtree_leaves as usize, count);
        }
    }

    #[test]
    fn trees_are_deterministic() {
        let matrix = similarity_matrix(
            4,
            &[(0, 1, 3.0), (0, 2, 5.0), (0, 3, 6.0), (1, 2, 6.0), (1, 3, 5.0), (2, 3, 3.0)],
        );
        let one = build_solo(&matrix).unwrap();
        let two = build_solo(&matrix).unwrap();
        assert_eq!(one.to_newick(&|l| l.to_string()), two.to_newick(&|l| l.to_string()));
    }

    #[test]
    fn single_sequences_are_rejected() {
        assert!(matches!(build_solo(&DistanceMatrix::new(0)), Err(Error::EmptyDatabase)));
        assert!(matches!(build_solo(&DistanceMatrix::new(1)), Err(Error::EmptyDatabase)));
    }

    #[test]
    fn non_finite_cells_are_degenerate() {
        let matrix = similarity_matrix(3, &[(0, 1, 1.0), (0, 2, f64::NAN), (1, 2, 2.0)]);
        assert!(matches!(build_solo(&matrix), Err(Error::DegenerateDistance(2, 0))));
    }
}
