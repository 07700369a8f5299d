//! Inter-rank transport abstraction.
//!
//! Every rank executes the same pipeline and must reach each collective in
//! the same program order. [`Solo`] is the degraded single-process form used
//! when no cluster is available; [`LocalCluster`] connects in-process ranks
//! over channels and is what the tests and `--ranks` emulation run on.

mod local;

pub use local::LocalCluster;

use crate::error::{Error, Result};

/// Values that can cross a rank boundary.
pub trait Wire: Clone + Send + 'static {}

impl<T: Clone + Send + 'static> Wire for T {}

/// Point-to-point and collective primitives over the process group.
///
/// Reducers passed to [`Transport::allreduce`] must be pure, associative and
/// commutative; the fold order over ranks is fixed so every rank computes
/// the same result.
pub trait Transport {
    /// This process's index within the group.
    fn rank(&self) -> usize;

    /// Total number of processes in the group.
    fn size(&self) -> usize;

    /// Distributes `root`'s value to every rank. Non-root inputs are
    /// ignored; every rank returns the root's value.
    fn broadcast<T: Wire>(&self, value: T, root: usize) -> Result<T>;

    /// Concatenates every rank's items in rank order. All ranks see the
    /// identical result, with per-rank ordering preserved.
    fn allgather<T: Wire>(&self, local: Vec<T>) -> Result<Vec<T>>;

    /// Reduces one value per rank with `reducer`, folding in rank order.
    fn allreduce<T: Wire>(&self, local: T, reducer: impl Fn(&T, &T) -> T) -> Result<T>;

    /// Blocks until every rank has arrived.
    fn barrier(&self) -> Result<()>;
}

/// Elevates a per-rank result to a collective one: if any rank failed, every
/// rank surfaces that failure (lowest failing rank wins). In-flight work is
/// drained through a barrier before the status exchange so no rank is left
/// behind in a later collective.
pub fn elevate<T, Tr: Transport>(transport: &Tr, local: Result<T>) -> Result<T> {
    transport.barrier()?;
    let status = match &local {
        Ok(_) => None,
        Err(err) => Some(err.to_wire()),
    };
    let statuses = transport.allgather(vec![status])?;
    for status in statuses.into_iter().flatten() {
        let (class, message) = status;
        return Err(Error::from_wire(class, message));
    }
    local
}

/// The identity transport: rank 0 of a single-process world. Every
/// collective degrades to returning its input.
#[derive(Debug, Clone, Copy, Default)]
pub struct Solo;

impl Transport for Solo {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn broadcast<T: Wire>(&self, value: T, _root: usize) -> Result<T> {
        Ok(value)
    }

    fn allgather<T: Wire>(&self, local: Vec<T>) -> Result<Vec<T>> {
        Ok(local)
    }

    fn allreduce<T: Wire>(&self, local: T, _reducer: impl Fn(&T, &T) -> T) -> Result<T> {
        Ok(local)
    }

    fn barrier(&self) -> Result<()> {
        Ok(())
    }
}
