//! In-process cluster transport.
//!
//! Every pair of ranks is connected by a dedicated FIFO channel, so as long
//! as collectives are matched in program order each receive pairs with the
//! send of the same collective. A type mismatch on receive means the ranks
//! diverged and surfaces as a transport error.

use std::any::Any;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Mutex;
use std::time::Duration;

use super::{Transport, Wire};
use crate::error::{Error, Result};

type Envelope = Box<dyn Any + Send>;

/// How long a rank waits on a peer before declaring the collective broken.
const PEER_TIMEOUT: Duration = Duration::from_secs(30);

/// One rank's endpoint of an in-process cluster.
pub struct LocalCluster {
    rank: usize,
    size: usize,
    senders: Vec<Option<Sender<Envelope>>>,
    receivers: Vec<Option<Mutex<Receiver<Envelope>>>>,
}

impl LocalCluster {
    /// Builds the fully-connected endpoints of a `size`-rank group. Each
    /// endpoint is meant to be moved onto its own thread.
    pub fn endpoints(size: usize) -> Vec<LocalCluster> {
        let mut senders: Vec<Vec<Option<Sender<Envelope>>>> =
            (0..size).map(|_| (0..size).map(|_| None).collect()).collect();
        let mut receivers: Vec<Vec<Option<Mutex<Receiver<Envelope>>>>> =
            (0..size).map(|_| (0..size).map(|_| None).collect()).collect();

        for src in 0..size {
            for dst in 0..size {
                if src != dst {
                    let (tx, rx) = channel();
                    senders[src][dst] = Some(tx);
                    receivers[dst][src] = Some(Mutex::new(rx));
                }
            }
        }

        senders
            .into_iter()
            .zip(receivers)
            .enumerate()
            .map(|(rank, (senders, receivers))| LocalCluster { rank, size, senders, receivers })
            .collect()
    }

    /// Runs `job` once per rank on its own thread and returns the results in
    /// rank order.
    pub fn run<R, F>(size: usize, job: F) -> Vec<R>
    where
        R: Send,
        F: Fn(LocalCluster) -> R + Sync,
    {
        let endpoints = LocalCluster::endpoints(size);
        let job = &job;
        std::thread::scope(|scope| {
            let handles: Vec<_> = endpoints
                .into_iter()
                .map(|endpoint| scope.spawn(move || job(endpoint)))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("rank thread panicked"))
                .collect()
        })
    }

    fn send<T: Wire>(&self, dst: usize, value: T) -> Result<()> {
        let sender = self.senders[dst]
            .as_ref()
            .ok_or_else(|| Error::InternalInvariant(format!("rank {} sending to itself", self.rank)))?;
        sender
            .send(Box::new(value))
            .map_err(|_| Error::Transport(format!("rank {dst} hung up")))
    }

    fn recv<T: Wire>(&self, src: usize) -> Result<T> {
        let slot = self.receivers[src]
            .as_ref()
            .ok_or_else(|| Error::InternalInvariant(format!("rank {} receiving from itself", self.rank)))?;
        let receiver = slot
            .lock()
            .map_err(|_| Error::Transport("receiver lock poisoned".into()))?;
        let envelope = receiver
            .recv_timeout(PEER_TIMEOUT)
            .map_err(|_| Error::Transport(format!("timed out waiting for rank {src}")))?;
        envelope
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| Error::Transport("collective matched out of program order".into()))
    }
}

impl Transport for LocalCluster {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn broadcast<T: Wire>(&self, value: T, root: usize) -> Result<T> {
        if self.rank == root {
            for dst in 0..self.size {
                if dst != root {
                    self.send(dst, value.clone())?;
                }
            }
            Ok(value)
        } else {
            self.recv(root)
        }
    }

    fn allgather<T: Wire>(&self, local: Vec<T>) -> Result<Vec<T>> {
        for dst in 0..self.size {
            if dst != self.rank {
                self.send(dst, local.clone())?;
            }
        }
        let mut gathered = Vec::new();
        for src in 0..self.size {
            if src == self.rank {
                gathered.extend(local.iter().cloned());
            } else {
                gathered.extend(self.recv::<Vec<T>>(src)?);
            }
        }
        Ok(gathered)
    }

    fn allreduce<T: Wire>(&self, local: T, reducer: impl Fn(&T, &T) -> T) -> Result<T> {
        for dst in 0..self.size {
            if dst != self.rank {
                self.send(dst, local.clone())?;
            }
        }
        let mut accumulator: Option<T> = None;
        for src in 0..self.size {
            let value = if src == self.rank { local.clone() } else { self.recv::<T>(src)? };
            accumulator = Some(match accumulator {
                None => value,
                Some(acc) => reducer(&acc, &value),
            });
        }
        accumulator.ok_or_else(|| Error::InternalInvariant("allreduce over empty group".into()))
    }

    fn barrier(&self) -> Result<()> {
        for dst in 0..self.size {
            if dst != self.rank {
                self.send(dst, ())?;
            }
        }
        for src in 0..self.size {
            if src != self.rank {
                self.recv::<()>(src)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_distributes_the_root_value() {
        let results = LocalCluster::run(3, |transport| {
            let local = if transport.rank() == 1 { 99u64 } else { 0 };
            transport.broadcast(local, 1).unwrap()
        });
        assert_eq!(results, vec![99, 99, 99]);
    }

    #[test]
    fn allgather_concatenates_in_rank_order() {
        let results = LocalCluster::run(3, |transport| {
            let rank = transport.rank();
            transport.allgather(vec![rank * 10, rank * 10 + 1]).unwrap()
        });
        for gathered in results {
            assert_eq!(gathered, vec![0, 1, 10, 11, 20, 21]);
        }
    }

    #[test]
    fn allreduce_agrees_on_every_rank() {
        let results = LocalCluster::run(4, |transport| {
            let local = (transport.rank() as i64 + 3) * 7;
            transport.allreduce(local, |a, b| a.max(b).to_owned()).unwrap()
        });
        assert_eq!(results, vec![42, 42, 42, 42]);
    }

    #[test]
    fn elevate_spreads_a_single_rank_failure() {
        let results = LocalCluster::run(3, |transport| {
            let local = if transport.rank() == 2 {
                Err(Error::UnknownTable("blosum99".into()))
            } else {
                Ok(transport.rank())
            };
            super::super::elevate(&transport, local)
        });
        for result in results {
            assert!(matches!(result, Err(Error::UnknownTable(_))));
        }
    }

    #[test]
    fn barrier_lets_all_ranks_through() {
        let results = LocalCluster::run(3, |transport| transport.barrier().is_ok());
        assert_eq!(results, vec![true, true, true]);
    }
}
