//! Module pipeline.
//!
//! A pipeline is an ordered chain of modules, each consuming the conduit the
//! previous stage produced. Conduits carry runtime kind-tags; the runner
//! verifies the whole chain once at construction and runs every pre-flight
//! check before any stage executes, so a misconfigured run has no side
//! effects.

pub mod modules;

use std::path::PathBuf;
use std::time::Instant;

use tracing::info;

use crate::cluster::Transport;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::pairwise::DistanceMatrix;
use crate::phylogeny::GuideTree;

/// The configuration surface modules validate against and read from.
#[derive(Debug, Clone)]
pub struct Settings {
    pub inputs: Vec<PathBuf>,
    pub parser: String,
    pub pairwise: String,
    pub phylogeny: String,
    pub scoring_table: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            inputs: Vec::new(),
            parser: String::from("default"),
            pairwise: String::from("default"),
            phylogeny: String::from("default"),
            scoring_table: String::from("default"),
        }
    }
}

/// Kind-tag of a conduit; one pipeline edge carries exactly one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConduitKind {
    Empty,
    Sequences,
    Distances,
    Tree,
}

/// The typed value moved from one stage to the next. The runner owns it
/// from a producer's return until the consumer finishes.
#[derive(Debug)]
pub enum Conduit {
    Empty,
    Sequences { db: Database },
    Distances { db: Database, matrix: DistanceMatrix },
    Tree { db: Database, tree: GuideTree },
}

impl Conduit {
    pub fn kind(&self) -> ConduitKind {
        match self {
            Conduit::Empty => ConduitKind::Empty,
            Conduit::Sequences { .. } => ConduitKind::Sequences,
            Conduit::Distances { .. } => ConduitKind::Distances,
            Conduit::Tree { .. } => ConduitKind::Tree,
        }
    }
}

/// One pipeline stage. `accepts` declares the expected predecessor conduit
/// kind so a chain can be verified before anything runs.
pub trait Module<T: Transport> {
    fn name(&self) -> &'static str;
    fn accepts(&self) -> ConduitKind;
    fn produces(&self) -> ConduitKind;

    /// Pre-flight validation against the configuration. Must not have side
    /// effects.
    fn check(&self, settings: &Settings) -> bool;

    fn run(&self, settings: &Settings, transport: &T, input: Conduit) -> Result<Conduit>;
}

/// A middleware decorating a module with per-stage wall-time reporting.
/// Middlewares are modules themselves, so they nest like onion layers; a
/// middleware may also short-circuit by returning without delegating.
pub struct Timed<T: Transport> {
    inner: Box<dyn Module<T>>,
}

impl<T: Transport> Timed<T> {
    pub fn new(inner: Box<dyn Module<T>>) -> Box<Self> {
        Box::new(Timed { inner })
    }
}

impl<T: Transport> Module<T> for Timed<T> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn accepts(&self) -> ConduitKind {
        self.inner.accepts()
    }

    fn produces(&self) -> ConduitKind {
        self.inner.produces()
    }

    fn check(&self, settings: &Settings) -> bool {
        self.inner.check(settings)
    }

    fn run(&self, settings: &Settings, transport: &T, input: Conduit) -> Result<Conduit> {
        let started = Instant::now();
        let output = self.inner.run(settings, transport, input)?;
        if transport.rank() == 0 {
            info!(stage = self.name(), elapsed = ?started.elapsed(), "stage finished");
        }
        Ok(output)
    }
}

/// Executes a verified module chain.
pub struct Runner<T: Transport> {
    modules: Vec<Box<dyn Module<T>>>,
}

impl<T: Transport> Runner<T> {
    /// Builds a runner, verifying that each module accepts exactly what its
    /// predecessor produces and that the chain starts from nothing.
    pub fn new(modules: Vec<Box<dyn Module<T>>>) -> Result<Self> {
        let mut expected = ConduitKind::Empty;
        for module in &modules {
            if module.accepts() != expected {
                return Err(Error::PipelineInvalid(format!(
                    "module '{}' expects {:?} but receives {:?}",
                    module.name(),
                    module.accepts(),
                    expected
                )));
            }
            expected = module.produces();
        }
        Ok(Runner { modules })
    }

    /// Runs every pre-flight check, then every stage strictly in order.
    pub fn run(&self, settings: &Settings, transport: &T) -> Result<Conduit> {
        for module in &self.modules {
            if !module.check(settings) {
                return Err(Error::PipelineInvalid(format!(
                    "pre-flight check failed for module '{}'",
                    module.name()
                )));
            }
        }

        let mut conduit = Conduit::Empty;
        for module in &self.modules {
            if conduit.kind() != module.accepts() {
                return Err(Error::InternalInvariant(format!(
                    "module '{}' fed a {:?} conduit",
                    module.name(),
                    conduit.kind()
                )));
            }
            conduit = module.run(settings, transport, conduit)?;
        }
        Ok(conduit)
    }
}
