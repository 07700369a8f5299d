//! The pipeline's three stages: load, pairwise and phylogeny.

use tracing::info;

use super::{Conduit, ConduitKind, Module, Settings};
use crate::cluster::Transport;
use crate::error::{Error, Result};
use crate::{loader, pairwise, phylogeny, scoring};

/// Parses the configured input files into the sequence database.
pub struct Load;

impl<T: Transport> Module<T> for Load {
    fn name(&self) -> &'static str {
        "load"
    }

    fn accepts(&self) -> ConduitKind {
        ConduitKind::Empty
    }

    fn produces(&self) -> ConduitKind {
        ConduitKind::Sequences
    }

    fn check(&self, settings: &Settings) -> bool {
        loader::has(&settings.parser) && !settings.inputs.is_empty()
    }

    fn run(&self, settings: &Settings, transport: &T, _input: Conduit) -> Result<Conduit> {
        let db = loader::load(&settings.inputs, &settings.parser)?;
        if transport.rank() == 0 {
            info!(total = db.count(), "loaded sequence database");
        }
        Ok(Conduit::Sequences { db })
    }
}

/// Aligns every sequence pair into the distance matrix.
pub struct Pairwise;

impl<T: Transport> Module<T> for Pairwise {
    fn name(&self) -> &'static str {
        "pairwise"
    }

    fn accepts(&self) -> ConduitKind {
        ConduitKind::Sequences
    }

    fn produces(&self) -> ConduitKind {
        ConduitKind::Distances
    }

    fn check(&self, settings: &Settings) -> bool {
        pairwise::has(&settings.pairwise) && scoring::has(&settings.scoring_table)
    }

    fn run(&self, settings: &Settings, transport: &T, input: Conduit) -> Result<Conduit> {
        let Conduit::Sequences { db } = input else {
            return Err(Error::InternalInvariant("pairwise fed a non-sequence conduit".into()));
        };

        if transport.rank() == 0 {
            info!(
                algorithm = %settings.pairwise,
                table = %settings.scoring_table,
                pairs = pairwise::pairs::total(db.count()),
                "chosen pairwise algorithm"
            );
        }

        let table = scoring::make(&settings.scoring_table)?;
        let matrix = pairwise::run(&db, &table, &settings.pairwise, transport)?;
        Ok(Conduit::Distances { db, matrix })
    }
}

/// Builds the guide tree from the distance matrix.
pub struct Phylogeny;

impl<T: Transport> Module<T> for Phylogeny {
    fn name(&self) -> &'static str {
        "phylogeny"
    }

    fn accepts(&self) -> ConduitKind {
        ConduitKind::Distances
    }

    fn produces(&self) -> ConduitKind {
        ConduitKind::Tree
    }

    fn check(&self, settings: &Settings) -> bool {
        phylogeny::has(&settings.phylogeny)
    }

    fn run(&self, settings: &Settings, transport: &T, input: Conduit) -> Result<Conduit> {
        let Conduit::Distances { db, matrix } = input else {
            return Err(Error::InternalInvariant("phylogeny fed a non-distance conduit".into()));
        };

        if transport.rank() == 0 {
            info!(algorithm = %settings.phylogeny, "chosen phylogeny algorithm");
        }

        let tree = phylogeny::run(&matrix, &settings.phylogeny, transport)?;
        Ok(Conduit::Tree { db, tree })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::Solo;
    use crate::pipeline::{Runner, Timed};
    use std::io::Write;

    fn settings_for(content: &str) -> (Settings, tempfile::NamedTempFile) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        let settings = Settings {
            inputs: vec![file.path().to_path_buf()],
            ..Settings::default()
        };
        (settings, file)
    }

    fn full_runner() -> Runner<Solo> {
        Runner::new(vec![
            Timed::new(Box::new(Load)),
            Timed::new(Box::new(Pairwise)),
            Timed::new(Box::new(Phylogeny)),
        ])
        .unwrap()
    }

    #[test]
    fn the_full_chain_produces_a_tree() {
        let (settings, _guard) = settings_for(">a\nAAAA\n>b\nAAAA\n>c\nGT\n");
        let conduit = full_runner().run(&settings, &Solo).unwrap();

        let Conduit::Tree { db, tree } = conduit else {
            panic!("pipeline did not end in a tree conduit");
        };
        assert_eq!(db.count(), 3);
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn unknown_table_fails_the_pre_flight_check() {
        let (mut settings, _guard) = settings_for(">a\nAAAA\n>b\nAAAA\n");
        settings.scoring_table = String::from("blosum99");
        let result = full_runner().run(&settings, &Solo);
        assert!(matches!(result, Err(Error::PipelineInvalid(_))));
    }

    #[test]
    fn missing_inputs_fail_the_pre_flight_check() {
        let settings = Settings::default();
        let result = full_runner().run(&settings, &Solo);
        assert!(matches!(result, Err(Error::PipelineInvalid(_))));
    }
}
