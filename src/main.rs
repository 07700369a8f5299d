use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use phyloalign::cluster::{LocalCluster, Solo, Transport};
use phyloalign::error::Error;
use phyloalign::pipeline::modules::{Load, Pairwise, Phylogeny};
use phyloalign::pipeline::{Conduit, Runner, Settings, Timed};
use phyloalign::{loader, pairwise, phylogeny, scoring};

#[derive(Parser)]
#[command(name = "phyloalign")]
#[command(version = "0.1.0")]
#[command(about = "Distance-matrix and guide-tree engine for progressive MSA", long_about = None)]
struct Cli {
    /// Sequence files to load, in order
    #[arg(required_unless_present = "list")]
    files: Vec<PathBuf>,

    /// Pairwise algorithm to align sequence pairs with
    #[arg(short = '1', long, default_value = "default")]
    pairwise: String,

    /// Phylogeny algorithm to build the guide tree with
    #[arg(short = '2', long, default_value = "default")]
    phylogeny: String,

    /// Scoring table to align sequences with
    #[arg(short = 's', long = "scoring-table", default_value = "default")]
    scoring_table: String,

    /// Input file parser
    #[arg(long, default_value = "default")]
    parser: String,

    /// Number of in-process ranks to emulate the cluster with
    #[arg(long, default_value_t = 1)]
    ranks: usize,

    /// Write the guide tree to this file instead of stdout
    #[arg(long)]
    newick: Option<PathBuf>,

    /// List registered algorithms, parsers and scoring tables, then exit
    #[arg(long, default_value_t = false)]
    list: bool,
}

fn execute<T: Transport + 'static>(settings: &Settings, transport: &T) -> Result<String, Error> {
    let runner = Runner::new(vec![
        Timed::new(Box::new(Load)),
        Timed::new(Box::new(Pairwise)),
        Timed::new(Box::new(Phylogeny)),
    ])?;

    match runner.run(settings, transport)? {
        Conduit::Tree { db, tree } => Ok(tree.to_newick(&|leaf| {
            db.get(leaf)
                .description
                .map(|desc| desc.split_whitespace().next().unwrap_or(desc).to_string())
                .unwrap_or_else(|| leaf.to_string())
        })),
        other => Err(Error::InternalInvariant(format!(
            "pipeline ended in a {:?} conduit",
            other.kind()
        ))),
    }
}

fn run(cli: &Cli) -> Result<String, Error> {
    let settings = Settings {
        inputs: cli.files.clone(),
        parser: cli.parser.clone(),
        pairwise: cli.pairwise.clone(),
        phylogeny: cli.phylogeny.clone(),
        scoring_table: cli.scoring_table.clone(),
    };

    if cli.ranks <= 1 {
        return execute(&settings, &Solo);
    }

    let settings = &settings;
    let mut results = LocalCluster::run(cli.ranks, |transport| execute(settings, &transport));
    results.swap_remove(0)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if cli.list {
        println!("pairwise algorithms: {}", pairwise::list().join(", "));
        println!("phylogeny algorithms: {}", phylogeny::list().join(", "));
        println!("scoring tables: {}", scoring::list().join(", "));
        println!("parsers: {}", loader::list().join(", "));
        return ExitCode::SUCCESS;
    }

    match run(&cli) {
        Ok(newick) => {
            let written = match &cli.newick {
                Some(path) => std::fs::write(path, newick + "\n")
                    .map_err(|err| Error::Input(err.to_string())),
                None => {
                    println!("{newick}");
                    Ok(())
                }
            };
            match written {
                Ok(()) => {
                    info!("guide tree produced");
                    ExitCode::SUCCESS
                }
                Err(err) => {
                    eprintln!("error: {err}");
                    ExitCode::from(err.exit_code() as u8)
                }
            }
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
