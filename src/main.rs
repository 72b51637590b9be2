use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use rand::{rngs::StdRng, SeedableRng};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ring_closure::{
    chelate::check_chelates,
    closability::ClosabilityMode,
    config::RingClosureParameters,
    context::RingClosureContext,
    enumerate::{CombinationEnumerator, ParallelMode},
    loader,
    graph::AssemblyGraph,
    ring::Ring,
};

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
enum Search {
    /// One combination drawn according to the ring-size bias.
    Random,
    /// Every non-redundant maximal combination.
    All,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// JSON file holding the assembly graph and its molecule.
    path: PathBuf,

    #[arg(short, long, default_value = "all")]
    search: Search,

    /// TOML parameter file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Closability mode, overriding the parameter file.
    #[arg(short, long)]
    mode: Option<ClosabilityMode>,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    #[arg(long, default_value = "none")]
    parallel: ParallelMode,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long)]
    verbose: bool,
}

/// Apply `rings` to `graph`, replacing earlier ones, and print them with the
/// verdict of the chelate rules.
fn report(n: usize, graph: &mut AssemblyGraph, rings: &[Ring], params: &RingClosureParameters) -> Result<()> {
    graph.clear_rings();
    for ring in rings {
        graph.add_ring(ring.clone())?;
    }
    let chelates = if params.metal_coordinating_classes.is_empty() {
        ""
    } else if check_chelates(graph, params)? {
        " [chelates ok]"
    } else {
        " [chelates rejected]"
    };

    let ends: Vec<String> = rings
        .iter()
        .map(|r| format!("{}-{}({})", r.head().index(), r.tail().index(), r.len()))
        .collect();
    println!("{n}: {}{chelates}", ends.join(" "));
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    let mut params = match &cli.config {
        Some(p) => RingClosureParameters::from_file(p)?,
        None => RingClosureParameters::default(),
    };
    if let Some(mode) = cli.mode {
        params.mode = mode;
    }
    let ctx = RingClosureContext::new(params)?;

    let (mut graph, molecule) = loader::parse(&cli.path)
        .with_context(|| format!("cannot load {}", cli.path.display()))?;
    if graph.vertex_count() == 0 {
        bail!("{} holds an empty assembly graph", cli.path.display());
    }
    info!(
        vertices = graph.vertex_count(),
        atoms = molecule.atom_count(),
        "loaded system"
    );

    let enumerator = CombinationEnumerator::new(&ctx).with_parallel_mode(cli.parallel);
    let combinations = match cli.search {
        Search::Random => {
            let mut rng = StdRng::seed_from_u64(cli.seed);
            vec![enumerator.random_one(&graph, &molecule, &mut rng)?]
        }
        Search::All => enumerator.all_combinations(&graph, &molecule)?,
    };
    for (n, rings) in combinations.iter().enumerate() {
        report(n, &mut graph, rings, ctx.params())?;
    }

    let stats = ctx.stats();
    info!(
        torsional_searches = stats.torsional_searches(),
        archive_hits = stats.archive_hits(),
        rejected_pairs = stats.rejected_pairs(),
        "done"
    );
    Ok(())
}
