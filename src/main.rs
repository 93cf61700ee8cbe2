use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use routeset_gen::config::Parameters;
use routeset_gen::demand::{Ds, Durations, Odx};
use routeset_gen::error::Error;
use routeset_gen::evolutionary::Algorithm;
use routeset_gen::model::Route;
use routeset_gen::road_graph::RoadGraph;

#[derive(Parser, Debug)]
#[command(author, version, about = "Evolutionary bus route set optimizer")]
struct Cli {
    /// Path to the road graph JSON artifact
    #[arg(long, default_value = "data/road_graph.json")]
    road_graph: PathBuf,

    /// Path to the filtered ODX matrix JSON artifact
    #[arg(long, default_value = "data/odx.json")]
    odx: PathBuf,

    /// Path to the dominated-stop-pairs (DS) JSON artifact
    #[arg(long, default_value = "data/ds.json")]
    ds: PathBuf,

    /// Path to the pairwise stop durations JSON artifact
    #[arg(long, default_value = "data/durations.json")]
    durations: PathBuf,

    /// Path to the GA parameters config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Base directory under which df.csv / meta.json / saved_population are
    /// written. For `scratch` and `from-routes`, the actual run directory is
    /// a subdirectory named from the GA parameters (mirroring the Python
    /// original's `get_experiment_name_suffix`), e.g.
    /// `<out>/r=40,pop=100,es=10,ts=5,pms=0.1,pdel=0.05`. For `resume`, `--out`
    /// is used as the literal run directory.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Seed the RNG so tournament draws, crossover swaps, and mutation
    /// sampling are reproducible (spec.md section 5: "deterministic given a
    /// seeded random source"). Omit for a fresh, non-reproducible seed.
    #[arg(long)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build an initial route set greedily and run the search from it
    Scratch {
        #[arg(long)]
        n_routes: usize,
        #[arg(long)]
        n_iterations: usize,
    },
    /// Resume a previously checkpointed run
    Resume {
        /// Directory of a previously checkpointed experiment
        saved_dir: PathBuf,
        #[arg(long)]
        n_iterations: usize,
        /// Overwrite the run in place instead of writing to `--out`
        #[arg(long)]
        append: bool,
    },
    /// Run the search starting from a caller-supplied set of routes
    FromRoutes {
        /// JSON file containing a list of stop-id sequences
        routes: PathBuf,
        #[arg(long)]
        n_iterations: usize,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(Error::InvalidInput(msg)) => {
            log::error!("invalid input: {msg}");
            ExitCode::FAILURE
        }
        Err(Error::InvariantViolation(msg)) => {
            log::error!("invariant violation: {msg}");
            ExitCode::FAILURE
        }
        Err(e) => {
            log::error!("run failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> routeset_gen::error::Result<()> {
    let params = match &cli.config {
        Some(path) => Parameters::load(path)?,
        None => Parameters::default(),
    };

    log::info!("loading road graph from {}", cli.road_graph.display());
    let road_graph = RoadGraph::load(&cli.road_graph)?;
    road_graph.print_stats();

    // Circular-route exclusion (spec.md section 4.4) needs the schedule's
    // circular routes; this CLI has no schedule artifact of its own, so
    // demand tables are loaded without any exclusions applied.
    let circular_routes: Vec<Route> = Vec::new();

    log::info!("loading ODX matrix from {}", cli.odx.display());
    let odx = Odx::load(&cli.odx, &circular_routes)?;

    log::info!("loading DS table from {}", cli.ds.display());
    let ds = Ds::load(&cli.ds, &odx, &circular_routes)?;

    log::info!("loading durations from {}", cli.durations.display());
    let durations = Durations::load(&cli.durations)?;

    let mut algorithm = Algorithm::new(
        Arc::new(road_graph),
        Arc::new(durations),
        Arc::new(odx),
        Arc::new(ds),
        params,
    );
    if let Some(seed) = cli.seed {
        algorithm = algorithm.with_seed(seed);
    }

    let out_dir = cli.out.as_deref();

    let rows = match cli.command {
        Command::Scratch { n_routes, n_iterations } => {
            algorithm.run_from_scratch(n_routes, n_iterations, out_dir)?
        }
        Command::Resume { saved_dir, n_iterations, append } => {
            let resume_out = if append { None } else { out_dir };
            algorithm.run_from_saved(&saved_dir, n_iterations, append, resume_out)?
        }
        Command::FromRoutes { routes, n_iterations } => {
            let text = std::fs::read_to_string(&routes)?;
            let routes: Vec<Route> = serde_json::from_str(&text)?;
            algorithm.run_from_routes(routes, n_iterations, out_dir)?
        }
    };

    if let Some(last) = rows.last() {
        log::info!(
            "final fitness {:.2}, satisfied demand {:.2}%",
            last.fitness,
            last.satisfied_demand_pct
        );
    }

    Ok(())
}
