//! Shelter Gossip Simulation
//!
//! Runs repeated trials for each requested agent count and writes the mean
//! number of rounds to convergence per agent count.

use clap::Parser;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use shelter_core::{default_config_toml, run_trial, RoundStats, SimConfig, SummaryLog, TrialError, TrialSink};

/// Command line arguments for the simulation
#[derive(Parser, Debug)]
#[command(name = "shelter_sim")]
#[command(about = "Decentralized shelter-assignment gossip simulation")]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Agent counts to simulate, comma separated
    #[arg(long, value_delimiter = ',', default_value = "2,3,5,8,13")]
    agents: Vec<usize>,

    /// Trials per agent count
    #[arg(long, default_value_t = 10)]
    trials: u64,

    /// Random seed for reproducibility
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Override the grid size from the configuration
    #[arg(long)]
    grid_size: Option<u32>,

    /// Override the contacts performed per turn
    #[arg(long)]
    fanout: Option<usize>,

    /// File receiving one `<agent_count> <mean_rounds>` line per agent count
    #[arg(long, default_value = "out.log")]
    output: PathBuf,

    /// Print the summary as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(long, short)]
    verbose: bool,

    /// Print the default configuration and exit
    #[arg(long)]
    print_default_config: bool,
}

#[derive(Debug, Error)]
enum SweepError {
    #[error(transparent)]
    Trial(#[from] TrialError),

    #[error("could not write {path}: {source}")]
    Output { path: PathBuf, source: io::Error },
}

/// Seed for one trial, distinct per (agent count, trial index).
fn trial_seed(base: u64, agent_count: usize, trial: u64) -> u64 {
    base.wrapping_mul(0x9E37_79B9_7F4A_7C15)
        .wrapping_add((agent_count as u64) << 32)
        .wrapping_add(trial)
}

fn load_config(args: &Args) -> Result<SimConfig, TrialError> {
    let mut config = match &args.config {
        Some(path) => SimConfig::from_file(path)?,
        None => SimConfig::default(),
    };
    if let Some(size) = args.grid_size {
        config.grid.size = size;
    }
    if args.fanout.is_some() {
        config.protocol.fanout = args.fanout;
    }
    // Fail before the first trial rather than midway through the sweep.
    for &agent_count in &args.agents {
        config.validate(agent_count)?;
    }
    Ok(config)
}

fn run(args: &Args) -> Result<RoundStats, SweepError> {
    let config = load_config(args)?;
    let output_error = |source: io::Error| SweepError::Output {
        path: args.output.clone(),
        source,
    };
    let mut log = SummaryLog::create(&args.output).map_err(output_error)?;
    info!(
        grid = config.grid.size,
        metric = ?config.grid.metric,
        confirmation = ?config.protocol.confirmation,
        fanout = ?config.protocol.fanout,
        "starting sweep"
    );

    let stats = RoundStats::new();
    for &agent_count in &args.agents {
        for trial in 0..args.trials {
            let mut rng = SmallRng::seed_from_u64(trial_seed(args.seed, agent_count, trial));
            let report = run_trial(agent_count, &config, &mut rng)?;
            stats.record_report(&report);
        }
        if let Some(row) = stats.summary_for(agent_count) {
            log.append(&row).map_err(output_error)?;
            info!(
                agent_count,
                trials = row.trials,
                mean_rounds = row.mean_rounds,
                "agent count complete"
            );
        }
    }
    Ok(stats)
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.print_default_config {
        print!("{}", default_config_toml());
        return ExitCode::SUCCESS;
    }

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let stats = match run(&args) {
        Ok(stats) => stats,
        Err(e) => {
            error!("sweep failed: {}", e);
            return ExitCode::FAILURE;
        }
    };
    info!(path = %args.output.display(), trials = stats.trial_count(), "wrote summary");

    if args.json {
        match stats.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("could not render summary: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}
