//! Trial Runner
//!
//! Places agents, drives rounds until every agent has terminated, audits the
//! final assignment, and reports the round count.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::SimConfig;
use crate::error::TrialError;
use crate::placement::place;
use crate::population::Population;
use crate::schedule::generate_round;
use crate::validator::check_stability;

/// Outcome of one successful trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialReport {
    pub agent_count: usize,
    pub rounds: u64,
    /// Sum of NC over all agents
    pub total_contacts: u64,
}

/// Run one trial of `agent_count` agents with fresh placements drawn from `rng`.
pub fn run_trial<R: Rng + ?Sized>(agent_count: usize, config: &SimConfig, rng: &mut R) -> Result<TrialReport, TrialError> {
    config.validate(agent_count)?;

    let metric = config.grid.metric;
    let placement = place(agent_count, config.grid.size, config.grid.shelters, &metric, rng)?;
    let population = Population::from_placement(&placement, &metric)?;

    let (population, report) = drive(population, config, rng)?;

    check_stability(population.agents(), &metric)?;
    Ok(report)
}

/// Run rounds on an initialized population until the all-terminated barrier
/// holds. Returns the final population alongside the report; the stability
/// audit is left to the caller.
pub fn drive<R: Rng + ?Sized>(
    mut population: Population,
    config: &SimConfig,
    rng: &mut R,
) -> Result<(Population, TrialReport), TrialError> {
    let agent_count = population.len();
    let mut rounds = 0u64;

    // A lone agent has nothing to confirm and terminates before any round.
    population.settle()?;

    while !population.all_terminated() {
        let schedule = generate_round(agent_count, config.protocol.contact_pool, rng);
        population.run_round(&schedule, &config.protocol)?;
        rounds += 1;
    }

    let local_unstable: usize = population
        .agents()
        .iter()
        .map(|a| a.unstable_peers(&config.grid.metric).len())
        .sum();
    if local_unstable > 0 {
        warn!(agent_count, rounds, local_unstable, "agents see improving swaps in their knowledge");
    }
    debug!(agent_count, rounds, "trial converged");

    let report = TrialReport {
        agent_count,
        rounds,
        total_contacts: population.total_contacts(),
    };
    Ok((population, report))
}
