//! Placement
//!
//! Draws agent positions and shelter cells on the grid.

use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::grid::{Cell, Metric};

/// How shelters are paired with agents after the cells are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShelterPolicy {
    /// Re-pair shelters by improving swaps until no pair benefits from one
    #[default]
    SwapSettled,
    /// Keep the raw random pairing
    Random,
}

/// Positions and shelters for one trial; index `i` belongs to agent `i`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub positions: Vec<Cell>,
    pub shelters: Vec<Cell>,
}

impl Placement {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Iterate over (position, shelter) pairs in agent order.
    pub fn pairs(&self) -> impl Iterator<Item = (Cell, Cell)> + '_ {
        self.positions.iter().copied().zip(self.shelters.iter().copied())
    }

    /// Sum of every agent's distance to its own shelter.
    pub fn total_distance(&self, metric: &impl Metric) -> u64 {
        self.pairs()
            .map(|(position, shelter)| metric.distance(position, shelter))
            .sum()
    }
}

/// Number of cells on a grid of the given size.
pub fn grid_capacity(grid_size: u32) -> usize {
    (grid_size as usize).saturating_mul(grid_size as usize)
}

/// Fails unless a grid of `grid_size` can hold `agent_count` positions and
/// as many distinct shelters.
pub fn check_capacity(agent_count: usize, grid_size: u32) -> Result<(), ConfigError> {
    if agent_count == 0 {
        return Err(ConfigError::NoAgents);
    }
    if grid_capacity(grid_size) < agent_count.saturating_mul(2) {
        return Err(ConfigError::GridTooSmall {
            size: grid_size,
            agents: agent_count,
        });
    }
    Ok(())
}

/// Draw `agent_count` positions and `agent_count` shelters on the grid.
///
/// One sample of 2m distinct cells is taken: the first half become
/// positions, the second half shelters, so no position is also a shelter.
pub fn place<R: Rng + ?Sized>(
    agent_count: usize,
    grid_size: u32,
    policy: ShelterPolicy,
    metric: &impl Metric,
    rng: &mut R,
) -> Result<Placement, ConfigError> {
    check_capacity(agent_count, grid_size)?;

    let cells: Vec<Cell> = index::sample(rng, grid_capacity(grid_size), agent_count * 2)
        .into_iter()
        .map(|i| Cell::from_index(i, grid_size))
        .collect();
    let (positions, shelters) = cells.split_at(agent_count);

    let mut placement = Placement {
        positions: positions.to_vec(),
        shelters: shelters.to_vec(),
    };

    if policy == ShelterPolicy::SwapSettled {
        let swaps = settle_shelters(&mut placement, metric);
        debug!(agent_count, swaps, "settled shelter pairing");
    }

    Ok(placement)
}

/// Swap shelters between pairs until no swap lowers a pair's combined
/// distance. Returns the number of swaps performed.
///
/// Each swap strictly lowers the total distance, so this terminates.
pub fn settle_shelters(placement: &mut Placement, metric: &impl Metric) -> usize {
    let n = placement.len();
    let mut swaps = 0;

    loop {
        let mut improved = false;
        for i in 0..n {
            for j in (i + 1)..n {
                let (pi, pj) = (placement.positions[i], placement.positions[j]);
                let (si, sj) = (placement.shelters[i], placement.shelters[j]);
                let current = metric.distance(pi, si) + metric.distance(pj, sj);
                let swapped = metric.distance(pi, sj) + metric.distance(pj, si);
                if current > swapped {
                    placement.shelters.swap(i, j);
                    swaps += 1;
                    improved = true;
                }
            }
        }
        if !improved {
            return swaps;
        }
    }
}
