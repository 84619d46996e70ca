//! Round Scheduler
//!
//! Fresh randomized contact orders, generated once per round.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::grid::AgentId;

/// Which peers an acting agent may contact during its turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContactPool {
    /// Every other agent
    #[default]
    AllPeers,
    /// Only agents that have not yet acted this round
    Pending,
}

/// One agent's turn: who acts, and in which order it contacts peers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub actor: AgentId,
    pub contacts: Vec<AgentId>,
}

/// The schedule of a single round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundSchedule {
    pub turns: Vec<Turn>,
}

impl RoundSchedule {
    /// Acting order of the round.
    pub fn acting_order(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.turns.iter().map(|t| t.actor)
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// Generate the schedule of one round for `agent_count` agents.
///
/// The acting order is a uniform permutation of all agents. Each actor's
/// contact order is an independent uniform permutation of its pool.
pub fn generate_round<R: Rng + ?Sized>(agent_count: usize, pool: ContactPool, rng: &mut R) -> RoundSchedule {
    let mut acting: Vec<AgentId> = (0..agent_count).map(AgentId).collect();
    acting.shuffle(rng);

    let turns = acting
        .iter()
        .enumerate()
        .map(|(slot, &actor)| {
            let mut contacts: Vec<AgentId> = match pool {
                ContactPool::AllPeers => (0..agent_count).map(AgentId).filter(|&p| p != actor).collect(),
                ContactPool::Pending => acting[slot + 1..].to_vec(),
            };
            contacts.shuffle(rng);
            Turn { actor, contacts }
        })
        .collect();

    RoundSchedule { turns }
}
