//! Population
//!
//! The agents of one trial, driven turn by turn through a round schedule.
//! Termination is detected per agent; the population only reduces the local
//! predicates into an all-terminated barrier.

use tracing::{debug, trace};

use crate::agent::{Agent, Peers, TurnSummary};
use crate::config::ProtocolConfig;
use crate::error::{AgentError, PeerFault};
use crate::grid::{AgentId, Metric};
use crate::placement::Placement;
use crate::schedule::{RoundSchedule, Turn};

/// Totals for one executed round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoundSummary {
    /// Turns actually taken (terminated agents sit out)
    pub turns: usize,
    pub contacts: usize,
    pub confirmations_gained: usize,
    /// Agents whose termination fired during this round
    pub terminated: usize,
}

#[derive(Debug, Clone)]
pub struct Population {
    agents: Vec<Agent>,
}

impl Population {
    /// Create one agent per placement slot and assign its shelter.
    pub fn from_placement(placement: &Placement, metric: &impl Metric) -> Result<Self, AgentError> {
        let count = placement.len();
        let agents = placement
            .pairs()
            .enumerate()
            .map(|(i, (position, shelter))| -> Result<Agent, AgentError> {
                let mut agent = Agent::new(AgentId(i), position, count);
                agent.assign_shelter(shelter, metric)?;
                Ok(agent)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { agents })
    }

    pub fn from_agents(agents: Vec<Agent>) -> Self {
        Self { agents }
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn into_agents(self) -> Vec<Agent> {
        self.agents
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(id.index())
    }

    /// Global barrier: every agent has terminated.
    pub fn all_terminated(&self) -> bool {
        self.agents.iter().all(Agent::is_terminated)
    }

    pub fn terminated_count(&self) -> usize {
        self.agents.iter().filter(|a| a.is_terminated()).count()
    }

    /// Sum of NC over all agents.
    pub fn total_contacts(&self) -> u64 {
        self.agents.iter().map(Agent::contact_count).sum()
    }

    /// Fire the termination transition for every agent whose predicate holds.
    /// Returns how many transitioned.
    pub fn settle(&mut self) -> Result<usize, AgentError> {
        let mut fired = 0;
        for agent in &mut self.agents {
            if agent.try_terminate()? {
                trace!(agent = %agent.id(), cfr = agent.confirmations(), "terminated");
                fired += 1;
            }
        }
        Ok(fired)
    }

    /// Run a single turn. An agent that has already terminated, or whose
    /// predicate was satisfied by others' contacts, sits out.
    pub fn take_turn(&mut self, turn: &Turn, protocol: &ProtocolConfig) -> Result<Option<TurnSummary>, AgentError> {
        let (actor, mut peers) = Peers::split(&mut self.agents, turn.actor).ok_or(AgentError::InvalidPeer {
            agent: turn.actor,
            peer: turn.actor,
            fault: PeerFault::Unknown,
        })?;

        if actor.is_terminated() {
            return Ok(None);
        }
        if actor.has_converged() {
            actor.try_terminate()?;
            return Ok(None);
        }

        let summary = actor.round(&turn.contacts, &mut peers, protocol)?;
        actor.try_terminate()?;
        Ok(Some(summary))
    }

    /// Execute every turn of `schedule`, then fire pending terminations.
    pub fn run_round(&mut self, schedule: &RoundSchedule, protocol: &ProtocolConfig) -> Result<RoundSummary, AgentError> {
        let terminated_before = self.terminated_count();
        let mut summary = RoundSummary::default();

        for turn in &schedule.turns {
            if let Some(taken) = self.take_turn(turn, protocol)? {
                summary.turns += 1;
                summary.contacts += taken.contacts;
                summary.confirmations_gained += taken.confirmations_gained;
            }
        }
        self.settle()?;

        summary.terminated = self.terminated_count() - terminated_before;
        debug!(
            turns = summary.turns,
            contacts = summary.contacts,
            terminated = summary.terminated,
            remaining = self.len() - self.terminated_count(),
            "round complete"
        );
        Ok(summary)
    }
}
