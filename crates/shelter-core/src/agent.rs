//! Agent
//!
//! Per-agent protocol state: own placement, gossip-acquired knowledge of
//! peers, contact and confirmation counters, and the local termination
//! predicate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::ProtocolConfig;
use crate::error::{AgentError, PeerFault};
use crate::grid::{AgentId, Cell, Metric};

/// What one agent knows about another, as observed during a contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerRecord {
    pub position: Cell,
    pub shelter: Cell,
    pub distance: u64,
}

/// How a contact confirms the two directions of an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationMode {
    /// Both agents record each other within the contact; the receiver's
    /// counters move synchronously with the actor's.
    #[default]
    Handshake,
    /// The actor pulls the peer's record immediately; the peer only applies
    /// the actor's record on its own next turn.
    Deferred,
}

/// Lifecycle of an agent within a trial. One-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    #[default]
    Active,
    Terminated,
}

/// Confirmation flags held by an agent for one peer.
#[derive(Debug, Clone, Copy, Default)]
struct PeerLink {
    /// We hold the peer's record
    learned: bool,
    /// We know the peer holds our record
    acknowledged: bool,
}

/// Result of a single turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TurnSummary {
    /// Contacts performed during the turn
    pub contacts: usize,
    /// Confirmations gained by the acting agent, inbox included
    pub confirmations_gained: usize,
}

/// A participant in the protocol.
#[derive(Debug, Clone)]
pub struct Agent {
    id: AgentId,
    agent_count: usize,
    position: Cell,
    shelter: Option<Cell>,
    distance: Option<u64>,
    knowledge: BTreeMap<AgentId, PeerRecord>,
    links: Vec<PeerLink>,
    inbox: Vec<(AgentId, PeerRecord)>,
    contact_count: u64,
    confirmations: usize,
    status: AgentStatus,
}

impl Agent {
    /// Create an agent at `position` in a trial of `agent_count` agents.
    /// Every other index in `0..agent_count` is a peer.
    pub fn new(id: AgentId, position: Cell, agent_count: usize) -> Self {
        Self {
            id,
            agent_count,
            position,
            shelter: None,
            distance: None,
            knowledge: BTreeMap::new(),
            links: vec![PeerLink::default(); agent_count],
            inbox: Vec::new(),
            contact_count: 0,
            confirmations: 0,
            status: AgentStatus::Active,
        }
    }

    /// Assign the agent's shelter. May only be called once.
    pub fn assign_shelter(&mut self, shelter: Cell, metric: &impl Metric) -> Result<(), AgentError> {
        if self.shelter.is_some() {
            return Err(AgentError::AlreadyAssigned { agent: self.id });
        }
        self.shelter = Some(shelter);
        self.distance = Some(metric.distance(self.position, shelter));
        Ok(())
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn position(&self) -> Cell {
        self.position
    }

    pub fn shelter(&self) -> Option<Cell> {
        self.shelter
    }

    /// Distance from the agent's position to its own shelter.
    pub fn distance(&self) -> Option<u64> {
        self.distance
    }

    pub fn knowledge(&self) -> &BTreeMap<AgentId, PeerRecord> {
        &self.knowledge
    }

    /// NC: contacts initiated or received.
    pub fn contact_count(&self) -> u64 {
        self.contact_count
    }

    /// CFR: confirmed exchange directions.
    pub fn confirmations(&self) -> usize {
        self.confirmations
    }

    pub fn status(&self) -> AgentStatus {
        self.status
    }

    pub fn is_terminated(&self) -> bool {
        self.status == AgentStatus::Terminated
    }

    /// CFR value at which the agent has confirmed both directions with every peer.
    pub fn confirmation_target(&self) -> usize {
        2 * self.agent_count.saturating_sub(1)
    }

    /// Local termination predicate.
    pub fn has_converged(&self) -> bool {
        self.confirmations >= self.confirmation_target()
    }

    /// Every other agent of the trial.
    pub fn peers(&self) -> impl Iterator<Item = AgentId> + '_ {
        (0..self.agent_count).map(AgentId).filter(move |&p| p != self.id)
    }

    /// The record this agent hands out during a contact.
    pub fn record(&self) -> Result<PeerRecord, AgentError> {
        match (self.shelter, self.distance) {
            (Some(shelter), Some(distance)) => Ok(PeerRecord {
                position: self.position,
                shelter,
                distance,
            }),
            _ => Err(AgentError::ShelterNotAssigned { agent: self.id }),
        }
    }

    /// Reject self references, identities outside the trial, and duplicates.
    pub fn validate_contacts(&self, contacts: &[AgentId]) -> Result<(), AgentError> {
        let mut seen = vec![false; self.agent_count];
        for &peer in contacts {
            let fault = if peer == self.id {
                Some(PeerFault::SelfContact)
            } else if peer.index() >= self.agent_count {
                Some(PeerFault::Unknown)
            } else if seen[peer.index()] {
                Some(PeerFault::Duplicate)
            } else {
                None
            };
            if let Some(fault) = fault {
                return Err(AgentError::InvalidPeer {
                    agent: self.id,
                    peer,
                    fault,
                });
            }
            seen[peer.index()] = true;
        }
        Ok(())
    }

    /// Take one turn: apply pending records, then contact peers in `contacts`
    /// order, at most `protocol.fanout` of them.
    ///
    /// Calling this on an agent whose termination predicate already holds is
    /// a contract violation.
    pub fn round(
        &mut self,
        contacts: &[AgentId],
        peers: &mut Peers<'_>,
        protocol: &ProtocolConfig,
    ) -> Result<TurnSummary, AgentError> {
        if self.is_terminated() || self.has_converged() {
            return Err(AgentError::AlreadyTerminated { agent: self.id });
        }
        let own = self.record()?;
        self.validate_contacts(contacts)?;

        let limit = protocol.fanout.unwrap_or(contacts.len()).min(contacts.len());
        let contacts = &contacts[..limit];

        // Every peer must be able to answer before any state moves.
        for &peer_id in contacts {
            peers.lookup(self.id, peer_id)?.record()?;
        }

        let before = self.confirmations;
        self.apply_inbox();

        let mut performed = 0;
        for &peer_id in contacts {
            let peer = peers.lookup(self.id, peer_id)?;
            self.contact(own, peer, protocol.confirmation)?;
            performed += 1;
        }

        Ok(TurnSummary {
            contacts: performed,
            confirmations_gained: self.confirmations - before,
        })
    }

    /// Pairwise exchange initiated by `self` with `peer`.
    ///
    /// A peer whose predicate already holds answers read-only.
    fn contact(
        &mut self,
        own: PeerRecord,
        peer: &mut Agent,
        mode: ConfirmationMode,
    ) -> Result<(), AgentError> {
        let peer_record = peer.record()?;
        let frozen = peer.is_terminated() || peer.has_converged();
        let before = self.confirmations;

        self.contact_count += 1;
        self.knowledge.insert(peer.id, peer_record);
        self.mark_learned(peer.id);

        match mode {
            ConfirmationMode::Handshake => {
                self.mark_acknowledged(peer.id);
                if !frozen {
                    peer.contact_count += 1;
                    peer.knowledge.insert(self.id, own);
                    peer.mark_learned(self.id);
                    peer.mark_acknowledged(self.id);
                }
            }
            ConfirmationMode::Deferred => {
                if peer.knowledge.contains_key(&self.id) {
                    self.mark_acknowledged(peer.id);
                }
                if !frozen {
                    peer.contact_count += 1;
                    peer.inbox.push((self.id, own));
                }
            }
        }

        trace!(
            actor = %self.id,
            peer = %peer.id,
            gained = self.confirmations - before,
            frozen,
            "contact"
        );
        Ok(())
    }

    /// Apply records delivered by peers since our last turn, in arrival order.
    fn apply_inbox(&mut self) {
        for (sender, record) in std::mem::take(&mut self.inbox) {
            self.knowledge.insert(sender, record);
            self.mark_learned(sender);
            // The sender pulled our record in the same contact.
            self.mark_acknowledged(sender);
        }
    }

    fn mark_learned(&mut self, peer: AgentId) {
        let link = &mut self.links[peer.index()];
        if !link.learned {
            link.learned = true;
            self.confirmations += 1;
        }
    }

    fn mark_acknowledged(&mut self, peer: AgentId) {
        let link = &mut self.links[peer.index()];
        if !link.acknowledged {
            link.acknowledged = true;
            self.confirmations += 1;
        }
    }

    /// Fire the ACTIVE → TERMINATED transition if the predicate holds.
    ///
    /// Returns whether the transition fired now. Fails if the agent would
    /// terminate without a record for every peer.
    pub fn try_terminate(&mut self) -> Result<bool, AgentError> {
        if self.is_terminated() || !self.has_converged() {
            return Ok(false);
        }
        let expected = self.agent_count.saturating_sub(1);
        let complete = self.knowledge.len() == expected && self.peers().all(|p| self.knowledge.contains_key(&p));
        if !complete {
            return Err(AgentError::IncompleteKnowledge {
                agent: self.id,
                known: self.knowledge.len(),
                expected,
            });
        }
        self.inbox.clear();
        self.status = AgentStatus::Terminated;
        Ok(true)
    }

    /// Peers from our knowledge with whom swapping shelters would lower the
    /// pair's combined distance.
    pub fn unstable_peers(&self, metric: &impl Metric) -> Vec<AgentId> {
        let (Some(shelter), Some(distance)) = (self.shelter, self.distance) else {
            return Vec::new();
        };
        self.knowledge
            .iter()
            .filter(|(_, peer)| {
                distance + peer.distance
                    > metric.distance(self.position, peer.shelter) + metric.distance(peer.position, shelter)
            })
            .map(|(&id, _)| id)
            .collect()
    }
}

/// Mutable view over every agent of a trial except the acting one.
pub struct Peers<'a> {
    actor: usize,
    before: &'a mut [Agent],
    after: &'a mut [Agent],
}

impl<'a> Peers<'a> {
    /// Split `agents` into the acting agent and a view over the rest.
    pub fn split(agents: &'a mut [Agent], actor: AgentId) -> Option<(&'a mut Agent, Peers<'a>)> {
        let index = actor.index();
        if index >= agents.len() {
            return None;
        }
        let (before, rest) = agents.split_at_mut(index);
        let (acting, after) = rest.split_first_mut()?;
        Some((
            acting,
            Peers {
                actor: index,
                before,
                after,
            },
        ))
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        let index = id.index();
        if index < self.actor {
            self.before.get_mut(index)
        } else if index == self.actor {
            None
        } else {
            self.after.get_mut(index - self.actor - 1)
        }
    }

    /// Like `get_mut`, but a missing peer is a contract violation by `agent`.
    fn lookup(&mut self, agent: AgentId, peer: AgentId) -> Result<&mut Agent, AgentError> {
        self.get_mut(peer).ok_or(AgentError::InvalidPeer {
            agent,
            peer,
            fault: PeerFault::Unknown,
        })
    }
}
