//! Error Types
//!
//! Configuration errors, protocol misuse, and correctness violations.

use thiserror::Error;

use crate::grid::AgentId;
use crate::validator::ValidationError;

/// Why a peer reference passed to a round was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerFault {
    /// The agent was asked to contact itself
    SelfContact,
    /// The identity does not belong to this trial
    Unknown,
    /// The identity appears twice in one contact order
    Duplicate,
}

impl std::fmt::Display for PeerFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeerFault::SelfContact => write!(f, "self contact"),
            PeerFault::Unknown => write!(f, "unknown agent"),
            PeerFault::Duplicate => write!(f, "duplicate contact"),
        }
    }
}

/// Errors raised by misuse of the per-agent protocol.
///
/// These are contract violations by the caller or the scheduler and are
/// always fatal to the trial.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentError {
    #[error("agent {agent} cannot contact {peer}: {fault}")]
    InvalidPeer {
        agent: AgentId,
        peer: AgentId,
        fault: PeerFault,
    },

    #[error("agent {agent} already has a shelter assigned")]
    AlreadyAssigned { agent: AgentId },

    #[error("agent {agent} has no shelter assigned")]
    ShelterNotAssigned { agent: AgentId },

    #[error("agent {agent} has already converged and must not act again")]
    AlreadyTerminated { agent: AgentId },

    #[error("agent {agent} terminated knowing {known} of {expected} peers")]
    IncompleteKnowledge {
        agent: AgentId,
        known: usize,
        expected: usize,
    },
}

/// A pair of agents that would both be better off swapping shelters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "unstable pair ({first}, {second}) with {agent_count} agents: \
     {own_first} + {own_second} > {swapped_first} + {swapped_second}"
)]
pub struct StabilityViolation {
    pub agent_count: usize,
    pub first: AgentId,
    pub second: AgentId,
    /// Distance from `first` to its own shelter
    pub own_first: u64,
    /// Distance from `second` to its own shelter
    pub own_second: u64,
    /// Distance from `first` to the shelter of `second`
    pub swapped_first: u64,
    /// Distance from `second` to the shelter of `first`
    pub swapped_second: u64,
}

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("fanout must allow at least one contact per turn")]
    ZeroFanout,

    #[error("a trial needs at least one agent")]
    NoAgents,

    #[error("grid of {size}x{size} cannot hold {agents} agents and their shelters")]
    GridTooSmall { size: u32, agents: usize },
}

/// Any error that aborts a trial.
#[derive(Debug, Error)]
pub enum TrialError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("protocol error: {0}")]
    Agent(#[from] AgentError),

    #[error("stability violation: {0}")]
    Unstable(#[from] StabilityViolation),
}

impl From<ValidationError> for TrialError {
    fn from(e: ValidationError) -> Self {
        match e {
            ValidationError::Unstable(v) => TrialError::Unstable(v),
            ValidationError::Agent(a) => TrialError::Agent(a),
        }
    }
}
