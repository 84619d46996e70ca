//! Shelter Gossip Simulation Library
//!
//! Agents on a grid, each assigned a shelter, exchange records pairwise in
//! randomly ordered rounds until every agent has confirmed an exchange with
//! every peer. A central audit then checks that no two agents could lower
//! their combined distance by swapping shelters.
//!
//! # Modules
//!
//! - [`grid`]: Cells, agent identities, distance metrics
//! - [`placement`]: Drawing positions and shelters
//! - [`agent`]: Per-agent protocol state and the pairwise exchange
//! - [`schedule`]: Randomized per-round contact orders
//! - [`population`]: Turn execution and the termination barrier
//! - [`validator`]: Pairwise stability audit
//! - [`trial`]: End-to-end trial runner
//! - [`stats`]: Round-count sink and aggregation
//! - [`config`]: TOML configuration

pub mod agent;
pub mod config;
pub mod error;
pub mod grid;
pub mod placement;
pub mod population;
pub mod schedule;
pub mod stats;
pub mod trial;
pub mod validator;

pub use agent::{Agent, AgentStatus, ConfirmationMode, PeerRecord, Peers, TurnSummary};
pub use config::{default_config_toml, GridConfig, ProtocolConfig, SimConfig};
pub use error::{AgentError, ConfigError, PeerFault, StabilityViolation, TrialError};
pub use grid::{AgentId, Cell, Chebyshev, Manhattan, Metric, MetricKind};
pub use placement::{place, settle_shelters, Placement, ShelterPolicy};
pub use population::{Population, RoundSummary};
pub use schedule::{generate_round, ContactPool, RoundSchedule, Turn};
pub use stats::{AgentCountSummary, RoundStats, SummaryLog, TrialSink};
pub use trial::{drive, run_trial, TrialReport};
pub use validator::{check_stability, ValidationError};
