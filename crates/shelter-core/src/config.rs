//! Configuration loading for trials.
//!
//! Grid and protocol settings are loaded from a TOML configuration file.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::agent::ConfirmationMode;
use crate::error::ConfigError;
use crate::grid::MetricKind;
use crate::placement::{check_capacity, ShelterPolicy};
use crate::schedule::ContactPool;

/// Complete trial configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Grid geometry and placement
    #[serde(default)]
    pub grid: GridConfig,
    /// Gossip protocol behaviour
    #[serde(default)]
    pub protocol: ProtocolConfig,
}

impl SimConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parses configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Serializes the configuration as a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Fails fast if a trial with `agent_count` agents cannot run on this grid.
    pub fn validate(&self, agent_count: usize) -> Result<(), ConfigError> {
        if self.protocol.fanout == Some(0) {
            return Err(ConfigError::ZeroFanout);
        }
        check_capacity(agent_count, self.grid.size)
    }
}

/// Grid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Side length n of the n×n grid
    pub size: u32,
    /// Distance function between cells
    pub metric: MetricKind,
    /// How shelters are paired with agents
    pub shelters: ShelterPolicy,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            size: 100,
            metric: MetricKind::Manhattan,
            shelters: ShelterPolicy::SwapSettled,
        }
    }
}

/// Protocol configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Confirmation accounting for a contact
    pub confirmation: ConfirmationMode,
    /// Maximum contacts per turn; the whole contact order when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fanout: Option<usize>,
    /// Peers an actor may contact during its turn
    pub contact_pool: ContactPool,
}

/// Generates a default configuration file content.
pub fn default_config_toml() -> String {
    r#"# Shelter gossip configuration

[grid]
size = 100
metric = "manhattan"      # manhattan | chebyshev
shelters = "swap_settled" # swap_settled | random

[protocol]
confirmation = "handshake" # handshake | deferred
contact_pool = "all_peers" # all_peers | pending

# Contacts per turn. Without a fanout every actor contacts all of its peers,
# so a trial always takes 1 round (handshake) or 2 rounds (deferred) and the
# sweep output is constant. Set a small fanout to measure convergence.
# fanout = 1
"#
    .to_string()
}
