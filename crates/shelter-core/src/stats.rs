//! Statistics Output
//!
//! Collects per-trial round counts and aggregates them by agent count.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use crate::trial::TrialReport;

/// Destination for per-trial results. Implementations must accept writes
/// from several trials at once without interleaving them.
pub trait TrialSink: Send + Sync {
    fn record(&self, agent_count: usize, rounds: u64);

    fn record_report(&self, report: &TrialReport) {
        self.record(report.agent_count, report.rounds);
    }
}

/// Aggregated rounds for one agent count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentCountSummary {
    pub agent_count: usize,
    pub trials: usize,
    pub mean_rounds: f64,
    pub min_rounds: u64,
    pub max_rounds: u64,
}

/// Sink that keeps every round count in memory.
#[derive(Debug, Default)]
pub struct RoundStats {
    rounds: Mutex<BTreeMap<usize, Vec<u64>>>,
}

impl RoundStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// One row per distinct agent count, ascending.
    pub fn summary(&self) -> Vec<AgentCountSummary> {
        let rounds = self.rounds.lock().unwrap_or_else(|e| e.into_inner());
        rounds
            .iter()
            .filter(|(_, samples)| !samples.is_empty())
            .map(|(&agent_count, samples)| AgentCountSummary {
                agent_count,
                trials: samples.len(),
                mean_rounds: samples.iter().sum::<u64>() as f64 / samples.len() as f64,
                min_rounds: samples.iter().copied().min().unwrap_or(0),
                max_rounds: samples.iter().copied().max().unwrap_or(0),
            })
            .collect()
    }

    /// Row for a single agent count, if any trial recorded it.
    pub fn summary_for(&self, agent_count: usize) -> Option<AgentCountSummary> {
        self.summary().into_iter().find(|row| row.agent_count == agent_count)
    }

    pub fn trial_count(&self) -> usize {
        let rounds = self.rounds.lock().unwrap_or_else(|e| e.into_inner());
        rounds.values().map(Vec::len).sum()
    }

    /// Write `<agent_count> <mean_round_count>` lines.
    pub fn write_lines<W: Write>(&self, mut writer: W) -> io::Result<()> {
        for row in self.summary() {
            write_line(&mut writer, &row)?;
        }
        writer.flush()
    }

    /// Summary rendered as pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.summary())
    }
}

/// Means always carry a fractional part (`7.0`, `2.5`).
fn write_line<W: Write>(writer: &mut W, row: &AgentCountSummary) -> io::Result<()> {
    writeln!(writer, "{} {:?}", row.agent_count, row.mean_rounds)
}

/// Summary file that receives one line per finished agent count. Each line is
/// synced to disk before `append` returns, so an aborted sweep keeps every
/// completed count.
#[derive(Debug)]
pub struct SummaryLog {
    file: File,
}

impl SummaryLog {
    /// Create the file, replacing any previous content.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self {
            file: File::create(path)?,
        })
    }

    pub fn append(&mut self, row: &AgentCountSummary) -> io::Result<()> {
        write_line(&mut self.file, row)?;
        self.file.flush()?;
        self.file.sync_all()
    }
}

impl TrialSink for RoundStats {
    fn record(&self, agent_count: usize, rounds: u64) {
        let mut map = self.rounds.lock().unwrap_or_else(|e| e.into_inner());
        map.entry(agent_count).or_default().push(rounds);
    }
}
