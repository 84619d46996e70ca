//! Grid Geometry
//!
//! Cells on an n×n grid, agent identities, and the distance functions
//! between cells.

use serde::{Deserialize, Serialize};

/// A cell on the grid, addressed by row and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub row: u32,
    pub col: u32,
}

impl Cell {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Cell for a flat index into a grid of the given size (row-major).
    pub fn from_index(index: usize, size: u32) -> Self {
        let size = size as usize;
        Self {
            row: (index / size) as u32,
            col: (index % size) as u32,
        }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Identity of an agent: its index in the trial's agent collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub usize);

impl AgentId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "agent_{}", self.0)
    }
}

/// A pure distance function between two cells.
///
/// Implementations must be symmetric and satisfy the triangle inequality,
/// otherwise the stability audit is meaningless. Distances are `u64`: the sum
/// of two distances must not overflow for any `u32` grid side.
pub trait Metric {
    fn distance(&self, a: Cell, b: Cell) -> u64;
}

/// Taxicab distance: |Δrow| + |Δcol|.
#[derive(Debug, Clone, Copy, Default)]
pub struct Manhattan;

impl Metric for Manhattan {
    fn distance(&self, a: Cell, b: Cell) -> u64 {
        u64::from(a.row.abs_diff(b.row)) + u64::from(a.col.abs_diff(b.col))
    }
}

/// King-move distance: max(|Δrow|, |Δcol|).
#[derive(Debug, Clone, Copy, Default)]
pub struct Chebyshev;

impl Metric for Chebyshev {
    fn distance(&self, a: Cell, b: Cell) -> u64 {
        u64::from(a.row.abs_diff(b.row).max(a.col.abs_diff(b.col)))
    }
}

/// Metric selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    #[default]
    Manhattan,
    Chebyshev,
}

impl Metric for MetricKind {
    fn distance(&self, a: Cell, b: Cell) -> u64 {
        match self {
            MetricKind::Manhattan => Manhattan.distance(a, b),
            MetricKind::Chebyshev => Chebyshev.distance(a, b),
        }
    }
}

impl<M: Metric + ?Sized> Metric for &M {
    fn distance(&self, a: Cell, b: Cell) -> u64 {
        (**self).distance(a, b)
    }
}
