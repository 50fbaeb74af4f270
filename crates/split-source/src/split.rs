//! Splits: independently assignable units of source work.

use serde::{Deserialize, Serialize};

/// One unit of fake-source work.
///
/// `id`, `row_limit` and `seed` are fixed at creation. `produced` is the
/// index of the next row to generate and is advanced only by the reader
/// that currently owns the split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FakeSourceSplit {
    /// Split id, unique within a source instance
    pub id: u64,

    /// Rows to produce; `None` for a perpetual split of an unbounded source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_limit: Option<u64>,

    /// Seed of every row of this split
    pub seed: u64,

    /// Rows produced so far
    #[serde(default)]
    pub produced: u64,
}

impl FakeSourceSplit {
    /// A split producing exactly `row_limit` rows.
    pub fn bounded(id: u64, row_limit: u64, seed: u64) -> Self {
        Self {
            id,
            row_limit: Some(row_limit),
            seed,
            produced: 0,
        }
    }

    /// A split producing rows until cancelled.
    pub fn unbounded(id: u64, seed: u64) -> Self {
        Self {
            id,
            row_limit: None,
            seed,
            produced: 0,
        }
    }

    /// Host-facing split identifier.
    pub fn split_id(&self) -> String {
        format!("fake-split-{}", self.id)
    }

    /// Whether every row of a bounded split has been produced.
    pub fn is_exhausted(&self) -> bool {
        self.row_limit.is_some_and(|limit| self.produced >= limit)
    }

    /// Rows left to produce, or `None` when unbounded.
    pub fn remaining(&self) -> Option<u64> {
        self.row_limit.map(|limit| limit.saturating_sub(self.produced))
    }

    /// `produced` never exceeds `row_limit`.
    pub fn is_consistent(&self) -> bool {
        self.row_limit.is_none_or(|limit| self.produced <= limit)
    }
}

/// Lifecycle of a split as seen by a reader.
///
/// `Unassigned -> Assigned -> Producing -> (Finished | Suspended)`.
/// `Finished` is terminal for bounded splits. Perpetual splits only leave
/// `Producing` to sit in `Suspended` while a checkpoint is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitPhase {
    Unassigned,
    Assigned,
    Producing,
    Suspended,
    Finished,
}
