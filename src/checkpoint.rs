//! Checkpoint payload of the fake source.
//!
//! The payload is the enumerator state with reader progress merged in. It is
//! persisted through the `checkpoint` crate and read back on restart.

use checkpoint::Checkpoint;
use serde::{Deserialize, Serialize};
use split_source::EnumeratorState;

use crate::source::PLUGIN_NAME;

/// Durable snapshot of split assignment and progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FakeSourceCheckpoint(pub EnumeratorState);

impl FakeSourceCheckpoint {
    pub fn state(&self) -> &EnumeratorState {
        &self.0
    }

    pub fn into_state(self) -> EnumeratorState {
        self.0
    }
}

impl From<EnumeratorState> for FakeSourceCheckpoint {
    fn from(state: EnumeratorState) -> Self {
        Self(state)
    }
}

impl Checkpoint for FakeSourceCheckpoint {
    const SOURCE_TYPE: &'static str = PLUGIN_NAME;

    fn summary(&self) -> String {
        let state = &self.0;
        format!(
            "{} live, {} pending, {} finished, {} failed splits; {} rows produced",
            state.assigned.values().map(Vec::len).sum::<usize>(),
            state.pending.len(),
            state.finished.len(),
            state.failed.len(),
            state.produced_rows()
        )
    }
}
