//! Enumerator checkpoint state.

use crate::error::{Result, SourceError};
use crate::split::FakeSourceSplit;
use crate::ReaderId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Checkpoint payload of the split enumerator.
///
/// `assigned` carries each reader's splits with their live `produced`
/// progress, so a restart resumes mid-split. `pending`, `finished` and
/// `failed` default to empty so a payload holding only assignments loads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumeratorState {
    /// Splits owned by each reader
    pub assigned: BTreeMap<ReaderId, Vec<FakeSourceSplit>>,

    /// Splits waiting for a reader
    #[serde(default)]
    pub pending: Vec<FakeSourceSplit>,

    /// Ids of splits that produced every row
    #[serde(default)]
    pub finished: BTreeSet<u64>,

    /// Ids of splits abandoned after a generation error
    #[serde(default)]
    pub failed: BTreeSet<u64>,
}

impl EnumeratorState {
    /// Check the state for corruption.
    ///
    /// Fails on a split id that appears twice (under two readers, twice under
    /// one reader, or both assigned and pending), on `produced` beyond
    /// `row_limit`, and on an id recorded as finished or failed that is
    /// still live.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for split in self.live_splits() {
            if !seen.insert(split.id) {
                return Err(SourceError::DuplicateSplit { split_id: split.id });
            }
            if let Some(row_limit) = split.row_limit {
                if split.produced > row_limit {
                    return Err(SourceError::ProducedExceedsLimit {
                        split_id: split.id,
                        produced: split.produced,
                        row_limit,
                    });
                }
            }
            if self.finished.contains(&split.id) || self.failed.contains(&split.id) {
                return Err(SourceError::FinishedSplitStillLive { split_id: split.id });
            }
        }
        Ok(())
    }

    /// Every assigned and pending split.
    pub fn live_splits(&self) -> impl Iterator<Item = &FakeSourceSplit> {
        self.assigned.values().flatten().chain(self.pending.iter())
    }

    /// Splits assigned to one reader.
    pub fn splits_of(&self, reader: ReaderId) -> &[FakeSourceSplit] {
        self.assigned.get(&reader).map(Vec::as_slice).unwrap_or_default()
    }

    /// Overwrite the progress of `reader`'s splits with the reader's own
    /// snapshot, which is ahead of what the enumerator saw at assignment.
    ///
    /// Splits the reader reports but the state does not assign to it are
    /// ignored.
    pub fn merge_reader_progress(&mut self, reader: ReaderId, snapshot: &[FakeSourceSplit]) {
        let Some(splits) = self.assigned.get_mut(&reader) else {
            return;
        };
        for split in splits.iter_mut() {
            if let Some(live) = snapshot.iter().find(|s| s.id == split.id) {
                split.produced = split.produced.max(live.produced);
            }
        }
    }

    /// Total rows produced by live splits.
    pub fn produced_rows(&self) -> u64 {
        self.live_splits().map(|s| s.produced).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> EnumeratorState {
        let mut state = EnumeratorState::default();
        state
            .assigned
            .insert(0, vec![FakeSourceSplit::bounded(0, 5, 0)]);
        state
            .assigned
            .insert(1, vec![FakeSourceSplit::bounded(1, 5, 1)]);
        state
    }

    #[test]
    fn test_valid_state() {
        assert!(state().validate().is_ok());
    }

    #[test]
    fn test_split_under_two_readers_rejected() {
        let mut state = state();
        state
            .assigned
            .insert(2, vec![FakeSourceSplit::bounded(0, 5, 0)]);
        assert!(matches!(
            state.validate(),
            Err(SourceError::DuplicateSplit { split_id: 0 })
        ));
    }

    #[test]
    fn test_assigned_and_pending_rejected() {
        let mut state = state();
        state.pending.push(FakeSourceSplit::bounded(1, 5, 1));
        assert!(matches!(
            state.validate(),
            Err(SourceError::DuplicateSplit { split_id: 1 })
        ));
    }

    #[test]
    fn test_produced_beyond_limit_rejected() {
        let mut state = state();
        state.assigned.get_mut(&0).unwrap()[0].produced = 6;
        assert!(matches!(
            state.validate(),
            Err(SourceError::ProducedExceedsLimit {
                split_id: 0,
                produced: 6,
                row_limit: 5
            })
        ));
    }

    #[test]
    fn test_finished_and_live_rejected() {
        let mut state = state();
        state.finished.insert(1);
        assert!(matches!(
            state.validate(),
            Err(SourceError::FinishedSplitStillLive { split_id: 1 })
        ));
    }

    #[test]
    fn test_merge_reader_progress() {
        let mut state = state();
        let mut live = FakeSourceSplit::bounded(0, 5, 0);
        live.produced = 3;
        let mut foreign = FakeSourceSplit::bounded(1, 5, 1);
        foreign.produced = 4;

        state.merge_reader_progress(0, &[live, foreign]);
        assert_eq!(state.splits_of(0)[0].produced, 3);
        assert_eq!(state.splits_of(1)[0].produced, 0);
        assert_eq!(state.produced_rows(), 3);
    }

    #[test]
    fn test_json_with_only_assignments() {
        let json = r#"{"assigned":{"0":[{"id":0,"row_limit":5,"seed":0,"produced":3}]}}"#;
        let state: EnumeratorState = serde_json::from_str(json).unwrap();
        assert_eq!(state.splits_of(0)[0].produced, 3);
        assert!(state.pending.is_empty());
        assert!(state.splits_of(7).is_empty());

        let back: EnumeratorState =
            serde_json::from_str(&serde_json::to_string(&state).unwrap()).unwrap();
        assert_eq!(back, state);
    }
}
