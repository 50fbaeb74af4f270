//! Split enumerator: the authoritative split set and its assignment.
//!
//! Every interaction is a typed [`EnumeratorRequest`] handled under one lock,
//! so assignment, completion, failure handling and snapshots never observe
//! each other half-applied. Assignment decisions come back as
//! [`EnumeratorEvent`]s for the host to deliver to readers.
//!
//! # Assignment policy
//!
//! - A reader holds at most one split from the enumerator at a time; the
//!   lowest pending split id is handed out first.
//! - When several readers are idle at once, the lowest reader id is served
//!   first.
//! - A reader that registers while already owning restored splits gets
//!   nothing new until those finish.
//! - Bounded sources signal end-of-input only once every split is finished
//!   or failed, and then to every registered reader.
//! - Unbounded sources create `split_num` perpetual splits up front. A reader
//!   that registers when none is pending gets a fresh perpetual split with the
//!   next unused id. Perpetual splits keep their seed for their whole life.

use crate::error::{Result, SourceError};
use crate::split::FakeSourceSplit;
use crate::state::EnumeratorState;
use crate::{Boundedness, ReaderId};
use fake_generator::GenerationConfig;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// A host-to-enumerator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumeratorRequest {
    /// A reader came up and wants work.
    RegisterReader { reader: ReaderId },

    /// A reader produced every row of a split.
    ReportSplitFinished { reader: ReaderId, split_id: u64 },

    /// A reader hit a generation error on a split.
    ReportSplitFailed {
        reader: ReaderId,
        split_id: u64,
        reason: String,
    },

    /// The host tore a reader down. `in_flight` is the reader's last known
    /// split progress, if the host could collect it.
    ReaderFailed {
        reader: ReaderId,
        in_flight: Vec<FakeSourceSplit>,
    },

    /// Take a consistent copy of the enumerator state.
    SnapshotState,
}

/// An enumerator-to-reader signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumeratorEvent {
    /// Append these splits to the reader's queue.
    AddSplits {
        reader: ReaderId,
        splits: Vec<FakeSourceSplit>,
    },

    /// No further splits will ever be assigned to the reader.
    NoMoreSplits { reader: ReaderId },
}

impl EnumeratorEvent {
    /// Reader the event is addressed to.
    pub fn reader(&self) -> ReaderId {
        match self {
            Self::AddSplits { reader, .. } | Self::NoMoreSplits { reader } => *reader,
        }
    }
}

/// Outcome of a handled request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumeratorResponse {
    /// Signals to deliver, in order.
    Events(Vec<EnumeratorEvent>),

    /// Reply to [`EnumeratorRequest::SnapshotState`].
    Snapshot(EnumeratorState),
}

impl EnumeratorResponse {
    /// Events of the response; empty for a snapshot.
    pub fn into_events(self) -> Vec<EnumeratorEvent> {
        match self {
            Self::Events(events) => events,
            Self::Snapshot(_) => Vec::new(),
        }
    }
}

#[derive(Debug)]
struct EnumeratorInner {
    boundedness: Boundedness,
    config: GenerationConfig,
    pending: BTreeMap<u64, FakeSourceSplit>,
    assigned: BTreeMap<ReaderId, Vec<FakeSourceSplit>>,
    finished: BTreeSet<u64>,
    failed: BTreeSet<u64>,
    registered: BTreeSet<ReaderId>,
    signalled: BTreeSet<ReaderId>,
    next_split_id: u64,
}

/// Fresh split `id`; its seed and limit are pure functions of the id.
fn new_split(config: &GenerationConfig, id: u64, boundedness: Boundedness) -> FakeSourceSplit {
    let seed = config.split_seed(id);
    match boundedness {
        Boundedness::Bounded => FakeSourceSplit::bounded(id, config.split_row_limit(id), seed),
        Boundedness::Unbounded => FakeSourceSplit::unbounded(id, seed),
    }
}

/// Owner of the split set of one source instance.
#[derive(Debug)]
pub struct SplitEnumerator {
    inner: Mutex<EnumeratorInner>,
}

impl SplitEnumerator {
    /// Build `split_num` fresh splits, ids `0..split_num`, none assigned.
    pub fn create(config: &GenerationConfig, boundedness: Boundedness) -> Self {
        let pending: BTreeMap<u64, FakeSourceSplit> = (0..config.split_num as u64)
            .map(|id| (id, new_split(config, id, boundedness)))
            .collect();

        info!(
            splits = pending.len(),
            ?boundedness,
            row_num = config.row_num,
            "Created split enumerator"
        );

        Self::from_inner(EnumeratorInner {
            boundedness,
            config: config.clone(),
            next_split_id: config.split_num as u64,
            pending,
            assigned: BTreeMap::new(),
            finished: BTreeSet::new(),
            failed: BTreeSet::new(),
            registered: BTreeSet::new(),
            signalled: BTreeSet::new(),
        })
    }

    /// Rebuild from a checkpoint.
    ///
    /// Assignments and progress are taken from `state` as is. Ids below the
    /// configured split count that the state does not mention are created
    /// fresh, so raising the split count between runs adds work.
    pub fn restore(
        config: &GenerationConfig,
        boundedness: Boundedness,
        state: EnumeratorState,
    ) -> Result<Self> {
        state.validate()?;

        let mut pending: BTreeMap<u64, FakeSourceSplit> =
            state.pending.into_iter().map(|s| (s.id, s)).collect();
        let assigned: BTreeMap<ReaderId, Vec<FakeSourceSplit>> = state
            .assigned
            .into_iter()
            .filter(|(_, splits)| !splits.is_empty())
            .collect();

        let known: BTreeSet<u64> = pending
            .keys()
            .copied()
            .chain(assigned.values().flatten().map(|s| s.id))
            .chain(state.finished.iter().copied())
            .chain(state.failed.iter().copied())
            .collect();

        let mut recreated = 0;
        for id in 0..config.split_num as u64 {
            if !known.contains(&id) {
                pending.insert(id, new_split(config, id, boundedness));
                recreated += 1;
            }
        }

        let next_split_id = known
            .iter()
            .next_back()
            .map(|max| max + 1)
            .unwrap_or(0)
            .max(config.split_num as u64);

        info!(
            readers = assigned.len(),
            pending = pending.len(),
            finished = state.finished.len(),
            recreated,
            "Restored split enumerator"
        );

        Ok(Self::from_inner(EnumeratorInner {
            boundedness,
            config: config.clone(),
            pending,
            assigned,
            finished: state.finished,
            failed: state.failed,
            registered: BTreeSet::new(),
            signalled: BTreeSet::new(),
            next_split_id,
        }))
    }

    fn from_inner(inner: EnumeratorInner) -> Self {
        Self {
            inner: Mutex::new(inner),
        }
    }

    fn lock(&self) -> MutexGuard<'_, EnumeratorInner> {
        // Every mutation completes before the guard drops, so a poisoned
        // lock still holds consistent bookkeeping.
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Handle one request inside the enumerator's critical section.
    pub fn handle(&self, request: EnumeratorRequest) -> Result<EnumeratorResponse> {
        let mut inner = self.lock();
        match request {
            EnumeratorRequest::RegisterReader { reader } => {
                Ok(EnumeratorResponse::Events(inner.register(reader)))
            }
            EnumeratorRequest::ReportSplitFinished { reader, split_id } => {
                inner.take_owned(reader, split_id)?;
                inner.finished.insert(split_id);
                debug!(reader, split_id, "Split finished");
                Ok(EnumeratorResponse::Events(inner.rebalance()))
            }
            EnumeratorRequest::ReportSplitFailed {
                reader,
                split_id,
                reason,
            } => {
                inner.take_owned(reader, split_id)?;
                inner.failed.insert(split_id);
                warn!(reader, split_id, %reason, "Split failed");
                Ok(EnumeratorResponse::Events(inner.rebalance()))
            }
            EnumeratorRequest::ReaderFailed { reader, in_flight } => {
                Ok(EnumeratorResponse::Events(inner.reader_failed(reader, in_flight)?))
            }
            EnumeratorRequest::SnapshotState => Ok(EnumeratorResponse::Snapshot(inner.snapshot())),
        }
    }

    /// Register a reader and return the resulting signals.
    pub fn register_reader(&self, reader: ReaderId) -> Result<Vec<EnumeratorEvent>> {
        self.handle(EnumeratorRequest::RegisterReader { reader })
            .map(EnumeratorResponse::into_events)
    }

    /// Report a finished split and return the resulting signals.
    pub fn report_split_finished(
        &self,
        reader: ReaderId,
        split_id: u64,
    ) -> Result<Vec<EnumeratorEvent>> {
        self.handle(EnumeratorRequest::ReportSplitFinished { reader, split_id })
            .map(EnumeratorResponse::into_events)
    }

    /// Report a failed split and return the resulting signals.
    pub fn report_split_failed(
        &self,
        reader: ReaderId,
        split_id: u64,
        reason: impl Into<String>,
    ) -> Result<Vec<EnumeratorEvent>> {
        self.handle(EnumeratorRequest::ReportSplitFailed {
            reader,
            split_id,
            reason: reason.into(),
        })
        .map(EnumeratorResponse::into_events)
    }

    /// Return a torn-down reader's splits to the pending pool.
    pub fn reader_failed(
        &self,
        reader: ReaderId,
        in_flight: Vec<FakeSourceSplit>,
    ) -> Result<Vec<EnumeratorEvent>> {
        self.handle(EnumeratorRequest::ReaderFailed { reader, in_flight })
            .map(EnumeratorResponse::into_events)
    }

    /// Deep copy of the current state.
    pub fn snapshot_state(&self) -> EnumeratorState {
        self.lock().snapshot()
    }

    /// Whether a bounded source has finished or failed every split.
    pub fn is_complete(&self) -> bool {
        self.lock().all_done()
    }

    /// Ids of splits abandoned after generation errors.
    pub fn failed_splits(&self) -> BTreeSet<u64> {
        self.lock().failed.clone()
    }

    pub fn boundedness(&self) -> Boundedness {
        self.lock().boundedness
    }
}

impl EnumeratorInner {
    fn register(&mut self, reader: ReaderId) -> Vec<EnumeratorEvent> {
        self.registered.insert(reader);

        if self.assigned.get(&reader).is_some_and(|s| !s.is_empty()) {
            debug!(reader, "Reader registered with restored splits");
            return Vec::new();
        }

        if self.boundedness == Boundedness::Unbounded
            && self.pending.is_empty()
            && !self.signalled.contains(&reader)
        {
            let id = self.next_split_id;
            self.next_split_id += 1;
            let split = new_split(&self.config, id, Boundedness::Unbounded);
            info!(reader, split_id = id, "Created perpetual split on demand");
            self.pending.insert(id, split);
        }

        self.rebalance()
    }

    /// Remove `split_id` from `reader`'s assignment.
    fn take_owned(&mut self, reader: ReaderId, split_id: u64) -> Result<FakeSourceSplit> {
        let splits = self
            .assigned
            .get_mut(&reader)
            .ok_or(SourceError::SplitNotOwned { reader, split_id })?;
        let pos = splits
            .iter()
            .position(|s| s.id == split_id)
            .ok_or(SourceError::SplitNotOwned { reader, split_id })?;
        let split = splits.remove(pos);
        if splits.is_empty() {
            self.assigned.remove(&reader);
        }
        Ok(split)
    }

    fn reader_failed(
        &mut self,
        reader: ReaderId,
        in_flight: Vec<FakeSourceSplit>,
    ) -> Result<Vec<EnumeratorEvent>> {
        let owned = self.assigned.remove(&reader);
        if owned.is_none() && !self.registered.contains(&reader) {
            return Err(SourceError::UnknownReader(reader));
        }
        self.registered.remove(&reader);
        self.signalled.remove(&reader);

        let mut returned = 0;
        for mut split in owned.unwrap_or_default() {
            if let Some(live) = in_flight.iter().find(|s| s.id == split.id) {
                if live.is_consistent() {
                    split.produced = split.produced.max(live.produced);
                }
            }
            self.pending.insert(split.id, split);
            returned += 1;
        }
        warn!(reader, returned, "Reader failed; splits returned to pending");

        Ok(self.rebalance())
    }

    /// Hand pending splits to idle readers, lowest reader id first, then
    /// signal end-of-input when a bounded source is done.
    fn rebalance(&mut self) -> Vec<EnumeratorEvent> {
        let mut events = Vec::new();

        let idle: Vec<ReaderId> = self
            .registered
            .iter()
            .copied()
            .filter(|r| !self.signalled.contains(r) && !self.assigned.contains_key(r))
            .collect();

        for reader in idle {
            let Some((_, split)) = self.pending.pop_first() else {
                break;
            };
            debug!(reader, split_id = split.id, produced = split.produced, "Assigning split");
            self.assigned.insert(reader, vec![split.clone()]);
            events.push(EnumeratorEvent::AddSplits {
                reader,
                splits: vec![split],
            });
        }

        if self.all_done() {
            let waiting: Vec<ReaderId> = self
                .registered
                .iter()
                .copied()
                .filter(|r| !self.signalled.contains(r))
                .collect();
            for reader in waiting {
                self.signalled.insert(reader);
                events.push(EnumeratorEvent::NoMoreSplits { reader });
            }
        }

        events
    }

    fn all_done(&self) -> bool {
        self.boundedness == Boundedness::Bounded
            && self.pending.is_empty()
            && self.assigned.is_empty()
    }

    fn snapshot(&self) -> EnumeratorState {
        EnumeratorState {
            assigned: self.assigned.clone(),
            pending: self.pending.values().cloned().collect(),
            finished: self.finished.clone(),
            failed: self.failed.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounded(split_num: u32, row_num: u64) -> SplitEnumerator {
        SplitEnumerator::create(&GenerationConfig::new(split_num, row_num), Boundedness::Bounded)
    }

    fn assigned_split(events: &[EnumeratorEvent]) -> FakeSourceSplit {
        match events {
            [EnumeratorEvent::AddSplits { splits, .. }] => splits[0].clone(),
            other => panic!("Expected one AddSplits, got {other:?}"),
        }
    }

    #[test]
    fn test_create_builds_splits_without_assignment() {
        let enumerator = bounded(2, 10);
        let state = enumerator.snapshot_state();
        assert!(state.assigned.is_empty());
        assert_eq!(
            state.pending,
            vec![
                FakeSourceSplit::bounded(0, 5, 0),
                FakeSourceSplit::bounded(1, 5, 1)
            ]
        );
    }

    #[test]
    fn test_register_assigns_lowest_pending() {
        let enumerator = bounded(3, 9);
        assert_eq!(assigned_split(&enumerator.register_reader(5).unwrap()).id, 0);
        assert_eq!(assigned_split(&enumerator.register_reader(2).unwrap()).id, 1);
        let state = enumerator.snapshot_state();
        assert_eq!(state.splits_of(5)[0].id, 0);
        assert_eq!(state.splits_of(2)[0].id, 1);
        assert_eq!(state.pending.len(), 1);
    }

    #[test]
    fn test_finish_assigns_next_then_signals_all() {
        let enumerator = bounded(3, 9);
        enumerator.register_reader(0).unwrap();
        enumerator.register_reader(1).unwrap();

        let events = enumerator.report_split_finished(0, 0).unwrap();
        assert_eq!(assigned_split(&events).id, 2);

        // Reader 1 is still busy, so reader 0 only waits.
        assert!(enumerator.report_split_finished(0, 2).unwrap().is_empty());

        let events = enumerator.report_split_finished(1, 1).unwrap();
        assert_eq!(
            events,
            vec![
                EnumeratorEvent::NoMoreSplits { reader: 0 },
                EnumeratorEvent::NoMoreSplits { reader: 1 }
            ]
        );
        assert!(enumerator.is_complete());

        // Late readers are told right away.
        assert_eq!(
            enumerator.register_reader(9).unwrap(),
            vec![EnumeratorEvent::NoMoreSplits { reader: 9 }]
        );
    }

    #[test]
    fn test_finish_of_foreign_split_rejected() {
        let enumerator = bounded(2, 10);
        enumerator.register_reader(0).unwrap();
        enumerator.register_reader(1).unwrap();
        assert!(matches!(
            enumerator.report_split_finished(0, 1),
            Err(SourceError::SplitNotOwned {
                reader: 0,
                split_id: 1
            })
        ));
    }

    #[test]
    fn test_reader_failure_returns_splits_with_progress() {
        let enumerator = bounded(2, 10);
        enumerator.register_reader(0).unwrap();
        enumerator.register_reader(1).unwrap();
        enumerator.report_split_finished(1, 1).unwrap();

        let mut live = FakeSourceSplit::bounded(0, 5, 0);
        live.produced = 3;
        let events = enumerator.reader_failed(0, vec![live]).unwrap();

        // Reader 1 is idle and picks split 0 up at row 3.
        let split = assigned_split(&events);
        assert_eq!(events[0].reader(), 1);
        assert_eq!((split.id, split.produced), (0, 3));
        assert!(!enumerator.is_complete());

        assert!(matches!(
            enumerator.reader_failed(42, vec![]),
            Err(SourceError::UnknownReader(42))
        ));
    }

    #[test]
    fn test_failed_split_is_terminal() {
        let enumerator = bounded(1, 3);
        enumerator.register_reader(0).unwrap();
        let events = enumerator.report_split_failed(0, 0, "overflow").unwrap();
        assert_eq!(events, vec![EnumeratorEvent::NoMoreSplits { reader: 0 }]);
        assert_eq!(enumerator.failed_splits(), BTreeSet::from([0]));
        assert_eq!(enumerator.snapshot_state().failed, BTreeSet::from([0]));
    }

    #[test]
    fn test_zero_rows_still_completes() {
        let enumerator = bounded(2, 0);
        let split = assigned_split(&enumerator.register_reader(0).unwrap());
        assert_eq!(split.row_limit, Some(0));
    }

    #[test]
    fn test_unbounded_creates_perpetual_split_per_extra_reader() {
        let enumerator =
            SplitEnumerator::create(&GenerationConfig::new(1, 0), Boundedness::Unbounded);
        let first = assigned_split(&enumerator.register_reader(0).unwrap());
        assert_eq!((first.id, first.row_limit, first.seed), (0, None, 0));

        let second = assigned_split(&enumerator.register_reader(1).unwrap());
        assert_eq!((second.id, second.row_limit, second.seed), (1, None, 1));
        assert!(!enumerator.is_complete());
    }

    #[test]
    fn test_restore_keeps_assignments_and_recreates_missing() {
        let mut state = EnumeratorState::default();
        let mut split = FakeSourceSplit::bounded(0, 4, 0);
        split.produced = 3;
        state.assigned.insert(0, vec![split.clone()]);
        state.finished.insert(1);

        let config = GenerationConfig::new(3, 12);
        let enumerator = SplitEnumerator::restore(&config, Boundedness::Bounded, state).unwrap();

        // Reader 0 owns its restored split, so registering gives it nothing.
        assert!(enumerator.register_reader(0).unwrap().is_empty());
        let snapshot = enumerator.snapshot_state();
        assert_eq!(snapshot.splits_of(0), &[split]);
        assert_eq!(snapshot.pending, vec![FakeSourceSplit::bounded(2, 4, 2)]);

        let fresh = assigned_split(&enumerator.register_reader(1).unwrap());
        assert_eq!(fresh.id, 2);
    }

    #[test]
    fn test_restore_rejects_inconsistent_state() {
        let mut state = EnumeratorState::default();
        state
            .assigned
            .insert(0, vec![FakeSourceSplit::bounded(0, 5, 0)]);
        state
            .assigned
            .insert(1, vec![FakeSourceSplit::bounded(0, 5, 0)]);
        let err = SplitEnumerator::restore(&GenerationConfig::new(2, 10), Boundedness::Bounded, state)
            .unwrap_err();
        assert!(matches!(err, SourceError::DuplicateSplit { split_id: 0 }));
    }

    #[test]
    fn test_snapshots_consistent_under_contention() {
        const SPLITS: usize = 64;
        let enumerator = bounded(SPLITS as u32, 640);

        std::thread::scope(|scope| {
            for reader in 0..4 {
                let enumerator = &enumerator;
                scope.spawn(move || {
                    let mut events = enumerator.register_reader(reader).unwrap();
                    // While splits are pending nobody stays idle, so new work
                    // always comes back to the reporting reader.
                    while let Some(split_id) = events.iter().find_map(|event| match event {
                        EnumeratorEvent::AddSplits { reader: r, splits } if *r == reader => {
                            Some(splits[0].id)
                        }
                        _ => None,
                    }) {
                        events = enumerator.report_split_finished(reader, split_id).unwrap();
                    }
                });
            }

            let enumerator = &enumerator;
            scope.spawn(move || loop {
                let complete = enumerator.is_complete();
                let state = enumerator.snapshot_state();
                state.validate().unwrap();
                assert_eq!(state.live_splits().count() + state.finished.len(), SPLITS);
                if complete {
                    break;
                }
            });
        });

        assert_eq!(enumerator.snapshot_state().finished.len(), SPLITS);
    }

    #[test]
    fn test_snapshot_via_request() {
        let enumerator = bounded(2, 10);
        enumerator.register_reader(0).unwrap();
        let EnumeratorResponse::Snapshot(state) =
            enumerator.handle(EnumeratorRequest::SnapshotState).unwrap()
        else {
            panic!("Expected Snapshot");
        };
        assert_eq!(state, enumerator.snapshot_state());
        assert!(state.validate().is_ok());
    }
}
