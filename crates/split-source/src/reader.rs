//! Source reader: drives generation for its assigned splits.

use crate::error::{Result, SourceError};
use crate::rate::RateLimiter;
use crate::record::SourceRecord;
use crate::split::{FakeSourceSplit, SplitPhase};
use crate::ReaderId;
use fake_generator::{table_seed, RateLimit, RowGenerator};
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Rows generated per poll when no rate limit is tighter.
pub const DEFAULT_BATCH_SIZE: u64 = 1024;

/// Largest accepted batch size.
pub const MAX_BATCH_SIZE: u64 = 1 << 20;

/// Outcome of one [`SourceReader::poll_next`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum ReaderPoll {
    /// Rows generated by this poll.
    Records(Vec<SourceRecord>),

    /// The current split produced its last row. Report it to the enumerator.
    SplitFinished(u64),

    /// Rate limit reached; poll again after the given duration.
    Pause(Duration),

    /// No work queued (or suspended for a checkpoint); wait for splits.
    Idle,

    /// No work queued and none will ever come.
    EndOfInput,
}

/// Reader configuration shared by all readers of a source.
#[derive(Debug, Clone)]
pub struct ReaderContext {
    pub generator: Arc<RowGenerator>,
    /// Produced tables; every row is emitted once per table
    pub tables: Vec<Arc<str>>,
    pub rate: Option<RateLimit>,
    pub batch_size: u64,
}

impl ReaderContext {
    pub fn new(generator: Arc<RowGenerator>, tables: Vec<Arc<str>>) -> Self {
        Self {
            generator,
            tables,
            rate: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_rate(mut self, rate: Option<RateLimit>) -> Self {
        self.rate = rate;
        self
    }

    pub fn with_batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);
        self
    }
}

/// One parallel reader.
///
/// Splits queue up FIFO and are processed one at a time to completion.
/// The reader is the only writer of its splits' `produced` counters.
#[derive(Debug)]
pub struct SourceReader {
    id: ReaderId,
    context: ReaderContext,
    queue: VecDeque<FakeSourceSplit>,
    finished: BTreeSet<u64>,
    limiter: Option<RateLimiter>,
    /// Generation error of the front split, raised on the next poll
    pending_failure: Option<SourceError>,
    no_more_splits: bool,
    suspended: bool,
    closed: bool,
}

impl SourceReader {
    pub fn new(id: ReaderId, context: ReaderContext) -> Self {
        let limiter = context.rate.map(RateLimiter::new);
        Self {
            id,
            context,
            queue: VecDeque::new(),
            finished: BTreeSet::new(),
            limiter,
            pending_failure: None,
            no_more_splits: false,
            suspended: false,
            closed: false,
        }
    }

    pub fn id(&self) -> ReaderId {
        self.id
    }

    /// Append splits to the work queue.
    pub fn add_splits(&mut self, splits: Vec<FakeSourceSplit>) -> Result<()> {
        if self.closed {
            return Err(SourceError::ReaderClosed(self.id));
        }
        debug!(reader = self.id, splits = splits.len(), "Splits added");
        self.queue.extend(splits);
        Ok(())
    }

    /// Seed the queue with checkpointed splits; generation resumes at each
    /// split's `produced` index.
    pub fn restore_splits(&mut self, splits: Vec<FakeSourceSplit>) -> Result<()> {
        let mut seen: HashSet<u64> = self.queue.iter().map(|s| s.id).collect();
        for split in &splits {
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
        }
        info!(
            reader = self.id,
            splits = splits.len(),
            "Restored splits from checkpoint"
        );
        self.add_splits(splits)
    }

    /// The enumerator will assign nothing more.
    pub fn no_more_splits(&mut self) {
        self.no_more_splits = true;
    }

    /// Splits currently owned, with live progress.
    pub fn snapshot_state(&self) -> Vec<FakeSourceSplit> {
        self.queue.iter().cloned().collect()
    }

    /// Stop generating for a checkpoint and return the snapshot.
    pub fn suspend(&mut self) -> Vec<FakeSourceSplit> {
        self.suspended = true;
        self.snapshot_state()
    }

    /// Continue after a checkpoint.
    pub fn resume(&mut self) {
        self.suspended = false;
    }

    /// Tear the reader down, handing back splits that are not finished.
    pub fn close(&mut self) -> Vec<FakeSourceSplit> {
        self.closed = true;
        self.pending_failure = None;
        self.queue.drain(..).collect()
    }

    /// Phase of a split from this reader's point of view.
    pub fn phase(&self, split_id: u64) -> SplitPhase {
        if self.finished.contains(&split_id) {
            return SplitPhase::Finished;
        }
        match self.queue.iter().position(|s| s.id == split_id) {
            Some(0) if self.suspended => SplitPhase::Suspended,
            Some(0) => SplitPhase::Producing,
            Some(_) => SplitPhase::Assigned,
            None => SplitPhase::Unassigned,
        }
    }

    /// Advance the current split by up to one batch.
    ///
    /// A failed split is dropped from the queue and returned as
    /// [`SourceError::SplitFailed`]; report it to the enumerator. Rows
    /// generated before the failing one in the same batch are returned
    /// first, and the failure follows on the next poll.
    pub fn poll_next(&mut self) -> Result<ReaderPoll> {
        if self.closed {
            return Err(SourceError::ReaderClosed(self.id));
        }
        if self.suspended {
            return Ok(ReaderPoll::Idle);
        }
        if let Some(err) = self.pending_failure.take() {
            self.queue.pop_front();
            return Err(err);
        }

        let Some(split) = self.queue.front() else {
            return Ok(if self.no_more_splits {
                ReaderPoll::EndOfInput
            } else {
                ReaderPoll::Idle
            });
        };

        if split.is_exhausted() {
            let split_id = split.id;
            self.queue.pop_front();
            self.finished.insert(split_id);
            info!(reader = self.id, split_id, "Split finished");
            return Ok(ReaderPoll::SplitFinished(split_id));
        }

        let mut batch = self.context.batch_size;
        if let Some(remaining) = split.remaining() {
            batch = batch.min(remaining);
        }
        if let Some(limiter) = &mut self.limiter {
            match limiter.allowance() {
                Ok(allowed) => batch = batch.min(allowed),
                Err(wait) => return Ok(ReaderPoll::Pause(wait)),
            }
        }

        let (records, rows, failure) = self.generate_batch(batch);
        if let Some(limiter) = &mut self.limiter {
            limiter.consume(rows);
        }
        match failure {
            Some(err) if records.is_empty() => {
                self.queue.pop_front();
                Err(err)
            }
            Some(err) => {
                self.pending_failure = Some(err);
                Ok(ReaderPoll::Records(records))
            }
            None => Ok(ReaderPoll::Records(records)),
        }
    }

    /// Generate up to `batch` rows of the front split.
    ///
    /// Returns the records, the number of complete rows, and the error that
    /// stopped the batch early. Only complete rows advance `produced`.
    fn generate_batch(&mut self, batch: u64) -> (Vec<SourceRecord>, u64, Option<SourceError>) {
        let generator = &self.context.generator;
        let tables = &self.context.tables;
        let Some(split) = self.queue.front_mut() else {
            return (Vec::new(), 0, None);
        };

        let capacity = batch.min(DEFAULT_BATCH_SIZE) as usize * tables.len();
        let mut records = Vec::with_capacity(capacity);
        let mut rows = 0;
        for _ in 0..batch {
            let row_index = split.produced;
            for table in tables {
                // A lone table keeps the split seed; fanned-out tables get
                // independent data.
                let seed = if tables.len() > 1 {
                    table_seed(split.seed, table)
                } else {
                    split.seed
                };
                let row = match generator.generate(seed, row_index) {
                    Ok(row) => row,
                    Err(source) => {
                        // Drop the partial row: other tables of the same
                        // index must not be emitted without it.
                        records.truncate(rows as usize * tables.len());
                        let err = SourceError::SplitFailed {
                            split_id: split.id,
                            row_index,
                            source,
                        };
                        return (records, rows, Some(err));
                    }
                };
                records.push(SourceRecord {
                    table: Arc::clone(table),
                    split_id: split.id,
                    row_index,
                    row,
                });
            }
            split.produced += 1;
            rows += 1;
        }
        (records, rows, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake_generator::{ColumnRule, GenerationConfig, GeneratorConfig};
    use fake_types::{ColumnDefinition, ColumnType, Schema};

    fn generator(config: GenerationConfig) -> Arc<RowGenerator> {
        let schema = Arc::new(
            Schema::new(vec![
                ColumnDefinition::new("id", ColumnType::Int),
                ColumnDefinition::new("name", ColumnType::String),
            ])
            .unwrap(),
        );
        Arc::new(RowGenerator::new(schema, Arc::new(config)).unwrap())
    }

    fn reader(batch_size: u64) -> SourceReader {
        let context = ReaderContext::new(generator(GenerationConfig::new(2, 10)), vec!["fake".into()])
            .with_batch_size(batch_size);
        SourceReader::new(0, context)
    }

    fn drain(reader: &mut SourceReader) -> Vec<SourceRecord> {
        let mut out = Vec::new();
        while let ReaderPoll::Records(records) = reader.poll_next().unwrap() {
            out.extend(records);
        }
        out
    }

    #[test]
    fn test_produces_split_then_finishes() {
        let mut reader = reader(2);
        reader
            .add_splits(vec![FakeSourceSplit::bounded(0, 5, 0)])
            .unwrap();
        assert_eq!(reader.phase(0), SplitPhase::Producing);

        let records = drain(&mut reader);
        let indexes: Vec<u64> = records.iter().map(|r| r.row_index).collect();
        assert_eq!(indexes, vec![0, 1, 2, 3, 4]);
        assert_eq!(reader.phase(0), SplitPhase::Finished);

        assert_eq!(reader.poll_next().unwrap(), ReaderPoll::Idle);
        reader.no_more_splits();
        assert_eq!(reader.poll_next().unwrap(), ReaderPoll::EndOfInput);
    }

    #[test]
    fn test_fifo_one_split_at_a_time() {
        let mut reader = reader(10);
        reader
            .add_splits(vec![
                FakeSourceSplit::bounded(3, 1, 3),
                FakeSourceSplit::bounded(1, 1, 1),
            ])
            .unwrap();
        assert_eq!(reader.phase(1), SplitPhase::Assigned);

        assert!(matches!(reader.poll_next().unwrap(), ReaderPoll::Records(r) if r[0].split_id == 3));
        assert_eq!(reader.poll_next().unwrap(), ReaderPoll::SplitFinished(3));
        assert!(matches!(reader.poll_next().unwrap(), ReaderPoll::Records(r) if r[0].split_id == 1));
        assert_eq!(reader.poll_next().unwrap(), ReaderPoll::SplitFinished(1));
    }

    #[test]
    fn test_zero_row_split_finishes_immediately() {
        let mut reader = reader(10);
        reader
            .add_splits(vec![FakeSourceSplit::bounded(0, 0, 0)])
            .unwrap();
        assert_eq!(reader.poll_next().unwrap(), ReaderPoll::SplitFinished(0));
    }

    #[test]
    fn test_restore_resumes_with_identical_rows() {
        let mut uninterrupted = reader(1);
        uninterrupted
            .add_splits(vec![FakeSourceSplit::bounded(0, 5, 0)])
            .unwrap();
        let all = drain(&mut uninterrupted);

        let mut first = reader(1);
        first
            .add_splits(vec![FakeSourceSplit::bounded(0, 5, 0)])
            .unwrap();
        let mut head = Vec::new();
        for _ in 0..3 {
            if let ReaderPoll::Records(records) = first.poll_next().unwrap() {
                head.extend(records);
            }
        }
        let snapshot = first.snapshot_state();
        assert_eq!(snapshot[0].produced, 3);

        let mut restored = reader(1);
        restored.restore_splits(snapshot).unwrap();
        let tail = drain(&mut restored);
        assert_eq!(tail[0].row_index, 3);

        head.extend(tail);
        assert_eq!(head, all);
    }

    #[test]
    fn test_restore_rejects_inconsistent_splits() {
        let mut reader = reader(1);
        let mut split = FakeSourceSplit::bounded(0, 5, 0);
        split.produced = 7;
        assert!(matches!(
            reader.restore_splits(vec![split]),
            Err(SourceError::ProducedExceedsLimit { split_id: 0, .. })
        ));
        assert!(matches!(
            reader.restore_splits(vec![
                FakeSourceSplit::bounded(1, 5, 1),
                FakeSourceSplit::bounded(1, 5, 1)
            ]),
            Err(SourceError::DuplicateSplit { split_id: 1 })
        ));
    }

    #[test]
    fn test_suspend_and_resume() {
        let mut reader = reader(1);
        reader
            .add_splits(vec![FakeSourceSplit::unbounded(0, 0)])
            .unwrap();
        reader.poll_next().unwrap();

        let snapshot = reader.suspend();
        assert_eq!(snapshot[0].produced, 1);
        assert_eq!(reader.phase(0), SplitPhase::Suspended);
        assert_eq!(reader.poll_next().unwrap(), ReaderPoll::Idle);

        reader.resume();
        assert_eq!(reader.phase(0), SplitPhase::Producing);
        assert!(matches!(reader.poll_next().unwrap(), ReaderPoll::Records(r) if r[0].row_index == 1));
    }

    #[test]
    fn test_close_returns_in_flight_splits() {
        let mut reader = reader(2);
        reader
            .add_splits(vec![FakeSourceSplit::bounded(0, 5, 0)])
            .unwrap();
        reader.poll_next().unwrap();

        let returned = reader.close();
        assert_eq!(returned.len(), 1);
        assert_eq!(returned[0].produced, 2);
        assert!(matches!(reader.poll_next(), Err(SourceError::ReaderClosed(0))));
        assert!(reader.add_splits(vec![]).is_err());
    }

    #[test]
    fn test_generation_error_fails_split() {
        let config = GenerationConfig::new(1, 10).with_rule(
            "id",
            ColumnRule::new(GeneratorConfig::Sequential {
                start: i32::MAX as i64,
            }),
        );
        let context = ReaderContext::new(generator(config), vec!["fake".into()]).with_batch_size(1);
        let mut reader = SourceReader::new(0, context);
        reader
            .add_splits(vec![FakeSourceSplit::bounded(0, 5, 0)])
            .unwrap();

        assert!(matches!(reader.poll_next().unwrap(), ReaderPoll::Records(_)));
        assert!(matches!(
            reader.poll_next(),
            Err(SourceError::SplitFailed {
                split_id: 0,
                row_index: 1,
                ..
            })
        ));
        assert_eq!(reader.poll_next().unwrap(), ReaderPoll::Idle);
    }

    #[test]
    fn test_generation_error_keeps_rows_before_it() {
        let config = GenerationConfig::new(1, 20).with_rule(
            "id",
            ColumnRule::new(GeneratorConfig::Sequential {
                start: i32::MAX as i64 - 8,
            }),
        );
        let context = ReaderContext::new(generator(config), vec!["fake".into()]).with_batch_size(10);
        let mut reader = SourceReader::new(0, context);
        reader
            .add_splits(vec![FakeSourceSplit::bounded(0, 20, 0)])
            .unwrap();

        let ReaderPoll::Records(records) = reader.poll_next().unwrap() else {
            panic!("Expected the rows before the overflow");
        };
        let indexes: Vec<u64> = records.iter().map(|r| r.row_index).collect();
        assert_eq!(indexes, (0..=8).collect::<Vec<u64>>());
        assert_eq!(reader.snapshot_state()[0].produced, 9);

        assert!(matches!(
            reader.poll_next(),
            Err(SourceError::SplitFailed {
                split_id: 0,
                row_index: 9,
                ..
            })
        ));
        assert!(reader.snapshot_state().is_empty());
        assert_eq!(reader.poll_next().unwrap(), ReaderPoll::Idle);
    }

    #[test]
    fn test_batch_size_is_capped() {
        let context = ReaderContext::new(generator(GenerationConfig::new(1, 0)), vec!["fake".into()])
            .with_batch_size(u64::MAX);
        assert_eq!(context.batch_size, MAX_BATCH_SIZE);
        let mut reader = SourceReader::new(0, context.with_batch_size(4));
        reader
            .add_splits(vec![FakeSourceSplit::unbounded(0, 0)])
            .unwrap();
        assert!(matches!(reader.poll_next().unwrap(), ReaderPoll::Records(r) if r.len() == 4));
    }

    #[test]
    fn test_fan_out_tables() {
        let context = ReaderContext::new(
            generator(GenerationConfig::new(1, 10)),
            vec!["db.a".into(), "db.b".into()],
        );
        let mut reader = SourceReader::new(0, context);
        reader
            .add_splits(vec![FakeSourceSplit::bounded(0, 2, 0)])
            .unwrap();

        let records = drain(&mut reader);
        assert_eq!(records.len(), 4);
        assert_eq!(&*records[0].table, "db.a");
        assert_eq!(&*records[1].table, "db.b");
        assert_eq!(records[0].row_index, records[1].row_index);
        assert_ne!(records[0].row, records[1].row);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_pauses() {
        let context = ReaderContext::new(generator(GenerationConfig::new(1, 10)), vec!["fake".into()])
            .with_rate(Some(RateLimit {
                rows_per_interval: 2,
                interval: Duration::from_secs(1),
            }));
        let mut reader = SourceReader::new(0, context);
        reader
            .add_splits(vec![FakeSourceSplit::unbounded(0, 0)])
            .unwrap();

        assert!(matches!(reader.poll_next().unwrap(), ReaderPoll::Records(r) if r.len() == 2));
        assert_eq!(
            reader.poll_next().unwrap(),
            ReaderPoll::Pause(Duration::from_secs(1))
        );
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(matches!(reader.poll_next().unwrap(), ReaderPoll::Records(r) if r.len() == 2));
    }
}
