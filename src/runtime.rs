//! Local host runtime.
//!
//! Drives one [`FakeSource`] inside a single process: a tokio task per
//! reader, a sink task draining records, and a coordinator (the task calling
//! [`LocalRuntime::run`]) that owns the enumerator and the checkpoint
//! barrier.
//!
//! Checkpoint barrier:
//!
//! 1. every reader receives `Checkpoint`, replies with its split snapshot and
//!    suspends; records it emitted so far are already queued for the sink
//! 2. reports sent before the replies (finished splits) are applied
//! 3. the sink is flushed
//! 4. reader progress is merged into the enumerator snapshot and persisted
//! 5. readers resume
//!
//! Reader tasks live in a [`JoinSet`]. A task that ends without reporting
//! (a panic, or an abort) is handled like a reported failure: its splits go
//! back to the enumerator and the reader is restarted.

use crate::checkpoint::FakeSourceCheckpoint;
use crate::sink::RecordSink;
use crate::source::FakeSource;
use anyhow::{Context, Result};
use checkpoint::CheckpointManager;
use split_source::{
    EnumeratorEvent, FakeSourceSplit, ReaderId, ReaderPoll, SourceError, SourceReader,
    SourceRecord, SplitEnumerator,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{self, AbortHandle, JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const SINK_CHANNEL_CAPACITY: usize = 4096;

/// Runtime knobs.
#[derive(Clone, Default)]
pub struct RuntimeOptions {
    /// Number of reader tasks; defaults to the split count
    pub parallelism: Option<u32>,
    /// Where checkpoints go; no checkpoints are taken without it
    pub checkpoints: Option<Arc<CheckpointManager>>,
    /// Period of checkpoints while running
    pub checkpoint_interval: Option<Duration>,
    /// Resume from the newest stored checkpoint
    pub restore: bool,
}

/// Outcome of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Records delivered to the sink
    pub records: u64,
    /// Checkpoints persisted
    pub checkpoints: u64,
    /// Id of the checkpoint the run resumed from
    pub restored_from: Option<u64>,
    /// Whether a bounded source produced all of its splits
    pub completed: bool,
    /// Splits abandoned after generation errors
    pub failed_splits: BTreeSet<u64>,
}

enum ReaderCommand {
    Restore(Vec<FakeSourceSplit>),
    AddSplits(Vec<FakeSourceSplit>),
    NoMoreSplits,
    Checkpoint(oneshot::Sender<Vec<FakeSourceSplit>>),
    Resume,
    Stop,
}

#[derive(Debug)]
enum ReaderReport {
    SplitFinished {
        reader: ReaderId,
        split_id: u64,
    },
    SplitFailed {
        reader: ReaderId,
        split_id: u64,
        reason: String,
    },
    Finished {
        reader: ReaderId,
    },
    Failed {
        reader: ReaderId,
        in_flight: Vec<FakeSourceSplit>,
        reason: String,
    },
}

enum SinkMessage {
    Record(SourceRecord),
    Flush(oneshot::Sender<Result<()>>),
}

struct ReaderHandle {
    commands: mpsc::UnboundedSender<ReaderCommand>,
    task: AbortHandle,
}

/// Single-process host of a fake source.
pub struct LocalRuntime {
    source: FakeSource,
    options: RuntimeOptions,
}

impl LocalRuntime {
    pub fn new(source: FakeSource, options: RuntimeOptions) -> Self {
        Self { source, options }
    }

    /// Run until a bounded source completes or `cancel` fires.
    ///
    /// Cancellation takes a final checkpoint before readers stop.
    pub async fn run<S>(self, sink: S, cancel: CancellationToken) -> Result<RunSummary>
    where
        S: RecordSink + 'static,
    {
        let (sink_tx, sink_rx) = mpsc::channel(SINK_CHANNEL_CAPACITY);
        let sink_task = tokio::spawn(run_sink(sink, sink_rx));

        let mut coordinator =
            Coordinator::new(self.source, self.options.checkpoints.clone(), sink_tx);
        let outcome = coordinator.drive(&self.options, cancel).await;
        let mut summary = coordinator.shutdown().await;
        outcome?;

        summary.records = sink_task.await.context("Sink task panicked")??;
        info!(
            "Run finished: {} records, {} checkpoints, completed: {}",
            summary.records, summary.checkpoints, summary.completed
        );
        Ok(summary)
    }
}

struct Coordinator {
    source: FakeSource,
    checkpoints: Option<Arc<CheckpointManager>>,
    enumerator: Option<SplitEnumerator>,
    readers: BTreeMap<ReaderId, ReaderHandle>,
    tasks: JoinSet<()>,
    /// Split progress each reader reported at the last checkpoint
    last_progress: BTreeMap<ReaderId, Vec<FakeSourceSplit>>,
    reports_tx: mpsc::UnboundedSender<ReaderReport>,
    reports_rx: mpsc::UnboundedReceiver<ReaderReport>,
    sink_tx: mpsc::Sender<SinkMessage>,
    summary: RunSummary,
}

impl Coordinator {
    fn new(
        source: FakeSource,
        checkpoints: Option<Arc<CheckpointManager>>,
        sink_tx: mpsc::Sender<SinkMessage>,
    ) -> Self {
        let (reports_tx, reports_rx) = mpsc::unbounded_channel();
        Self {
            source,
            checkpoints,
            enumerator: None,
            readers: BTreeMap::new(),
            tasks: JoinSet::new(),
            last_progress: BTreeMap::new(),
            reports_tx,
            reports_rx,
            sink_tx,
            summary: RunSummary::default(),
        }
    }

    fn enumerator(&self) -> Result<&SplitEnumerator> {
        self.enumerator
            .as_ref()
            .context("Enumerator is not started")
    }

    async fn drive(&mut self, options: &RuntimeOptions, cancel: CancellationToken) -> Result<()> {
        let parallelism = options
            .parallelism
            .unwrap_or(self.source.generation_config().split_num)
            .max(1);
        self.start(parallelism, options.restore).await?;
        self.supervise(options.checkpoint_interval, cancel).await
    }

    /// Serve reports, checkpoints and reader exits until every reader is
    /// done or `cancel` fires.
    async fn supervise(
        &mut self,
        checkpoint_interval: Option<Duration>,
        cancel: CancellationToken,
    ) -> Result<()> {
        let mut ticker = checkpoint_interval.map(|period| {
            let mut interval =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            interval
        });

        while !self.readers.is_empty() {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Cancellation requested; taking a final checkpoint");
                    self.checkpoint(false).await?;
                    return Ok(());
                }
                _ = tick(&mut ticker) => {
                    self.checkpoint(true).await?;
                }
                report = self.reports_rx.recv() => {
                    let Some(report) = report else { break };
                    self.apply(report)?;
                }
                Some(joined) = self.tasks.join_next_with_id() => {
                    self.reap(joined)?;
                }
            }
        }

        self.summary.completed = self.enumerator()?.is_complete();
        if self.summary.completed {
            self.checkpoint(false).await?;
        }
        Ok(())
    }

    /// Build or restore the enumerator and bring up `parallelism` readers.
    async fn start(&mut self, parallelism: u32, restore: bool) -> Result<()> {
        let restored = match (&self.checkpoints, restore) {
            (Some(manager), true) => manager.restore_latest::<FakeSourceCheckpoint>().await?,
            _ => None,
        };

        let (enumerator, state) = match restored {
            Some((checkpoint_id, checkpoint)) => {
                info!("Resuming from checkpoint {checkpoint_id}");
                self.summary.restored_from = Some(checkpoint_id);
                let state = checkpoint.into_state();
                let enumerator = self.source.restore_enumerator(state.clone())?;
                (enumerator, Some(state))
            }
            None => (self.source.create_enumerator(), None),
        };
        self.enumerator = Some(enumerator);

        let mut events = Vec::new();
        for reader in 0..parallelism {
            self.spawn_reader(reader);
            if let Some(splits) = state.as_ref().map(|s| s.splits_of(reader).to_vec()) {
                if !splits.is_empty() {
                    self.send(reader, ReaderCommand::Restore(splits));
                }
            }
            events.extend(self.enumerator()?.register_reader(reader)?);
        }

        // Readers of the previous run beyond the current parallelism hand
        // their splits back.
        if let Some(state) = &state {
            for &orphan in state.assigned.keys().filter(|&&r| r >= parallelism) {
                warn!("Reader {orphan} no longer exists; returning its splits");
                let in_flight = state.splits_of(orphan).to_vec();
                events.extend(self.enumerator()?.reader_failed(orphan, in_flight)?);
            }
        }

        self.deliver(events);
        Ok(())
    }

    fn spawn_reader(&mut self, reader_id: ReaderId) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let reader = self.source.create_reader(reader_id);
        let task = self.tasks.spawn(run_reader(
            reader,
            commands_rx,
            self.reports_tx.clone(),
            self.sink_tx.clone(),
        ));
        debug!("Spawned reader {reader_id}");
        self.readers.insert(
            reader_id,
            ReaderHandle {
                commands: commands_tx,
                task,
            },
        );
    }

    fn send(&self, reader: ReaderId, command: ReaderCommand) {
        if let Some(handle) = self.readers.get(&reader) {
            if handle.commands.send(command).is_err() {
                debug!("Reader {reader} is gone; command dropped");
            }
        }
    }

    fn deliver(&self, events: Vec<EnumeratorEvent>) {
        for event in events {
            match event {
                EnumeratorEvent::AddSplits { reader, splits } => {
                    self.send(reader, ReaderCommand::AddSplits(splits))
                }
                EnumeratorEvent::NoMoreSplits { reader } => {
                    self.send(reader, ReaderCommand::NoMoreSplits)
                }
            }
        }
    }

    fn apply(&mut self, report: ReaderReport) -> Result<()> {
        let events = match report {
            ReaderReport::SplitFinished { reader, split_id } => {
                self.enumerator()?.report_split_finished(reader, split_id)?
            }
            ReaderReport::SplitFailed {
                reader,
                split_id,
                reason,
            } => {
                self.summary.failed_splits.insert(split_id);
                self.enumerator()?
                    .report_split_failed(reader, split_id, reason)?
            }
            ReaderReport::Finished { reader } => {
                debug!("Reader {reader} reached end of input");
                self.readers.remove(&reader);
                Vec::new()
            }
            ReaderReport::Failed {
                reader,
                in_flight,
                reason,
            } => self.restart_reader(reader, in_flight, &reason)?,
        };
        self.deliver(events);
        Ok(())
    }

    /// Return a dead reader's splits to the enumerator and bring up a
    /// replacement under the same id.
    fn restart_reader(
        &mut self,
        reader: ReaderId,
        in_flight: Vec<FakeSourceSplit>,
        reason: &str,
    ) -> Result<Vec<EnumeratorEvent>> {
        warn!("Reader {reader} failed: {reason}; restarting it");
        self.readers.remove(&reader);
        self.last_progress.remove(&reader);
        let mut events = self.enumerator()?.reader_failed(reader, in_flight)?;
        self.spawn_reader(reader);
        events.extend(self.enumerator()?.register_reader(reader)?);
        Ok(events)
    }

    /// Handle a reader task that ended.
    ///
    /// Tasks report before they return, so once pending reports are applied
    /// a task still registered as a live reader died without reporting. Its
    /// splits resume from the progress of the last checkpoint.
    fn reap(&mut self, joined: Result<(task::Id, ()), JoinError>) -> Result<()> {
        while let Ok(report) = self.reports_rx.try_recv() {
            self.apply(report)?;
        }

        let (task_id, reason) = match joined {
            Ok((task_id, ())) => (task_id, "task exited without reporting".to_string()),
            Err(e) => (e.id(), e.to_string()),
        };
        let Some(reader) = self
            .readers
            .iter()
            .find(|(_, handle)| handle.task.id() == task_id)
            .map(|(&reader, _)| reader)
        else {
            return Ok(());
        };

        let in_flight = self.last_progress.get(&reader).cloned().unwrap_or_default();
        let events = self.restart_reader(reader, in_flight, &reason)?;
        self.deliver(events);
        Ok(())
    }

    /// Take one checkpoint through the barrier. A no-op without a store.
    ///
    /// Readers stay suspended afterwards unless `resume` is set.
    async fn checkpoint(&mut self, resume: bool) -> Result<()> {
        let Some(manager) = self.checkpoints.clone() else {
            return Ok(());
        };

        let mut replies = Vec::with_capacity(self.readers.len());
        for (&reader, handle) in &self.readers {
            let (reply_tx, reply_rx) = oneshot::channel();
            if handle
                .commands
                .send(ReaderCommand::Checkpoint(reply_tx))
                .is_ok()
            {
                replies.push((reader, reply_rx));
            }
        }
        let mut snapshots = Vec::with_capacity(replies.len());
        for (reader, reply) in replies {
            match reply.await {
                Ok(snapshot) => snapshots.push((reader, snapshot)),
                Err(_) => debug!("Reader {reader} exited before the barrier"),
            }
        }

        while let Ok(report) = self.reports_rx.try_recv() {
            self.apply(report)?;
        }

        let (flushed_tx, flushed_rx) = oneshot::channel();
        self.sink_tx
            .send(SinkMessage::Flush(flushed_tx))
            .await
            .context("Sink stopped")?;
        flushed_rx.await.context("Sink stopped")??;

        let mut state = self.enumerator()?.snapshot_state();
        for (reader, snapshot) in &snapshots {
            state.merge_reader_progress(*reader, snapshot);
            self.last_progress.insert(*reader, snapshot.clone());
        }
        manager
            .emit_checkpoint(&FakeSourceCheckpoint::from(state))
            .await?;
        self.summary.checkpoints += 1;

        if resume {
            for (reader, _) in snapshots {
                self.send(reader, ReaderCommand::Resume);
            }
        }
        Ok(())
    }

    /// Stop readers; dropping the coordinator closes the sink channel.
    async fn shutdown(mut self) -> RunSummary {
        for handle in std::mem::take(&mut self.readers).into_values() {
            let _ = handle.commands.send(ReaderCommand::Stop);
        }
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(e) = joined {
                warn!("Reader task ended abnormally: {e}");
            }
        }
        if let Some(enumerator) = &self.enumerator {
            self.summary.failed_splits = enumerator.failed_splits();
        }
        self.summary
    }
}

async fn tick(ticker: &mut Option<tokio::time::Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn run_sink<S: RecordSink>(mut sink: S, mut rx: mpsc::Receiver<SinkMessage>) -> Result<u64> {
    let mut written = 0;
    while let Some(message) = rx.recv().await {
        match message {
            SinkMessage::Record(record) => {
                sink.write(&record).await?;
                written += 1;
            }
            SinkMessage::Flush(done) => {
                let _ = done.send(sink.flush().await);
            }
        }
    }
    sink.flush().await?;
    Ok(written)
}

/// Apply one command. Returns false when the reader must stop.
fn handle_command(reader: &mut SourceReader, command: ReaderCommand) -> Result<bool, SourceError> {
    match command {
        ReaderCommand::Restore(splits) => reader.restore_splits(splits)?,
        ReaderCommand::AddSplits(splits) => reader.add_splits(splits)?,
        ReaderCommand::NoMoreSplits => reader.no_more_splits(),
        ReaderCommand::Checkpoint(reply) => {
            let _ = reply.send(reader.suspend());
        }
        ReaderCommand::Resume => reader.resume(),
        ReaderCommand::Stop => return Ok(false),
    }
    Ok(true)
}

async fn run_reader(
    mut reader: SourceReader,
    mut commands: mpsc::UnboundedReceiver<ReaderCommand>,
    reports: mpsc::UnboundedSender<ReaderReport>,
    sink: mpsc::Sender<SinkMessage>,
) {
    let id = reader.id();
    let report = |r: ReaderReport| {
        let _ = reports.send(r);
    };
    let fail = |reader: &mut SourceReader, reason: String| ReaderReport::Failed {
        reader: reader.id(),
        in_flight: reader.close(),
        reason,
    };

    loop {
        while let Ok(command) = commands.try_recv() {
            match handle_command(&mut reader, command) {
                Ok(true) => {}
                Ok(false) => return,
                Err(e) => return report(fail(&mut reader, e.to_string())),
            }
        }

        let wait = match reader.poll_next() {
            Ok(ReaderPoll::Records(records)) => {
                for record in records {
                    if sink.send(SinkMessage::Record(record)).await.is_err() {
                        return report(fail(&mut reader, "sink closed".into()));
                    }
                }
                tokio::task::yield_now().await;
                continue;
            }
            Ok(ReaderPoll::SplitFinished(split_id)) => {
                report(ReaderReport::SplitFinished {
                    reader: id,
                    split_id,
                });
                continue;
            }
            Ok(ReaderPoll::EndOfInput) => return report(ReaderReport::Finished { reader: id }),
            Ok(ReaderPoll::Pause(pause)) => Some(pause),
            Ok(ReaderPoll::Idle) => None,
            Err(SourceError::SplitFailed {
                split_id,
                row_index,
                source,
            }) => {
                report(ReaderReport::SplitFailed {
                    reader: id,
                    split_id,
                    reason: format!("row {row_index}: {source}"),
                });
                continue;
            }
            Err(e) => return report(fail(&mut reader, e.to_string())),
        };

        let command = match wait {
            Some(pause) => tokio::select! {
                command = commands.recv() => command,
                _ = tokio::time::sleep(pause) => continue,
            },
            None => commands.recv().await,
        };
        let Some(command) = command else { return };
        match handle_command(&mut reader, command) {
            Ok(true) => {}
            Ok(false) => return,
            Err(e) => return report(fail(&mut reader, e.to_string())),
        }
    }
}
