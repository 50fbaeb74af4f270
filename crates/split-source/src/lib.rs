//! Split-based parallel source protocol.
//!
//! A source partitions its work into [`FakeSourceSplit`]s. One
//! [`SplitEnumerator`] owns the split set and hands splits to
//! [`SourceReader`]s, which generate rows for them with a shared
//! [`RowGenerator`](fake_generator::RowGenerator). Progress survives restart
//! through [`EnumeratorState`] checkpoints: a split resumes at its
//! checkpointed `produced` index and yields exactly the rows an uninterrupted
//! run would have.
//!
//! ```text
//!                 RegisterReader / ReportSplitFinished /
//!                 ReportSplitFailed / ReaderFailed / SnapshotState
//!   ┌──────────┐ ─────────────────────────────────────────▶ ┌────────────────┐
//!   │ Reader 0 │                                            │                │
//!   ├──────────┤ ◀───────────────────────────────────────── │ SplitEnumerator│
//!   │ Reader 1 │        AddSplits / NoMoreSplits            │  (one lock)    │
//!   └──────────┘                                            └────────────────┘
//! ```
//!
//! Readers and the enumerator never share a lock: readers own their splits'
//! progress counters and talk to the enumerator only through requests.

pub mod enumerator;
pub mod error;
pub mod rate;
pub mod reader;
pub mod record;
pub mod split;
pub mod state;

use serde::{Deserialize, Serialize};

pub use enumerator::{EnumeratorEvent, EnumeratorRequest, EnumeratorResponse, SplitEnumerator};
pub use error::{Result, SourceError};
pub use reader::{ReaderContext, ReaderPoll, SourceReader, DEFAULT_BATCH_SIZE, MAX_BATCH_SIZE};
pub use record::SourceRecord;
pub use split::{FakeSourceSplit, SplitPhase};
pub use state::EnumeratorState;

/// Logical identity of a reader (its parallel subtask index).
pub type ReaderId = u32;

/// Whether a source has a finite amount of data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Boundedness {
    /// Finite; the enumerator eventually signals end-of-input
    Bounded,
    /// Runs until cancelled
    Unbounded,
}
