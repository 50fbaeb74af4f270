//! Error types for the split protocol.

use crate::ReaderId;
use fake_generator::GeneratorError;
use thiserror::Error;

/// Errors raised by the enumerator and readers.
#[derive(Error, Debug)]
pub enum SourceError {
    /// A split id appears more than once in a checkpoint.
    #[error("Inconsistent checkpoint: split {split_id} appears more than once")]
    DuplicateSplit { split_id: u64 },

    /// A checkpointed split has produced more rows than its limit.
    #[error("Inconsistent checkpoint: split {split_id} produced {produced} rows, limit is {row_limit}")]
    ProducedExceedsLimit {
        split_id: u64,
        produced: u64,
        row_limit: u64,
    },

    /// A split is recorded as finished but is still pending or assigned.
    #[error("Inconsistent checkpoint: split {split_id} is both finished and live")]
    FinishedSplitStillLive { split_id: u64 },

    /// A reader reported on a split it does not own.
    #[error("Reader {reader} does not own split {split_id}")]
    SplitNotOwned { reader: ReaderId, split_id: u64 },

    /// A failure was reported for a reader the enumerator does not know.
    #[error("Unknown reader: {0}")]
    UnknownReader(ReaderId),

    /// Row generation failed; the split cannot make progress.
    #[error("Split {split_id} failed at row {row_index}: {source}")]
    SplitFailed {
        split_id: u64,
        row_index: u64,
        #[source]
        source: GeneratorError,
    },

    /// The reader was closed and accepts no more work.
    #[error("Reader {0} is closed")]
    ReaderClosed(ReaderId),
}

/// Result type for split protocol operations.
pub type Result<T> = std::result::Result<T, SourceError>;
