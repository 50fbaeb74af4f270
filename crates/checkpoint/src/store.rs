//! Checkpoint storage trait.

use anyhow::Result;
use async_trait::async_trait;

use crate::CheckpointFile;

/// Trait for checkpoint storage operations.
///
/// This trait abstracts the storage backend, allowing the same checkpoint
/// logic to work with:
/// - Filesystem storage (`FilesystemStore`)
/// - In-memory storage (`MemoryStore`)
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Persist a checkpoint file.
    async fn store_checkpoint(&self, file: &CheckpointFile) -> Result<()>;

    /// Read the checkpoint with the highest id for a source type.
    ///
    /// Returns None if no checkpoint exists.
    async fn read_latest(&self, source_type: &str) -> Result<Option<CheckpointFile>>;

    /// Delete all but the newest `keep` checkpoints of a source type.
    async fn prune(&self, source_type: &str, keep: usize) -> Result<usize>;
}
