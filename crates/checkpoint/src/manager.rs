//! Checkpoint manager: numbers, saves and loads checkpoints.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::{store::CheckpointStore, Checkpoint, CheckpointFile};

/// Manager for checkpoint emission and recovery.
///
/// # Example
///
/// ```rust,ignore
/// use checkpoint::{CheckpointManager, FilesystemStore};
///
/// let manager = CheckpointManager::new(Arc::new(FilesystemStore::new("/tmp/checkpoints")));
///
/// // Resume from the newest checkpoint, if any
/// let restored: Option<(u64, EnumeratorState)> = manager.restore_latest().await?;
///
/// // Save a checkpoint
/// let id = manager.emit_checkpoint(&state).await?;
/// ```
pub struct CheckpointManager {
    store: Arc<dyn CheckpointStore>,
    next_id: AtomicU64,
    retain: Option<usize>,
}

impl CheckpointManager {
    /// Create a manager numbering checkpoints from 1.
    pub fn new(store: Arc<dyn CheckpointStore>) -> Self {
        Self {
            store,
            next_id: AtomicU64::new(1),
            retain: None,
        }
    }

    /// Keep only the newest `retain` checkpoints after each save.
    pub fn with_retention(mut self, retain: usize) -> Self {
        self.retain = Some(retain.max(1));
        self
    }

    /// Id the next emitted checkpoint will get.
    pub fn next_checkpoint_id(&self) -> u64 {
        self.next_id.load(Ordering::SeqCst)
    }

    /// Save a checkpoint and return its id.
    pub async fn emit_checkpoint<C: Checkpoint>(&self, checkpoint: &C) -> anyhow::Result<u64> {
        let checkpoint_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let file = CheckpointFile::new(checkpoint, checkpoint_id)?;
        self.store.store_checkpoint(&file).await?;

        tracing::info!(
            "Emitted {} checkpoint {}: {}",
            C::SOURCE_TYPE,
            checkpoint_id,
            checkpoint.summary()
        );

        if let Some(retain) = self.retain {
            let pruned = self.store.prune(C::SOURCE_TYPE, retain).await?;
            if pruned > 0 {
                tracing::debug!("Pruned {pruned} old checkpoints");
            }
        }

        Ok(checkpoint_id)
    }

    /// Load the newest checkpoint of type `C`.
    ///
    /// Later checkpoints are numbered after the restored one.
    pub async fn restore_latest<C: Checkpoint>(&self) -> anyhow::Result<Option<(u64, C)>> {
        let Some(file) = self.store.read_latest(C::SOURCE_TYPE).await? else {
            return Ok(None);
        };
        let checkpoint: C = file.parse()?;
        self.next_id
            .fetch_max(file.checkpoint_id + 1, Ordering::SeqCst);

        tracing::info!(
            "Restored {} checkpoint {}: {}",
            C::SOURCE_TYPE,
            file.checkpoint_id,
            checkpoint.summary()
        );
        Ok(Some((file.checkpoint_id, checkpoint)))
    }
}
