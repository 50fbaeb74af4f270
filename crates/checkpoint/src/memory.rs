//! In-memory checkpoint storage.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Mutex;

use crate::store::CheckpointStore;
use crate::CheckpointFile;

/// Keeps checkpoints in process memory. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: Mutex<Vec<CheckpointFile>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn files(&self) -> std::sync::MutexGuard<'_, Vec<CheckpointFile>> {
        self.files
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl CheckpointStore for MemoryStore {
    async fn store_checkpoint(&self, file: &CheckpointFile) -> Result<()> {
        self.files().push(file.clone());
        Ok(())
    }

    async fn read_latest(&self, source_type: &str) -> Result<Option<CheckpointFile>> {
        Ok(self
            .files()
            .iter()
            .filter(|f| f.source_type == source_type)
            .max_by_key(|f| f.checkpoint_id)
            .cloned())
    }

    async fn prune(&self, source_type: &str, keep: usize) -> Result<usize> {
        let mut files = self.files();
        let mut ids: Vec<u64> = files
            .iter()
            .filter(|f| f.source_type == source_type)
            .map(|f| f.checkpoint_id)
            .collect();
        ids.sort_unstable();
        let excess = ids.len().saturating_sub(keep);
        let dropped = &ids[..excess];
        files.retain(|f| f.source_type != source_type || !dropped.contains(&f.checkpoint_id));
        Ok(excess)
    }
}
