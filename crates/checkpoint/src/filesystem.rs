//! Filesystem-based checkpoint storage implementation.

use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::store::CheckpointStore;
use crate::CheckpointFile;

/// Filesystem implementation of CheckpointStore trait.
///
/// Stores checkpoints as JSON files in a directory. Files are written to a
/// temporary name and renamed into place, so a crash mid-write never leaves
/// a truncated checkpoint behind.
#[derive(Debug, Clone)]
pub struct FilesystemStore {
    dir: PathBuf,
}

impl FilesystemStore {
    /// Create a new FilesystemStore with the given directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Get the directory path.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Checkpoint files of a source type, oldest first.
    fn list(&self, source_type: &str) -> Result<Vec<PathBuf>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let prefix = format!("checkpoint_{source_type}_");
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let filename = entry.file_name().to_string_lossy().to_string();
            if filename.starts_with(&prefix) && filename.ends_with(".json") {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }
}

#[async_trait]
impl CheckpointStore for FilesystemStore {
    async fn store_checkpoint(&self, file: &CheckpointFile) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;

        let filename = self.dir.join(file.file_name());
        let tmp = filename.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(file)?)?;
        std::fs::rename(&tmp, &filename)?;

        tracing::info!("Stored checkpoint to {}", filename.display());
        Ok(())
    }

    async fn read_latest(&self, source_type: &str) -> Result<Option<CheckpointFile>> {
        match self.list(source_type)?.pop() {
            Some(path) => {
                let content = std::fs::read_to_string(&path)?;
                let file: CheckpointFile = serde_json::from_str(&content)?;
                tracing::debug!("Read checkpoint from {}", path.display());
                Ok(Some(file))
            }
            None => Ok(None),
        }
    }

    async fn prune(&self, source_type: &str, keep: usize) -> Result<usize> {
        let files = self.list(source_type)?;
        let excess = files.len().saturating_sub(keep);
        for path in &files[..excess] {
            std::fs::remove_file(path)?;
        }
        Ok(excess)
    }
}
