//! Unit tests for the checkpoint crate.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tempfile::TempDir;

use crate::{
    Checkpoint, CheckpointFile, CheckpointManager, CheckpointStore, FilesystemStore, MemoryStore,
};

/// Test checkpoint type for unit tests.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
struct TestCheckpoint {
    produced: Vec<u64>,
}

impl Checkpoint for TestCheckpoint {
    const SOURCE_TYPE: &'static str = "test";

    fn summary(&self) -> String {
        format!("{} splits", self.produced.len())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
struct OtherCheckpoint {
    value: i64,
}

impl Checkpoint for OtherCheckpoint {
    const SOURCE_TYPE: &'static str = "other";

    fn summary(&self) -> String {
        self.value.to_string()
    }
}

// ============================================================================
// CheckpointFile Tests
// ============================================================================

#[test]
fn test_checkpoint_file_roundtrip() {
    let original = TestCheckpoint {
        produced: vec![3, 5],
    };
    let file = CheckpointFile::new(&original, 7).unwrap();
    assert_eq!(file.source_type, "test");
    assert_eq!(file.checkpoint_id, 7);

    let json = serde_json::to_string_pretty(&file).unwrap();
    let loaded: CheckpointFile = serde_json::from_str(&json).unwrap();
    let parsed: TestCheckpoint = loaded.parse().unwrap();
    assert_eq!(parsed, original);
}

#[test]
fn test_checkpoint_file_type_mismatch() {
    let file = CheckpointFile::new(&OtherCheckpoint { value: 1 }, 1).unwrap();
    let err = file.parse::<TestCheckpoint>().unwrap_err();
    assert!(err.to_string().contains("type mismatch"));
}

#[test]
fn test_file_names_sort_by_id() {
    let cp = TestCheckpoint { produced: vec![] };
    let a = CheckpointFile::new(&cp, 9).unwrap().file_name();
    let b = CheckpointFile::new(&cp, 10).unwrap().file_name();
    assert!(a < b);
}

// ============================================================================
// Store Tests
// ============================================================================

#[tokio::test]
async fn test_filesystem_store_latest_and_prune() {
    let temp_dir = TempDir::new().unwrap();
    let store = FilesystemStore::new(temp_dir.path().join("checkpoints"));

    assert!(store.read_latest("test").await.unwrap().is_none());

    for id in 1..=3 {
        let cp = TestCheckpoint {
            produced: vec![id],
        };
        store
            .store_checkpoint(&CheckpointFile::new(&cp, id).unwrap())
            .await
            .unwrap();
    }
    store
        .store_checkpoint(&CheckpointFile::new(&OtherCheckpoint { value: 1 }, 99).unwrap())
        .await
        .unwrap();

    let latest = store.read_latest("test").await.unwrap().unwrap();
    assert_eq!(latest.checkpoint_id, 3);

    assert_eq!(store.prune("test", 1).await.unwrap(), 2);
    let remaining = std::fs::read_dir(store.dir()).unwrap().count();
    assert_eq!(remaining, 2);
    assert_eq!(
        store.read_latest("other").await.unwrap().unwrap().checkpoint_id,
        99
    );
}

#[tokio::test]
async fn test_memory_store() {
    let store = MemoryStore::new();
    for id in [2, 1, 3] {
        store
            .store_checkpoint(&CheckpointFile::new(&OtherCheckpoint { value: id as i64 }, id).unwrap())
            .await
            .unwrap();
    }
    assert_eq!(
        store.read_latest("other").await.unwrap().unwrap().checkpoint_id,
        3
    );
    assert_eq!(store.prune("other", 2).await.unwrap(), 1);
    assert!(store.read_latest("test").await.unwrap().is_none());
}

// ============================================================================
// CheckpointManager Tests
// ============================================================================

#[tokio::test]
async fn test_manager_numbers_and_restores() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(FilesystemStore::new(temp_dir.path()));

    let manager = CheckpointManager::new(store.clone());
    assert!(manager
        .restore_latest::<TestCheckpoint>()
        .await
        .unwrap()
        .is_none());

    let first = TestCheckpoint { produced: vec![1] };
    let second = TestCheckpoint { produced: vec![4] };
    assert_eq!(manager.emit_checkpoint(&first).await.unwrap(), 1);
    assert_eq!(manager.emit_checkpoint(&second).await.unwrap(), 2);

    // A fresh manager (after restart) continues the numbering.
    let restarted = CheckpointManager::new(store);
    let (id, restored) = restarted
        .restore_latest::<TestCheckpoint>()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(id, 2);
    assert_eq!(restored, second);
    assert_eq!(restarted.next_checkpoint_id(), 3);
}

#[tokio::test]
async fn test_manager_retention() {
    let store = Arc::new(MemoryStore::new());
    let manager = CheckpointManager::new(store.clone()).with_retention(2);
    for value in 0..5 {
        manager
            .emit_checkpoint(&OtherCheckpoint { value })
            .await
            .unwrap();
    }
    assert_eq!(store.prune("other", 2).await.unwrap(), 0);
    let latest: OtherCheckpoint = store
        .read_latest("other")
        .await
        .unwrap()
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(latest.value, 4);
}
