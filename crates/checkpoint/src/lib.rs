//! Checkpoint persistence for the fake source.
//!
//! Provides storage-agnostic checkpoint file handling for any serializable
//! checkpoint payload.
//!
//! # Architecture
//!
//! - [`Checkpoint`] marks a payload type and names its source type
//! - [`CheckpointFile`] wraps a payload with its checkpoint id and metadata
//! - [`CheckpointStore`] abstracts where files live
//! - [`CheckpointManager`] numbers checkpoints and saves/loads them
//!
//! ## Storage Backends
//!
//! - [`FilesystemStore`] - One JSON file per checkpoint in a directory
//! - [`MemoryStore`] - Process-local, for runs without durable checkpoints

mod file;
mod filesystem;
mod manager;
mod memory;
pub mod store;

#[cfg(test)]
mod tests;

// Re-export file types
pub use file::CheckpointFile;

// Re-export manager types
pub use manager::CheckpointManager;

// Re-export store trait
pub use store::CheckpointStore;

// Re-export storage implementations
pub use filesystem::FilesystemStore;
pub use memory::MemoryStore;

/// Trait that checkpoint payloads must implement.
///
/// # Example
///
/// ```rust
/// use checkpoint::Checkpoint;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct OffsetCheckpoint {
///     pub offset: u64,
/// }
///
/// impl Checkpoint for OffsetCheckpoint {
///     const SOURCE_TYPE: &'static str = "offsets";
///
///     fn summary(&self) -> String {
///         format!("offset={}", self.offset)
///     }
/// }
/// ```
pub trait Checkpoint: serde::Serialize + for<'de> serde::Deserialize<'de> + Clone {
    /// Source type identifier, stored in every file and checked on load.
    const SOURCE_TYPE: &'static str;

    /// Short human-readable description for logs.
    fn summary(&self) -> String;
}
