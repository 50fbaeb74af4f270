//! Checkpoint file wrapper for storage-agnostic serialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Checkpoint;

/// Storage-agnostic checkpoint file wrapper.
///
/// # File Format
///
/// ```json
/// {
///     "source_type": "FakeSource",
///     "checkpoint_id": 3,
///     "checkpoint": {
///         "assigned": { "0": [{ "id": 0, "row_limit": 5, "seed": 0, "produced": 3 }] }
///     },
///     "created_at": "2024-01-01T00:00:00Z"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointFile {
    /// Source type identifier
    pub source_type: String,
    /// Monotonic checkpoint number
    pub checkpoint_id: u64,
    /// Serialized checkpoint payload
    pub checkpoint: serde_json::Value,
    /// Timestamp when this checkpoint file was created
    pub created_at: DateTime<Utc>,
}

impl CheckpointFile {
    /// Wrap a checkpoint payload.
    pub fn new<C: Checkpoint>(checkpoint: &C, checkpoint_id: u64) -> anyhow::Result<Self> {
        Ok(Self {
            source_type: C::SOURCE_TYPE.to_string(),
            checkpoint_id,
            checkpoint: serde_json::to_value(checkpoint)?,
            created_at: Utc::now(),
        })
    }

    /// Parse the payload into its concrete type.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The `source_type` doesn't match `C::SOURCE_TYPE`
    /// - The payload can't be deserialized into type `C`
    pub fn parse<C: Checkpoint>(&self) -> anyhow::Result<C> {
        if self.source_type != C::SOURCE_TYPE {
            anyhow::bail!(
                "Checkpoint type mismatch: expected '{}', found '{}'",
                C::SOURCE_TYPE,
                self.source_type
            );
        }
        Ok(serde_json::from_value(self.checkpoint.clone())?)
    }

    /// File name used by filesystem storage.
    ///
    /// Ids are zero-padded so lexical order matches checkpoint order.
    pub fn file_name(&self) -> String {
        format!(
            "checkpoint_{}_{:020}.json",
            self.source_type, self.checkpoint_id
        )
    }
}
