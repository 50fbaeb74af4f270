//! Records emitted by readers.

use fake_types::FakeRow;
use serde::Serialize;
use std::sync::Arc;

/// One generated row, tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRecord {
    /// Produced table the row belongs to
    pub table: Arc<str>,

    /// Split that generated the row
    pub split_id: u64,

    /// Split-local index of the row
    pub row_index: u64,

    /// Column values
    pub row: FakeRow,
}
