//! Fake synthetic data source.
//!
//! A source plugin that generates deterministic rows from a configured
//! schema, partitioned into splits that parallel readers consume. Progress
//! checkpoints let a restarted job continue exactly where it stopped.
//!
//! # Crates
//!
//! - `fake_types` - column types, schemas and values
//! - `fake_generator` - generation rules and the deterministic row generator
//! - `split_source` - splits, the split enumerator and source readers
//! - `checkpoint` - checkpoint files and stores
//!
//! This crate holds the plugin facade ([`FakeSource`]), its YAML
//! configuration, and a local runtime that drives the source end to end.
//!
//! # CLI Usage
//!
//! ```bash
//! # Generate 1000 rows over 4 splits as JSON Lines
//! fake-source run --config fake.yaml --output rows.jsonl
//!
//! # Streaming mode with checkpoints every 10 seconds, resuming after restart
//! fake-source run --config fake.yaml --job-mode streaming \
//!   --checkpoint-dir .fake-source-checkpoints --checkpoint-interval 10s --restore
//!
//! # Check a configuration without generating anything
//! fake-source validate --config fake.yaml
//! ```

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod runtime;
pub mod sink;
pub mod source;

pub use self::checkpoint::FakeSourceCheckpoint;
pub use config::{parse_duration, RateConfig, SourceConfig};
pub use error::ConfigError;
pub use runtime::{LocalRuntime, RunSummary, RuntimeOptions};
pub use sink::{JsonLinesSink, MemorySink, RecordSink};
pub use source::{
    CatalogTable, FakeSource, JobMode, SourceCapabilities, TablePath, PLUGIN_NAME, PLUGIN_TYPE,
};
