//! Deterministic row generator for the fake source.
//!
//! [`RowGenerator`] maps `(seed, row_index)` to a row of the configured
//! schema. The mapping is pure: the same inputs give a bit-identical row on
//! every call and in every process, which is what lets a split resume from a
//! checkpointed row index and continue exactly where it stopped.
//!
//! # Architecture
//!
//! ```text
//! GenerationConfig (per-column rules + global knobs)
//!        │  validate + compile
//!        ▼
//! ┌──────────────────────┐
//! │     RowGenerator     │
//! │                      │
//! │  - schema (Arc)      │
//! │  - compiled columns  │
//! └──────────┬───────────┘
//!            │  per column: StreamPath(seed).column(name).rng(row_index)
//!            ▼
//!       FakeRow { values }
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use fake_generator::{ColumnRule, GenerationConfig, GeneratorConfig, RowGenerator};
//! use fake_types::{ColumnDefinition, ColumnType, Schema};
//!
//! let schema = Arc::new(Schema::new(vec![
//!     ColumnDefinition::new("id", ColumnType::Int),
//!     ColumnDefinition::new("email", ColumnType::String),
//! ]).unwrap());
//!
//! let config = GenerationConfig::new(2, 10).with_rule(
//!     "email",
//!     ColumnRule::new(GeneratorConfig::Pattern {
//!         pattern: "user_{index}@example.com".into(),
//!     }),
//! );
//!
//! let generator = RowGenerator::new(schema, Arc::new(config)).unwrap();
//! let row = generator.generate(0, 3).unwrap();
//! assert_eq!(row.get(1).and_then(|v| v.as_str()), Some("user_3@example.com"));
//! ```
//!
//! # Generators
//!
//! - `random` - Type-driven default (the default for unconfigured columns)
//! - `sequential` - `start + row_index`
//! - `pattern` - Pattern strings with placeholders (`{index}`, `{seed}`, `{uuid}`, `{rand:N}`)
//! - `int_range` - Random integers in a range
//! - `float_range` - Random floats in a range
//! - `decimal_range` - Random decimals in a range
//! - `string_length` - Random strings or bytes with bounded length
//! - `one_of` - Random selection from a list
//! - `weighted_bool` - Boolean with configurable true probability
//! - `timestamp_range` - Random timestamps in a range
//! - `date_range` - Random dates in a range
//! - `sample_array` - Array of random samples from a pool
//! - `static` - Static value
//! - `null` - Null value

pub mod config;
pub mod generator;
pub mod generators;
mod plan;
pub mod stream;

// Re-exports for convenience
pub use config::{
    ColumnRule, GenerationConfig, GenerationDefaults, GeneratorConfig, RateLimit, RuleViolation,
};
pub use generator::{GeneratorError, RowGenerator};
pub use stream::{table_seed, StreamPath};
