//! Core types for the fake source.
//!
//! This crate provides the foundational types shared by the generator,
//! the split protocol and the source facade:
//!
//! - [`ColumnType`] - Primitive and composite column types
//! - [`ColumnDefinition`] / [`Schema`] - Ordered, uniquely named columns
//! - [`FakeValue`] / [`FakeRow`] - Generated values
//!
//! # Architecture
//!
//! ```text
//! fake-types (this crate)
//!    │
//!    ├─── fake-generator  (derives rows from a Schema)
//!    │
//!    ├─── split-source    (splits, enumerator, reader)
//!    │
//!    └─── fake-source     (facade, local runtime, CLI)
//! ```
//!
//! # Example
//!
//! ```rust
//! use fake_types::{ColumnDefinition, ColumnType, Schema};
//!
//! let schema = Schema::new(vec![
//!     ColumnDefinition::new("id", ColumnType::Int),
//!     ColumnDefinition::new("name", ColumnType::String),
//! ])
//! .unwrap();
//!
//! assert_eq!(schema.position("name"), Some(1));
//! ```

pub mod schema;
pub mod types;
pub mod values;

// Re-exports for convenience
pub use schema::{ColumnDefinition, Schema, SchemaError};
pub use types::ColumnType;
pub use values::{FakeRow, FakeValue};
