//! YAML configuration of the fake source.
//!
//! ```yaml
//! schema:
//!   - name: id
//!     type: big_int
//!   - name: email
//!     type: string
//! columns:
//!   id:
//!     generator:
//!       type: sequential
//!       start: 1
//!   email:
//!     generator:
//!       type: pattern
//!       pattern: "user_{index}@example.com"
//!     null_rate: 0.1
//! row_num: 1000
//! split_num: 4
//! seed: 42
//! rate:
//!   rows_per_interval: 100
//!   interval: 1s
//! table_identifiers: [shop.users]
//! ```

mod duration;

pub use duration::parse_duration;

use crate::error::ConfigError;
use fake_generator::{ColumnRule, GenerationDefaults};
use fake_types::ColumnDefinition;
use serde::{Deserialize, Serialize};
use split_source::DEFAULT_BATCH_SIZE;
use std::collections::BTreeMap;
use std::path::Path;

fn default_row_num() -> u64 {
    5
}

fn default_split_num() -> u32 {
    1
}

fn default_batch_size() -> u64 {
    DEFAULT_BATCH_SIZE
}

/// Reader pacing as written in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateConfig {
    /// Rows emitted per interval, per reader
    pub rows_per_interval: u64,

    /// Interval length, e.g. `1s` or `250ms`
    pub interval: String,
}

/// Fake source configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Ordered column definitions
    #[serde(default)]
    pub schema: Option<Vec<ColumnDefinition>>,

    /// Per-column generation rules
    #[serde(default)]
    pub columns: BTreeMap<String, ColumnRule>,

    /// Defaults for type-driven generation
    #[serde(default)]
    pub defaults: GenerationDefaults,

    /// Total rows in batch mode
    #[serde(default = "default_row_num")]
    pub row_num: u64,

    /// Number of splits
    #[serde(default = "default_split_num")]
    pub split_num: u32,

    /// Base seed
    #[serde(default)]
    pub seed: u64,

    /// Optional reader pacing
    #[serde(default)]
    pub rate: Option<RateConfig>,

    /// Rows generated per reader poll
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,

    /// Produced tables sharing the schema; defaults to a single `fake` table
    #[serde(default)]
    pub table_identifiers: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            schema: None,
            columns: BTreeMap::new(),
            defaults: GenerationDefaults::default(),
            row_num: default_row_num(),
            split_num: default_split_num(),
            seed: 0,
            rate: None,
            batch_size: default_batch_size(),
            table_identifiers: Vec::new(),
        }
    }
}

impl SourceConfig {
    /// Parse from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read and parse a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Config with the given schema and defaults elsewhere.
    pub fn with_schema(schema: Vec<ColumnDefinition>) -> Self {
        Self {
            schema: Some(schema),
            ..Self::default()
        }
    }
}
