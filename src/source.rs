//! The `FakeSource` plugin facade.
//!
//! [`FakeSource::prepare`] turns host configuration into an immutable schema
//! and generation config, then hands out the enumerator and readers the host
//! runtime drives.

use crate::config::{parse_duration, SourceConfig};
use crate::error::ConfigError;
use fake_generator::{GenerationConfig, GeneratorError, RateLimit, RowGenerator};
use fake_types::{ColumnType, Schema, SchemaError};
use serde::{Deserialize, Serialize};
use split_source::{
    Boundedness, EnumeratorState, ReaderContext, ReaderId, SourceReader, SplitEnumerator,
    MAX_BATCH_SIZE,
};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Plugin name reported in validation failures and checkpoints.
pub const PLUGIN_NAME: &str = "FakeSource";

/// Plugin kind reported in validation failures.
pub const PLUGIN_TYPE: &str = "source";

/// Table produced when no identifiers are configured.
pub const DEFAULT_TABLE: &str = "fake";

/// Job mode of the host. Batch jobs read a bounded source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum JobMode {
    Batch,
    Streaming,
}

impl JobMode {
    pub fn boundedness(self) -> Boundedness {
        match self {
            JobMode::Batch => Boundedness::Bounded,
            JobMode::Streaming => Boundedness::Unbounded,
        }
    }
}

/// What the source supports beyond plain reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceCapabilities {
    /// Splits can be read by several readers at once
    pub parallelism: bool,
    /// Readers can emit a subset of the columns
    pub column_projection: bool,
}

/// Identifier of a produced table: `table`, `db.table` or `db.schema.table`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TablePath {
    pub database: Option<String>,
    pub schema: Option<String>,
    pub table: String,
}

impl TablePath {
    /// Parse a dotted table identifier.
    pub fn parse(identifier: &str) -> Result<Self, ConfigError> {
        let parts: Vec<&str> = identifier.split('.').collect();
        if parts.iter().any(|p| p.trim().is_empty()) {
            return Err(invalid_identifier(identifier));
        }
        let owned = |s: &str| s.trim().to_string();
        match parts.as_slice() {
            [table] => Ok(Self {
                database: None,
                schema: None,
                table: owned(table),
            }),
            [database, table] => Ok(Self {
                database: Some(owned(database)),
                schema: None,
                table: owned(table),
            }),
            [database, schema, table] => Ok(Self {
                database: Some(owned(database)),
                schema: Some(owned(schema)),
                table: owned(table),
            }),
            _ => Err(invalid_identifier(identifier)),
        }
    }
}

fn invalid_identifier(identifier: &str) -> ConfigError {
    ConfigError::validation(
        "table-identifier-format",
        format!("'{identifier}' is not of the form [database.][schema.]table"),
    )
}

impl fmt::Display for TablePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(database) = &self.database {
            write!(f, "{database}.")?;
        }
        if let Some(schema) = &self.schema {
            write!(f, "{schema}.")?;
        }
        write!(f, "{}", self.table)
    }
}

/// Logical table descriptor produced by the source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogTable {
    pub path: TablePath,
    pub schema: Arc<Schema>,
}

/// A prepared fake source instance.
#[derive(Debug, Clone)]
pub struct FakeSource {
    generation: Arc<GenerationConfig>,
    generator: Arc<RowGenerator>,
    boundedness: Boundedness,
    tables: Vec<TablePath>,
    batch_size: u64,
}

impl FakeSource {
    /// Validate `config` and build the source for `job_mode`.
    ///
    /// The first violated rule is reported; nothing is built on failure.
    pub fn prepare(config: &SourceConfig, job_mode: JobMode) -> Result<Self, ConfigError> {
        let columns = config.schema.clone().ok_or_else(|| {
            ConfigError::validation("schema-present", "a schema with at least one column is required")
        })?;
        let schema = Schema::new(columns).map_err(schema_violation)?;

        let rate = match &config.rate {
            Some(rate) => {
                let interval = parse_duration(&rate.interval).map_err(|e| {
                    ConfigError::validation("duration-format", format!("rate.interval: {e}"))
                })?;
                Some(RateLimit {
                    rows_per_interval: rate.rows_per_interval,
                    interval,
                })
            }
            None => None,
        };

        let generation = GenerationConfig {
            columns: config.columns.clone(),
            defaults: config.defaults.clone(),
            row_num: config.row_num,
            split_num: config.split_num,
            seed: config.seed,
            rate,
        };

        let tables = parse_tables(&config.table_identifiers)?;

        if !(1..=MAX_BATCH_SIZE).contains(&config.batch_size) {
            return Err(ConfigError::validation(
                "batch-size-range",
                format!(
                    "batch_size must be between 1 and {MAX_BATCH_SIZE}, got {}",
                    config.batch_size
                ),
            ));
        }

        let schema = Arc::new(schema);
        let generation = Arc::new(generation);
        let generator = RowGenerator::new(schema.clone(), generation.clone()).map_err(|e| match e {
            GeneratorError::InvalidRule(violation) => violation.into(),
            GeneratorError::Schema(e) => schema_violation(e),
            other => ConfigError::validation("generator-type-match", other.to_string()),
        })?;

        let boundedness = job_mode.boundedness();
        info!(
            "Prepared {PLUGIN_NAME}: {} columns, {} splits, {:?}, tables {}",
            schema.len(),
            generation.split_num,
            boundedness,
            tables
                .iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Self {
            generation,
            generator: Arc::new(generator),
            boundedness,
            tables,
            batch_size: config.batch_size,
        })
    }

    pub fn plugin_name(&self) -> &'static str {
        PLUGIN_NAME
    }

    pub fn boundedness(&self) -> Boundedness {
        self.boundedness
    }

    pub fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities {
            parallelism: true,
            column_projection: true,
        }
    }

    /// Schema of emitted rows, after projection.
    pub fn schema(&self) -> &Arc<Schema> {
        self.generator.schema()
    }

    pub fn generation_config(&self) -> &Arc<GenerationConfig> {
        &self.generation
    }

    /// One catalog table per table identifier, all sharing the schema.
    pub fn produced_tables(&self) -> Vec<CatalogTable> {
        self.tables
            .iter()
            .map(|path| CatalogTable {
                path: path.clone(),
                schema: self.schema().clone(),
            })
            .collect()
    }

    /// Row type of emitted records.
    pub fn produced_type(&self) -> ColumnType {
        ColumnType::row(self.schema().columns().to_vec())
    }

    /// Restrict emitted columns to `columns`, in the given order.
    ///
    /// Retained columns keep the values an unprojected source would emit.
    pub fn with_projection<S: AsRef<str>>(&self, columns: &[S]) -> Result<Self, ConfigError> {
        let generator = self.generator.with_projection(columns).map_err(|e| match e {
            GeneratorError::Schema(e) => {
                ConfigError::validation("projection-column", e.to_string())
            }
            other => ConfigError::validation("projection-column", other.to_string()),
        })?;
        debug!("Projected {PLUGIN_NAME} to {} columns", generator.schema().len());
        Ok(Self {
            generator: Arc::new(generator),
            ..self.clone()
        })
    }

    pub fn create_enumerator(&self) -> SplitEnumerator {
        SplitEnumerator::create(&self.generation, self.boundedness)
    }

    /// Rebuild the enumerator from a checkpointed state.
    pub fn restore_enumerator(&self, state: EnumeratorState) -> split_source::Result<SplitEnumerator> {
        SplitEnumerator::restore(&self.generation, self.boundedness, state)
    }

    pub fn create_reader(&self, reader_id: ReaderId) -> SourceReader {
        let tables = self
            .tables
            .iter()
            .map(|t| Arc::<str>::from(t.to_string()))
            .collect();
        let context = ReaderContext::new(self.generator.clone(), tables)
            .with_rate(self.generation.rate)
            .with_batch_size(self.batch_size);
        SourceReader::new(reader_id, context)
    }
}

fn schema_violation(e: SchemaError) -> ConfigError {
    match e {
        SchemaError::Empty => ConfigError::validation("schema-present", e.to_string()),
        SchemaError::DuplicateColumn(_) => {
            ConfigError::validation("unique-column-names", e.to_string())
        }
        SchemaError::ColumnNotFound(_) => ConfigError::validation("unknown-column", e.to_string()),
    }
}

fn parse_tables(identifiers: &[String]) -> Result<Vec<TablePath>, ConfigError> {
    if identifiers.is_empty() {
        return Ok(vec![TablePath {
            database: None,
            schema: None,
            table: DEFAULT_TABLE.to_string(),
        }]);
    }
    let mut seen = HashSet::new();
    identifiers
        .iter()
        .map(|identifier| {
            let path = TablePath::parse(identifier)?;
            if !seen.insert(path.clone()) {
                return Err(ConfigError::validation(
                    "table-identifier-format",
                    format!("table '{identifier}' is listed twice"),
                ));
            }
            Ok(path)
        })
        .collect()
}
