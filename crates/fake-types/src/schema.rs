//! Schema definitions for the fake source.
//!
//! A [`Schema`] is an ordered list of uniquely named columns. It is built once
//! at prepare time and shared by reference across every split and reader of a
//! source instance.

use crate::types::ColumnType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Error type for schema operations.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SchemaError {
    /// Schema has no columns
    #[error("Schema must define at least one column")]
    Empty,

    /// Two columns (or two fields of one row type) share a name
    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),

    /// Column not found in schema
    #[error("Column not found: {0}")]
    ColumnNotFound(String),
}

/// Column definition: a name and its type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnDefinition {
    /// Column name
    pub name: String,

    /// Column type
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl ColumnDefinition {
    /// Create a new column definition.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// Ordered, immutable collection of uniquely named columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<ColumnDefinition>", into = "Vec<ColumnDefinition>")]
pub struct Schema {
    columns: Vec<ColumnDefinition>,

    /// Cached column lookup
    positions: HashMap<String, usize>,
}

impl Schema {
    /// Build a schema, rejecting empty column lists and duplicate names.
    ///
    /// Field names of nested row types must be unique within their row.
    pub fn new(columns: Vec<ColumnDefinition>) -> Result<Self, SchemaError> {
        if columns.is_empty() {
            return Err(SchemaError::Empty);
        }
        let mut positions = HashMap::with_capacity(columns.len());
        for (idx, column) in columns.iter().enumerate() {
            if positions.insert(column.name.clone(), idx).is_some() {
                return Err(SchemaError::DuplicateColumn(column.name.clone()));
            }
            check_nested_names(&column.name, &column.column_type)?;
        }
        Ok(Self { columns, positions })
    }

    /// All columns in declaration order.
    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the schema has no columns. Always false for a built schema.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Get a column by name.
    pub fn get_column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.position(name).map(|idx| &self.columns[idx])
    }

    /// Position of a column by name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Get all column names in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Narrow the schema to the given columns, in the requested order.
    pub fn project<S: AsRef<str>>(&self, names: &[S]) -> Result<Schema, SchemaError> {
        let columns = names
            .iter()
            .map(|name| {
                self.get_column(name.as_ref())
                    .cloned()
                    .ok_or_else(|| SchemaError::ColumnNotFound(name.as_ref().to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Schema::new(columns)
    }
}

fn check_nested_names(path: &str, column_type: &ColumnType) -> Result<(), SchemaError> {
    match column_type {
        ColumnType::Row { fields } => {
            let mut seen = std::collections::HashSet::new();
            for field in fields {
                if !seen.insert(field.name.as_str()) {
                    return Err(SchemaError::DuplicateColumn(format!(
                        "{path}.{}",
                        field.name
                    )));
                }
                check_nested_names(&format!("{path}.{}", field.name), &field.column_type)?;
            }
            Ok(())
        }
        ColumnType::Array { element_type } => check_nested_names(path, element_type),
        ColumnType::Map {
            key_type,
            value_type,
        } => {
            check_nested_names(path, key_type)?;
            check_nested_names(path, value_type)
        }
        _ => Ok(()),
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns
    }
}

impl TryFrom<Vec<ColumnDefinition>> for Schema {
    type Error = SchemaError;

    fn try_from(columns: Vec<ColumnDefinition>) -> Result<Self, Self::Error> {
        Schema::new(columns)
    }
}

impl From<Schema> for Vec<ColumnDefinition> {
    fn from(schema: Schema) -> Self {
        schema.columns
    }
}
