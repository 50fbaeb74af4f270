//! Value representations produced by the row generator.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use uuid::Uuid;

/// A single generated value.
///
/// Serializes untagged so that JSON output reads naturally: integers as
/// numbers, temporals as ISO strings, maps as `[key, value]` pairs and
/// nested rows as arrays.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FakeValue {
    /// Null value
    Null,

    /// Boolean value
    Bool(bool),

    /// 8-bit signed integer
    TinyInt(i8),

    /// 16-bit signed integer
    SmallInt(i16),

    /// 32-bit signed integer
    Int(i32),

    /// 64-bit signed integer
    BigInt(i64),

    /// 32-bit floating point
    Float(f32),

    /// 64-bit floating point
    Double(f64),

    /// Decimal stored as its canonical string form
    Decimal(String),

    /// String value
    String(String),

    /// Binary data
    Bytes(Vec<u8>),

    /// Date value
    Date(NaiveDate),

    /// Time value
    Time(NaiveTime),

    /// Timestamp value
    Timestamp(NaiveDateTime),

    /// UUID value
    Uuid(Uuid),

    /// Array of values
    Array(Vec<FakeValue>),

    /// Map entries in generation order
    Map(Vec<(FakeValue, FakeValue)>),

    /// Nested row
    Row(Vec<FakeValue>),
}

impl FakeValue {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Try to get this value as an i64 (any integer width).
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::TinyInt(i) => Some(*i as i64),
            Self::SmallInt(i) => Some(*i as i64),
            Self::Int(i) => Some(*i as i64),
            Self::BigInt(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get this value as an f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f as f64),
            Self::Double(f) => Some(*f),
            _ => None,
        }
    }

    /// Try to get this value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Decimal(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get this value as an array.
    pub fn as_array(&self) -> Option<&[FakeValue]> {
        match self {
            Self::Array(values) | Self::Row(values) => Some(values),
            _ => None,
        }
    }
}

/// One generated row: the values of the projected columns, in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FakeRow {
    values: Vec<FakeValue>,
}

impl FakeRow {
    /// Create a row from its values.
    pub fn new(values: Vec<FakeValue>) -> Self {
        Self { values }
    }

    /// Values in column order.
    pub fn values(&self) -> &[FakeValue] {
        &self.values
    }

    /// Value at a column position.
    pub fn get(&self, position: usize) -> Option<&FakeValue> {
        self.values.get(position)
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row holds no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Consume the row, returning its values.
    pub fn into_values(self) -> Vec<FakeValue> {
        self.values
    }
}
