//! Compilation of column rules into value plans.
//!
//! Rules arrive as loosely typed configuration (YAML values, date strings).
//! Compiling resolves them against the column type once, so that per-row
//! generation never parses or converts configuration.

use crate::config::{GeneratorConfig, RuleViolation};
use crate::generators::static_value::yaml_to_value;
use crate::generators::temporal::{parse_date, parse_timestamp};
use chrono::{NaiveDate, NaiveDateTime};
use fake_types::{ColumnType, FakeValue};

/// A column rule resolved against its column type.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ValuePlan {
    Random,
    Sequential { start: i64 },
    Pattern { pattern: String },
    IntRange { min: i64, max: i64 },
    FloatRange { min: f64, max: f64 },
    DecimalRange { min: f64, max: f64 },
    StringLength { min: usize, max: usize },
    OneOf(Vec<FakeValue>),
    WeightedBool(f64),
    TimestampRange { start: NaiveDateTime, end: NaiveDateTime },
    DateRange { start: NaiveDate, end: NaiveDate },
    SampleArray {
        pool: Vec<FakeValue>,
        min_length: usize,
        max_length: usize,
    },
    Static(FakeValue),
    Null,
}

fn type_mismatch(column: &str, generator: &str, column_type: &ColumnType) -> RuleViolation {
    RuleViolation::new(
        "generator-type-match",
        format!("column '{column}': generator '{generator}' cannot produce {column_type}"),
    )
}

fn ordered<T: PartialOrd + std::fmt::Display>(
    column: &str,
    min: T,
    max: T,
) -> Result<(), RuleViolation> {
    if min > max {
        return Err(RuleViolation::new(
            "range-bounds",
            format!("column '{column}': min {min} is greater than max {max}"),
        ));
    }
    Ok(())
}

/// Reject map types whose key is not primitive, at any depth.
pub(crate) fn check_map_keys(column: &str, column_type: &ColumnType) -> Result<(), RuleViolation> {
    match column_type {
        ColumnType::Map {
            key_type,
            value_type,
        } => {
            if key_type.is_composite() {
                return Err(RuleViolation::new(
                    "map-key-primitive",
                    format!("column '{column}': map key type {key_type} is not primitive"),
                ));
            }
            check_map_keys(column, value_type)
        }
        ColumnType::Array { element_type } => check_map_keys(column, element_type),
        ColumnType::Row { fields } => fields
            .iter()
            .try_for_each(|f| check_map_keys(column, &f.column_type)),
        _ => Ok(()),
    }
}

fn convert(
    column: &str,
    value: &serde_yaml::Value,
    column_type: &ColumnType,
) -> Result<FakeValue, RuleViolation> {
    yaml_to_value(value, column_type).ok_or_else(|| {
        RuleViolation::new(
            "value-type",
            format!("column '{column}': value {value:?} is not a valid {column_type}"),
        )
    })
}

/// Resolve a generator config against the column type.
pub(crate) fn compile(
    column: &str,
    generator: &GeneratorConfig,
    column_type: &ColumnType,
) -> Result<ValuePlan, RuleViolation> {
    match generator {
        GeneratorConfig::Random => Ok(ValuePlan::Random),

        GeneratorConfig::Null => Ok(ValuePlan::Null),

        GeneratorConfig::Sequential { start } => {
            if !column_type.is_integer() {
                return Err(type_mismatch(column, "sequential", column_type));
            }
            Ok(ValuePlan::Sequential { start: *start })
        }

        GeneratorConfig::Pattern { pattern } => {
            if *column_type != ColumnType::String {
                return Err(type_mismatch(column, "pattern", column_type));
            }
            Ok(ValuePlan::Pattern {
                pattern: pattern.clone(),
            })
        }

        GeneratorConfig::IntRange { min, max } => {
            let Some((type_min, type_max)) = column_type.integer_bounds() else {
                return Err(type_mismatch(column, "int_range", column_type));
            };
            ordered(column, *min, *max)?;
            if *min < type_min || *max > type_max {
                return Err(RuleViolation::new(
                    "range-within-type",
                    format!(
                        "column '{column}': range [{min}, {max}] exceeds {column_type} bounds [{type_min}, {type_max}]"
                    ),
                ));
            }
            Ok(ValuePlan::IntRange {
                min: *min,
                max: *max,
            })
        }

        GeneratorConfig::FloatRange { min, max } => {
            if !matches!(column_type, ColumnType::Float | ColumnType::Double) {
                return Err(type_mismatch(column, "float_range", column_type));
            }
            finite(column, *min, *max)?;
            ordered(column, *min, *max)?;
            if *column_type == ColumnType::Float
                && (min.abs() > f32::MAX as f64 || max.abs() > f32::MAX as f64)
            {
                return Err(RuleViolation::new(
                    "range-within-type",
                    format!("column '{column}': range [{min}, {max}] exceeds float bounds"),
                ));
            }
            Ok(ValuePlan::FloatRange {
                min: *min,
                max: *max,
            })
        }

        GeneratorConfig::DecimalRange { min, max } => {
            let ColumnType::Decimal { precision, scale } = column_type else {
                return Err(type_mismatch(column, "decimal_range", column_type));
            };
            finite(column, *min, *max)?;
            ordered(column, *min, *max)?;
            // Largest magnitude the type holds, e.g. 99.99 for decimal(4, 2).
            let integer_digits = precision.saturating_sub(*scale) as i32;
            let largest = 10f64.powi(integer_digits) - 10f64.powi(-(*scale as i32));
            if min.abs().max(max.abs()) > largest * (1.0 + f64::EPSILON) {
                return Err(RuleViolation::new(
                    "range-within-type",
                    format!(
                        "column '{column}': range [{min}, {max}] exceeds {column_type} bounds [-{largest}, {largest}]"
                    ),
                ));
            }
            Ok(ValuePlan::DecimalRange {
                min: *min,
                max: *max,
            })
        }

        GeneratorConfig::StringLength { min, max } => {
            if !matches!(column_type, ColumnType::String | ColumnType::Bytes) {
                return Err(type_mismatch(column, "string_length", column_type));
            }
            ordered(column, *min, *max)?;
            Ok(ValuePlan::StringLength {
                min: *min,
                max: *max,
            })
        }

        GeneratorConfig::OneOf { values } => {
            if column_type.is_composite() {
                return Err(type_mismatch(column, "one_of", column_type));
            }
            if values.is_empty() {
                return Err(RuleViolation::new(
                    "one-of-not-empty",
                    format!("column '{column}': one_of needs at least one value"),
                ));
            }
            let values = values
                .iter()
                .map(|v| convert(column, v, column_type))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ValuePlan::OneOf(values))
        }

        GeneratorConfig::WeightedBool { true_weight } => {
            if *column_type != ColumnType::Bool {
                return Err(type_mismatch(column, "weighted_bool", column_type));
            }
            if !(0.0..=1.0).contains(true_weight) {
                return Err(RuleViolation::new(
                    "range-bounds",
                    format!("column '{column}': true_weight {true_weight} is outside [0, 1]"),
                ));
            }
            Ok(ValuePlan::WeightedBool(*true_weight))
        }

        GeneratorConfig::TimestampRange { start, end } => {
            if *column_type != ColumnType::Timestamp {
                return Err(type_mismatch(column, "timestamp_range", column_type));
            }
            let start = parse_timestamp(start).ok_or_else(|| temporal_error(column, start))?;
            let end = parse_timestamp(end).ok_or_else(|| temporal_error(column, end))?;
            ordered(column, start, end)?;
            Ok(ValuePlan::TimestampRange { start, end })
        }

        GeneratorConfig::DateRange { start, end } => {
            if *column_type != ColumnType::Date {
                return Err(type_mismatch(column, "date_range", column_type));
            }
            let start = parse_date(start).ok_or_else(|| temporal_error(column, start))?;
            let end = parse_date(end).ok_or_else(|| temporal_error(column, end))?;
            ordered(column, start, end)?;
            Ok(ValuePlan::DateRange { start, end })
        }

        GeneratorConfig::SampleArray {
            pool,
            min_length,
            max_length,
        } => {
            let ColumnType::Array { element_type } = column_type else {
                return Err(type_mismatch(column, "sample_array", column_type));
            };
            if element_type.is_composite() {
                return Err(type_mismatch(column, "sample_array", column_type));
            }
            ordered(column, *min_length, *max_length)?;
            if pool.is_empty() && *max_length > 0 {
                return Err(RuleViolation::new(
                    "one-of-not-empty",
                    format!("column '{column}': sample_array pool is empty"),
                ));
            }
            let pool = pool
                .iter()
                .map(|v| convert(column, v, element_type))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ValuePlan::SampleArray {
                pool,
                min_length: *min_length,
                max_length: *max_length,
            })
        }

        GeneratorConfig::Static { value } => Ok(ValuePlan::Static(convert(
            column,
            value,
            column_type,
        )?)),
    }
}

fn finite(column: &str, min: f64, max: f64) -> Result<(), RuleViolation> {
    if !min.is_finite() || !max.is_finite() {
        return Err(RuleViolation::new(
            "range-bounds",
            format!("column '{column}': range bounds must be finite"),
        ));
    }
    Ok(())
}

fn temporal_error(column: &str, value: &str) -> RuleViolation {
    RuleViolation::new(
        "temporal-parse",
        format!("column '{column}': cannot parse '{value}'"),
    )
}
