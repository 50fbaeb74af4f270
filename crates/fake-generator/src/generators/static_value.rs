//! Typed conversion of YAML values into generated values.
//!
//! Used for `static`, `one_of` and `sample_array` rules. A YAML value converts
//! only when it fits the target column type, so a pool of `[1, 300]` is
//! rejected for a `tiny_int` column instead of silently wrapping.

use super::numeric::{format_decimal, int_value};
use super::temporal::{parse_date, parse_time, parse_timestamp};
use fake_types::{ColumnType, FakeValue};
use serde_yaml::Value as YamlValue;

/// Convert a YAML value to a [`FakeValue`] of the given column type.
///
/// YAML null always converts to [`FakeValue::Null`].
pub fn yaml_to_value(yaml: &YamlValue, column_type: &ColumnType) -> Option<FakeValue> {
    if let YamlValue::Tagged(tagged) = yaml {
        return yaml_to_value(&tagged.value, column_type);
    }
    if yaml.is_null() {
        return Some(FakeValue::Null);
    }

    match column_type {
        ColumnType::Null => None,
        ColumnType::Bool => yaml.as_bool().map(FakeValue::Bool),
        ColumnType::TinyInt | ColumnType::SmallInt | ColumnType::Int | ColumnType::BigInt => {
            int_value(column_type, yaml.as_i64()?)
        }
        ColumnType::Float => yaml.as_f64().map(|f| FakeValue::Float(f as f32)),
        ColumnType::Double => yaml.as_f64().map(FakeValue::Double),
        ColumnType::Decimal { scale, .. } => match yaml {
            YamlValue::Number(n) => n.as_f64().map(|f| FakeValue::Decimal(format_decimal(f, *scale))),
            YamlValue::String(s) => s
                .parse::<f64>()
                .ok()
                .map(|f| FakeValue::Decimal(format_decimal(f, *scale))),
            _ => None,
        },
        ColumnType::String => yaml_scalar_string(yaml).map(FakeValue::String),
        ColumnType::Bytes => yaml.as_str().map(|s| FakeValue::Bytes(s.as_bytes().to_vec())),
        ColumnType::Date => yaml.as_str().and_then(parse_date).map(FakeValue::Date),
        ColumnType::Time => yaml.as_str().and_then(parse_time).map(FakeValue::Time),
        ColumnType::Timestamp => yaml
            .as_str()
            .and_then(parse_timestamp)
            .map(FakeValue::Timestamp),
        ColumnType::Uuid => yaml
            .as_str()
            .and_then(|s| uuid::Uuid::parse_str(s).ok())
            .map(FakeValue::Uuid),
        ColumnType::Array { element_type } => {
            let items = yaml.as_sequence()?;
            items
                .iter()
                .map(|item| yaml_to_value(item, element_type))
                .collect::<Option<Vec<_>>>()
                .map(FakeValue::Array)
        }
        ColumnType::Map {
            key_type,
            value_type,
        } => {
            let mapping = yaml.as_mapping()?;
            mapping
                .iter()
                .map(|(k, v)| Some((yaml_to_value(k, key_type)?, yaml_to_value(v, value_type)?)))
                .collect::<Option<Vec<_>>>()
                .map(FakeValue::Map)
        }
        ColumnType::Row { fields } => {
            let mapping = yaml.as_mapping()?;
            let known = mapping.keys().all(|k| {
                k.as_str()
                    .is_some_and(|k| fields.iter().any(|f| f.name == k))
            });
            if !known {
                return None;
            }
            fields
                .iter()
                .map(|field| match mapping.get(field.name.as_str()) {
                    Some(v) => yaml_to_value(v, &field.column_type),
                    None => Some(FakeValue::Null),
                })
                .collect::<Option<Vec<_>>>()
                .map(FakeValue::Row)
        }
    }
}

fn yaml_scalar_string(yaml: &YamlValue) -> Option<String> {
    match yaml {
        YamlValue::String(s) => Some(s.clone()),
        YamlValue::Number(n) => Some(n.to_string()),
        YamlValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
