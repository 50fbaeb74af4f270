//! Column types understood by the fake source.
//!
//! `ColumnType` covers the primitive types the generator can produce plus the
//! three composite shapes (array, map, row) that recurse into other types.

use crate::schema::ColumnDefinition;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;

/// Column type of a fake source schema.
///
/// # YAML Format
///
/// Simple types can be specified as strings:
/// ```yaml
/// type: int
/// type: string
/// type: timestamp
/// ```
///
/// Parameterized and composite types use object format:
/// ```yaml
/// type:
///   type: decimal
///   precision: 10
///   scale: 2
/// type:
///   type: array
///   element_type: int
/// type:
///   type: row
///   fields:
///     - name: street
///       type: string
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnType {
    /// Boolean value
    Bool,

    /// 8-bit signed integer
    TinyInt,

    /// 16-bit signed integer
    SmallInt,

    /// 32-bit signed integer
    Int,

    /// 64-bit signed integer
    BigInt,

    /// 32-bit IEEE 754 floating point
    Float,

    /// 64-bit IEEE 754 floating point
    Double,

    /// Exact decimal with specified precision and scale
    Decimal {
        /// Total number of digits
        precision: u8,
        /// Number of digits after the decimal point
        scale: u8,
    },

    /// Variable-length UTF-8 string
    String,

    /// Binary data
    Bytes,

    /// Date only (YYYY-MM-DD)
    Date,

    /// Time only (HH:MM:SS)
    Time,

    /// Timestamp without timezone
    Timestamp,

    /// UUID (128-bit)
    Uuid,

    /// Column that only ever holds null
    Null,

    /// Array of a specific type
    Array {
        /// Element type
        element_type: Box<ColumnType>,
    },

    /// Map from a primitive key type to a value type
    Map {
        /// Key type (must be primitive)
        key_type: Box<ColumnType>,
        /// Value type
        value_type: Box<ColumnType>,
    },

    /// Nested row with named fields
    Row {
        /// Ordered field definitions
        fields: Vec<ColumnDefinition>,
    },
}

impl Serialize for ColumnType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeMap;

        match self {
            // Complex types - serialize as map
            Self::Decimal { precision, scale } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("type", "decimal")?;
                map.serialize_entry("precision", precision)?;
                map.serialize_entry("scale", scale)?;
                map.end()
            }
            Self::Array { element_type } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "array")?;
                map.serialize_entry("element_type", element_type)?;
                map.end()
            }
            Self::Map {
                key_type,
                value_type,
            } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("type", "map")?;
                map.serialize_entry("key_type", key_type)?;
                map.serialize_entry("value_type", value_type)?;
                map.end()
            }
            Self::Row { fields } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "row")?;
                map.serialize_entry("fields", fields)?;
                map.end()
            }
            // Simple types - serialize as string
            simple => serializer.serialize_str(simple.name()),
        }
    }
}

fn simple_type(name: &str) -> Option<ColumnType> {
    let ty = match name {
        "bool" | "boolean" => ColumnType::Bool,
        "tiny_int" | "tinyint" => ColumnType::TinyInt,
        "small_int" | "smallint" => ColumnType::SmallInt,
        "int" => ColumnType::Int,
        "big_int" | "bigint" => ColumnType::BigInt,
        "float" => ColumnType::Float,
        "double" => ColumnType::Double,
        "string" | "text" => ColumnType::String,
        "bytes" => ColumnType::Bytes,
        "date" => ColumnType::Date,
        "time" => ColumnType::Time,
        "timestamp" => ColumnType::Timestamp,
        "uuid" => ColumnType::Uuid,
        "null" => ColumnType::Null,
        _ => return None,
    };
    Some(ty)
}

impl<'de> Deserialize<'de> for ColumnType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{Error, MapAccess, Visitor};

        struct ColumnTypeVisitor;

        impl<'de> Visitor<'de> for ColumnTypeVisitor {
            type Value = ColumnType;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a string or map representing a ColumnType")
            }

            // Handle string format: "int", "string", etc.
            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: Error,
            {
                simple_type(value).ok_or_else(|| E::custom(format!("unknown simple type: {value}")))
            }

            // Handle map format: {"type": "decimal", "precision": 10, "scale": 2}
            fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut type_name: Option<String> = None;
                let mut fields: HashMap<String, serde_yaml::Value> = HashMap::new();

                while let Some(key) = map.next_key::<String>()? {
                    if key == "type" {
                        type_name = Some(map.next_value()?);
                    } else {
                        fields.insert(key, map.next_value()?);
                    }
                }

                let type_name = type_name.ok_or_else(|| M::Error::missing_field("type"))?;

                if let Some(simple) = simple_type(&type_name) {
                    return Ok(simple);
                }

                match type_name.as_str() {
                    "decimal" => {
                        let precision = get_field_required(&fields, "precision")?;
                        let scale = get_field_required(&fields, "scale")?;
                        Ok(ColumnType::Decimal { precision, scale })
                    }
                    "array" => {
                        let element_type: ColumnType =
                            get_field_required(&fields, "element_type")?;
                        Ok(ColumnType::array(element_type))
                    }
                    "map" => {
                        let key_type: ColumnType = get_field_required(&fields, "key_type")?;
                        let value_type: ColumnType = get_field_required(&fields, "value_type")?;
                        Ok(ColumnType::map(key_type, value_type))
                    }
                    "row" => {
                        let fields = get_field_required(&fields, "fields")?;
                        Ok(ColumnType::Row { fields })
                    }
                    _ => Err(M::Error::custom(format!("unknown type: {type_name}"))),
                }
            }
        }

        deserializer.deserialize_any(ColumnTypeVisitor)
    }
}

fn get_field_required<T: for<'de> Deserialize<'de>, E: serde::de::Error>(
    fields: &HashMap<String, serde_yaml::Value>,
    key: &'static str,
) -> Result<T, E> {
    let value = fields.get(key).ok_or_else(|| E::missing_field(key))?;
    serde_yaml::from_value(value.clone())
        .map_err(|e| E::custom(format!("invalid field '{key}': {e}")))
}

impl ColumnType {
    /// Create a new Decimal type with the given precision and scale.
    pub fn decimal(precision: u8, scale: u8) -> Self {
        Self::Decimal { precision, scale }
    }

    /// Create a new Array type with the given element type.
    pub fn array(element_type: ColumnType) -> Self {
        Self::Array {
            element_type: Box::new(element_type),
        }
    }

    /// Create a new Map type.
    pub fn map(key_type: ColumnType, value_type: ColumnType) -> Self {
        Self::Map {
            key_type: Box::new(key_type),
            value_type: Box::new(value_type),
        }
    }

    /// Create a new Row type from its fields.
    pub fn row(fields: Vec<ColumnDefinition>) -> Self {
        Self::Row { fields }
    }

    /// Short type name, as used in YAML.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::TinyInt => "tiny_int",
            Self::SmallInt => "small_int",
            Self::Int => "int",
            Self::BigInt => "big_int",
            Self::Float => "float",
            Self::Double => "double",
            Self::Decimal { .. } => "decimal",
            Self::String => "string",
            Self::Bytes => "bytes",
            Self::Date => "date",
            Self::Time => "time",
            Self::Timestamp => "timestamp",
            Self::Uuid => "uuid",
            Self::Null => "null",
            Self::Array { .. } => "array",
            Self::Map { .. } => "map",
            Self::Row { .. } => "row",
        }
    }

    /// Check if this type is an integer type.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::TinyInt | Self::SmallInt | Self::Int | Self::BigInt
        )
    }

    /// Check if this type represents a numeric type.
    pub fn is_numeric(&self) -> bool {
        self.is_integer() || matches!(self, Self::Float | Self::Double | Self::Decimal { .. })
    }

    /// Check if this type represents a temporal type.
    pub fn is_temporal(&self) -> bool {
        matches!(self, Self::Date | Self::Time | Self::Timestamp)
    }

    /// Check if this type nests other types.
    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Array { .. } | Self::Map { .. } | Self::Row { .. })
    }

    /// Inclusive value bounds of an integer type.
    pub fn integer_bounds(&self) -> Option<(i64, i64)> {
        match self {
            Self::TinyInt => Some((i8::MIN as i64, i8::MAX as i64)),
            Self::SmallInt => Some((i16::MIN as i64, i16::MAX as i64)),
            Self::Int => Some((i32::MIN as i64, i32::MAX as i64)),
            Self::BigInt => Some((i64::MIN, i64::MAX)),
            _ => None,
        }
    }

    /// Nesting depth: 0 for primitives, 1 + deepest child for composites.
    pub fn depth(&self) -> usize {
        match self {
            Self::Array { element_type } => 1 + element_type.depth(),
            Self::Map {
                key_type,
                value_type,
            } => 1 + key_type.depth().max(value_type.depth()),
            Self::Row { fields } => {
                1 + fields
                    .iter()
                    .map(|f| f.column_type.depth())
                    .max()
                    .unwrap_or(0)
            }
            _ => 0,
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Decimal { precision, scale } => write!(f, "decimal({precision}, {scale})"),
            Self::Array { element_type } => write!(f, "array<{element_type}>"),
            Self::Map {
                key_type,
                value_type,
            } => write!(f, "map<{key_type}, {value_type}>"),
            Self::Row { fields } => {
                f.write_str("row<")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{} {}", field.name, field.column_type)?;
                }
                f.write_str(">")
            }
            simple => f.write_str(simple.name()),
        }
    }
}
