//! Row generator: a pure mapping from `(seed, row_index)` to a row.

use crate::config::{GenerationConfig, GenerationDefaults, RuleViolation};
use crate::generators::collection::{choose, generate_sample_array};
use crate::generators::numeric::{
    generate_decimal, generate_decimal_range, generate_float_range, generate_int,
    generate_int_range, int_value,
};
use crate::generators::pattern::generate_pattern;
use crate::generators::string::{generate_bytes, generate_string, pick_length};
use crate::generators::temporal::{
    default_end, default_start, generate_date_range, generate_time, generate_timestamp_range,
};
use crate::generators::uuid::generate_uuid;
use crate::plan::{self, ValuePlan};
use crate::stream::StreamPath;
use fake_types::{ColumnType, FakeRow, FakeValue, Schema, SchemaError};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

const RANDOM_FLOAT_MAX: f64 = 1_000_000.0;

/// Error type for generator operations.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// Configuration rejected at construction
    #[error("Invalid generation rule: {0}")]
    InvalidRule(#[from] RuleViolation),

    /// A sequential or ranged value left the column type's domain
    #[error("Value overflow in column '{column}' at row {row_index}")]
    Overflow { column: String, row_index: u64 },

    /// No generator exists for the type at this position
    #[error("Unsupported type {column_type} in column '{column}'")]
    UnsupportedType { column: String, column_type: String },

    /// Composite nesting exceeds the configured limit
    #[error("Column '{column}' nests deeper than {limit} levels")]
    NestingTooDeep { column: String, limit: usize },

    /// Schema error
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),
}

#[derive(Debug, Clone)]
struct CompiledColumn {
    name: String,
    column_type: ColumnType,
    plan: ValuePlan,
    null_rate: f64,
}

/// Deterministic row generator shared by every reader of a source.
///
/// Every column draws from its own stream keyed by column name, so the value
/// of a column never depends on which other columns are generated, their
/// null rates, or their position.
#[derive(Debug, Clone)]
pub struct RowGenerator {
    /// Output schema (projected when a projection is applied)
    schema: Arc<Schema>,
    defaults: GenerationDefaults,
    columns: Vec<CompiledColumn>,
}

impl RowGenerator {
    /// Validate `config` against `schema` and compile every column rule.
    pub fn new(schema: Arc<Schema>, config: Arc<GenerationConfig>) -> Result<Self, GeneratorError> {
        config.validate(&schema)?;

        let columns = schema
            .columns()
            .iter()
            .map(|column| {
                let rule = config.rule(&column.name);
                let plan = plan::compile(&column.name, &rule.generator, &column.column_type)?;
                Ok(CompiledColumn {
                    name: column.name.clone(),
                    column_type: column.column_type.clone(),
                    plan,
                    null_rate: rule.null_rate,
                })
            })
            .collect::<Result<Vec<_>, RuleViolation>>()?;

        tracing::debug!(columns = columns.len(), "Compiled row generator");

        Ok(Self {
            schema,
            defaults: config.defaults.clone(),
            columns,
        })
    }

    /// Restrict output to the named columns, in the requested order.
    ///
    /// Values of the remaining columns are identical to an unprojected run.
    pub fn with_projection<S: AsRef<str>>(&self, names: &[S]) -> Result<Self, GeneratorError> {
        let schema = self.schema.project(names)?;
        let columns = schema
            .columns()
            .iter()
            .filter_map(|def| self.columns.iter().find(|c| c.name == def.name).cloned())
            .collect();
        Ok(Self {
            schema: Arc::new(schema),
            defaults: self.defaults.clone(),
            columns,
        })
    }

    /// Output schema.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Generate the row at `row_index` of the split seeded with `seed`.
    pub fn generate(&self, seed: u64, row_index: u64) -> Result<FakeRow, GeneratorError> {
        let root = StreamPath::new(seed);
        let values = self
            .columns
            .iter()
            .map(|column| self.generate_column(column, root, seed, row_index))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(FakeRow::new(values))
    }

    fn generate_column(
        &self,
        column: &CompiledColumn,
        root: StreamPath,
        seed: u64,
        row_index: u64,
    ) -> Result<FakeValue, GeneratorError> {
        let path = root.column(&column.name);
        let mut rng = path.rng(row_index);

        // The null draw always happens so the value draws that follow sit at
        // the same stream offset whatever the null rate.
        let null_draw: f64 = rng.random();
        if null_draw < column.null_rate {
            return Ok(FakeValue::Null);
        }

        let overflow = || GeneratorError::Overflow {
            column: column.name.clone(),
            row_index,
        };

        let value = match &column.plan {
            ValuePlan::Random => {
                return self.random_value(&column.name, &column.column_type, path, &mut rng, row_index, 0)
            }
            ValuePlan::Null => FakeValue::Null,
            ValuePlan::Static(value) => value.clone(),
            ValuePlan::Sequential { start } => {
                let value = i64::try_from(row_index)
                    .ok()
                    .and_then(|index| start.checked_add(index))
                    .ok_or_else(overflow)?;
                int_value(&column.column_type, value).ok_or_else(overflow)?
            }
            ValuePlan::Pattern { pattern } => generate_pattern(pattern, &mut rng, seed, row_index),
            ValuePlan::IntRange { min, max } => {
                generate_int_range(&mut rng, &column.column_type, *min, *max).ok_or_else(overflow)?
            }
            ValuePlan::FloatRange { min, max } => {
                generate_float_range(&mut rng, &column.column_type, *min, *max)
            }
            ValuePlan::DecimalRange { min, max } => {
                let scale = match column.column_type {
                    ColumnType::Decimal { scale, .. } => scale,
                    _ => 0,
                };
                generate_decimal_range(&mut rng, *min, *max, scale)
            }
            ValuePlan::StringLength { min, max } => {
                let length = pick_length(&mut rng, *min, *max);
                match column.column_type {
                    ColumnType::Bytes => FakeValue::Bytes(generate_bytes(&mut rng, length)),
                    _ => FakeValue::String(generate_string(&mut rng, length)),
                }
            }
            ValuePlan::OneOf(values) => choose(&mut rng, values).cloned().unwrap_or(FakeValue::Null),
            ValuePlan::WeightedBool(true_weight) => FakeValue::Bool(rng.random_bool(*true_weight)),
            ValuePlan::TimestampRange { start, end } => {
                FakeValue::Timestamp(generate_timestamp_range(&mut rng, *start, *end))
            }
            ValuePlan::DateRange { start, end } => {
                FakeValue::Date(generate_date_range(&mut rng, *start, *end))
            }
            ValuePlan::SampleArray {
                pool,
                min_length,
                max_length,
            } => generate_sample_array(&mut rng, pool, *min_length, *max_length),
        };
        Ok(value)
    }

    /// Type-driven value. Composite children each get their own stream.
    fn random_value(
        &self,
        column: &str,
        column_type: &ColumnType,
        path: StreamPath,
        rng: &mut ChaCha8Rng,
        row_index: u64,
        level: usize,
    ) -> Result<FakeValue, GeneratorError> {
        if column_type.is_composite() && level >= self.defaults.max_nesting_depth {
            return Err(GeneratorError::NestingTooDeep {
                column: column.to_string(),
                limit: self.defaults.max_nesting_depth,
            });
        }

        let value = match column_type {
            ColumnType::Null => FakeValue::Null,
            ColumnType::Bool => FakeValue::Bool(rng.random_bool(0.5)),
            ColumnType::TinyInt | ColumnType::SmallInt | ColumnType::Int | ColumnType::BigInt => {
                generate_int(rng, column_type).ok_or_else(|| GeneratorError::Overflow {
                    column: column.to_string(),
                    row_index,
                })?
            }
            ColumnType::Float | ColumnType::Double => {
                generate_float_range(rng, column_type, 0.0, RANDOM_FLOAT_MAX)
            }
            ColumnType::Decimal { precision, scale } => generate_decimal(rng, *precision, *scale),
            ColumnType::String => {
                FakeValue::String(generate_string(rng, self.defaults.string_length))
            }
            ColumnType::Bytes => FakeValue::Bytes(generate_bytes(rng, self.defaults.bytes_length)),
            ColumnType::Date => FakeValue::Date(generate_date_range(
                rng,
                default_start().date(),
                default_end().date(),
            )),
            ColumnType::Time => FakeValue::Time(generate_time(rng)),
            ColumnType::Timestamp => FakeValue::Timestamp(generate_timestamp_range(
                rng,
                default_start(),
                default_end(),
            )),
            ColumnType::Uuid => FakeValue::Uuid(generate_uuid(rng)),
            ColumnType::Array { element_type } => {
                let items = (0..self.defaults.array_size)
                    .map(|i| {
                        let child = path.element(i);
                        self.random_value(
                            column,
                            element_type,
                            child,
                            &mut child.rng(row_index),
                            row_index,
                            level + 1,
                        )
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                FakeValue::Array(items)
            }
            ColumnType::Map {
                key_type,
                value_type,
            } => {
                if key_type.is_composite() {
                    return Err(GeneratorError::UnsupportedType {
                        column: column.to_string(),
                        column_type: column_type.to_string(),
                    });
                }
                let mut entries: Vec<(FakeValue, FakeValue)> =
                    Vec::with_capacity(self.defaults.map_size);
                for i in 0..self.defaults.map_size {
                    let key_path = path.map_key(i);
                    let key = self.random_value(
                        column,
                        key_type,
                        key_path,
                        &mut key_path.rng(row_index),
                        row_index,
                        level + 1,
                    )?;
                    // Narrow key domains (bool, tiny_int) repeat; first entry wins.
                    if entries.iter().any(|(k, _)| *k == key) {
                        continue;
                    }
                    let value_path = path.map_value(i);
                    let value = self.random_value(
                        column,
                        value_type,
                        value_path,
                        &mut value_path.rng(row_index),
                        row_index,
                        level + 1,
                    )?;
                    entries.push((key, value));
                }
                FakeValue::Map(entries)
            }
            ColumnType::Row { fields } => {
                let values = fields
                    .iter()
                    .map(|field| {
                        let child = path.field(&field.name);
                        self.random_value(
                            column,
                            &field.column_type,
                            child,
                            &mut child.rng(row_index),
                            row_index,
                            level + 1,
                        )
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                FakeValue::Row(values)
            }
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ColumnRule, GeneratorConfig};
    use fake_types::ColumnDefinition;

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::new(vec![
                ColumnDefinition::new("id", ColumnType::Int),
                ColumnDefinition::new("name", ColumnType::String),
                ColumnDefinition::new("score", ColumnType::Double),
                ColumnDefinition::new("tags", ColumnType::array(ColumnType::String)),
            ])
            .unwrap(),
        )
    }

    fn generator(config: GenerationConfig) -> RowGenerator {
        RowGenerator::new(schema(), Arc::new(config)).unwrap()
    }

    #[test]
    fn test_deterministic_generation() {
        let gen1 = generator(GenerationConfig::new(1, 10));
        let gen2 = generator(GenerationConfig::new(1, 10));

        for index in 0..20 {
            assert_eq!(gen1.generate(7, index).unwrap(), gen2.generate(7, index).unwrap());
        }
        assert_ne!(gen1.generate(7, 0).unwrap(), gen1.generate(8, 0).unwrap());
        assert_ne!(gen1.generate(7, 0).unwrap(), gen1.generate(7, 1).unwrap());
    }

    #[test]
    fn test_row_shape() {
        let row = generator(GenerationConfig::new(1, 10)).generate(0, 0).unwrap();
        assert_eq!(row.len(), 4);
        assert!(matches!(row.get(0), Some(FakeValue::Int(v)) if *v >= 0));
        assert_eq!(row.get(1).and_then(|v| v.as_str()).map(str::len), Some(5));
        let score = row.get(2).and_then(|v| v.as_f64()).unwrap();
        assert!((0.0..RANDOM_FLOAT_MAX).contains(&score));
        assert_eq!(row.get(3).and_then(|v| v.as_array()).map(|a| a.len()), Some(5));
    }

    #[test]
    fn test_null_rate_does_not_perturb_siblings() {
        let plain = generator(GenerationConfig::new(1, 10));
        let nulls = generator(
            GenerationConfig::new(1, 10).with_rule("name", ColumnRule::default().with_null_rate(0.5)),
        );

        let mut saw_null = false;
        for index in 0..50 {
            let a = plain.generate(3, index).unwrap();
            let b = nulls.generate(3, index).unwrap();
            assert_eq!(a.get(0), b.get(0));
            assert_eq!(a.get(2), b.get(2));
            assert_eq!(a.get(3), b.get(3));
            match b.get(1) {
                Some(FakeValue::Null) => saw_null = true,
                other => assert_eq!(a.get(1), other),
            }
        }
        assert!(saw_null);
    }

    #[test]
    fn test_null_rate_one_always_null() {
        let gen = generator(
            GenerationConfig::new(1, 10).with_rule("id", ColumnRule::default().with_null_rate(1.0)),
        );
        for index in 0..10 {
            assert_eq!(gen.generate(0, index).unwrap().get(0), Some(&FakeValue::Null));
        }
    }

    #[test]
    fn test_projection_keeps_values() {
        let full = generator(GenerationConfig::new(1, 10));
        let projected = full.with_projection(&["score", "id"]).unwrap();
        assert_eq!(projected.schema().column_names(), vec!["score", "id"]);

        for index in 0..10 {
            let a = full.generate(11, index).unwrap();
            let b = projected.generate(11, index).unwrap();
            assert_eq!(b.len(), 2);
            assert_eq!(b.get(0), a.get(2));
            assert_eq!(b.get(1), a.get(0));
        }

        assert!(matches!(
            full.with_projection(&["missing"]),
            Err(GeneratorError::Schema(SchemaError::ColumnNotFound(_)))
        ));
    }

    #[test]
    fn test_resume_matches_uninterrupted_run() {
        let gen = generator(GenerationConfig::new(1, 10));
        let uninterrupted: Vec<FakeRow> = (0..10).map(|i| gen.generate(5, i).unwrap()).collect();

        let restarted = generator(GenerationConfig::new(1, 10));
        let resumed: Vec<FakeRow> = (4..10).map(|i| restarted.generate(5, i).unwrap()).collect();
        assert_eq!(&uninterrupted[4..], resumed.as_slice());
    }

    #[test]
    fn test_sequential_and_overflow() {
        let schema = Arc::new(
            Schema::new(vec![ColumnDefinition::new("n", ColumnType::TinyInt)]).unwrap(),
        );
        let config = GenerationConfig::new(1, 10)
            .with_rule("n", ColumnRule::new(GeneratorConfig::Sequential { start: 120 }));
        let gen = RowGenerator::new(schema, Arc::new(config)).unwrap();

        assert_eq!(gen.generate(0, 7).unwrap().get(0), Some(&FakeValue::TinyInt(127)));
        assert!(matches!(
            gen.generate(0, 8),
            Err(GeneratorError::Overflow { row_index: 8, .. })
        ));
    }

    #[test]
    fn test_configured_rules() {
        let schema = Arc::new(
            Schema::new(vec![
                ColumnDefinition::new("age", ColumnType::SmallInt),
                ColumnDefinition::new("email", ColumnType::String),
                ColumnDefinition::new("status", ColumnType::String),
                ColumnDefinition::new("price", ColumnType::decimal(8, 2)),
            ])
            .unwrap(),
        );
        let config = GenerationConfig::new(1, 10)
            .with_rule("age", ColumnRule::new(GeneratorConfig::IntRange { min: 18, max: 80 }))
            .with_rule(
                "email",
                ColumnRule::new(GeneratorConfig::Pattern {
                    pattern: "user_{index}@example.com".into(),
                }),
            )
            .with_rule(
                "status",
                ColumnRule::new(GeneratorConfig::OneOf {
                    values: serde_yaml::from_str("[active, inactive]").unwrap(),
                }),
            )
            .with_rule(
                "price",
                ColumnRule::new(GeneratorConfig::DecimalRange { min: 1.0, max: 2.0 }),
            );
        let gen = RowGenerator::new(schema, Arc::new(config)).unwrap();

        for index in 0..20 {
            let row = gen.generate(1, index).unwrap();
            let age = row.get(0).and_then(|v| v.as_i64()).unwrap();
            assert!((18..=80).contains(&age));
            assert_eq!(
                row.get(1).and_then(|v| v.as_str()),
                Some(format!("user_{index}@example.com").as_str())
            );
            let status = row.get(2).and_then(|v| v.as_str()).unwrap();
            assert!(status == "active" || status == "inactive");
            let price: f64 = row.get(3).and_then(|v| v.as_str()).unwrap().parse().unwrap();
            assert!((1.0..=2.0).contains(&price));
        }
    }

    #[test]
    fn test_composite_columns_do_not_alias() {
        let schema = Arc::new(
            Schema::new(vec![
                ColumnDefinition::new("a", ColumnType::array(ColumnType::BigInt)),
                ColumnDefinition::new("b", ColumnType::array(ColumnType::BigInt)),
                ColumnDefinition::new(
                    "m",
                    ColumnType::map(ColumnType::String, ColumnType::row(vec![
                        ColumnDefinition::new("x", ColumnType::Bool),
                        ColumnDefinition::new("y", ColumnType::Uuid),
                    ])),
                ),
            ])
            .unwrap(),
        );
        let gen = RowGenerator::new(schema, Arc::new(GenerationConfig::new(1, 1))).unwrap();
        let row = gen.generate(0, 0).unwrap();
        assert_ne!(row.get(0), row.get(1));

        let FakeValue::Map(entries) = row.get(2).unwrap() else {
            panic!("Expected Map");
        };
        assert_eq!(entries.len(), 5);
        assert!(entries
            .iter()
            .all(|(_, v)| matches!(v, FakeValue::Row(fields) if fields.len() == 2)));
    }

    #[test]
    fn test_new_rejects_invalid_rule() {
        let config = GenerationConfig::new(1, 10)
            .with_rule("id", ColumnRule::new(GeneratorConfig::WeightedBool { true_weight: 0.5 }));
        let err = RowGenerator::new(schema(), Arc::new(config)).unwrap_err();
        assert!(matches!(
            err,
            GeneratorError::InvalidRule(RuleViolation { rule: "generator-type-match", .. })
        ));
    }
}
