//! Generation rules: per-column generators plus global knobs.
//!
//! A [`GenerationConfig`] is built once when the source is prepared and is
//! never mutated afterwards. [`GenerationConfig::validate`] checks every rule
//! against the schema and reports the first violated rule.

use crate::plan;
use fake_types::Schema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Generator configuration for a column.
///
/// This enum defines the different types of value generators available.
/// `Random` picks a uniformly distributed value suited to the column type.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeneratorConfig {
    /// Type-driven default generation
    #[default]
    Random,

    /// Generate sequential integers from the split-local row index
    Sequential {
        /// Starting value
        #[serde(default)]
        start: i64,
    },

    /// Generate strings using a pattern with placeholders
    Pattern {
        /// Pattern string (supports {index}, {seed}, {uuid}, {rand:N})
        pattern: String,
    },

    /// Generate random integers in a range
    IntRange {
        /// Minimum value (inclusive)
        min: i64,
        /// Maximum value (inclusive)
        max: i64,
    },

    /// Generate random floats in a range
    FloatRange {
        /// Minimum value (inclusive)
        min: f64,
        /// Maximum value (inclusive)
        max: f64,
    },

    /// Generate random decimals in a range
    DecimalRange {
        /// Minimum value (inclusive)
        min: f64,
        /// Maximum value (inclusive)
        max: f64,
    },

    /// Generate random strings or bytes with a length in a range
    StringLength {
        /// Minimum length (inclusive)
        min: usize,
        /// Maximum length (inclusive)
        max: usize,
    },

    /// Random selection from a set of allowed values
    OneOf {
        /// Pool of values to select from
        values: Vec<serde_yaml::Value>,
    },

    /// Generate weighted boolean values
    WeightedBool {
        /// Weight for true value (0.0 to 1.0)
        true_weight: f64,
    },

    /// Generate timestamps in a range
    TimestampRange {
        /// Start timestamp (ISO 8601)
        start: String,
        /// End timestamp (ISO 8601)
        end: String,
    },

    /// Generate dates in a range
    DateRange {
        /// Start date (YYYY-MM-DD)
        start: String,
        /// End date (YYYY-MM-DD)
        end: String,
    },

    /// Generate arrays by sampling from a pool
    SampleArray {
        /// Pool of values to sample from
        pool: Vec<serde_yaml::Value>,
        /// Minimum array length
        #[serde(default)]
        min_length: usize,
        /// Maximum array length
        max_length: usize,
    },

    /// Generate a static value
    Static {
        /// The static value to use
        value: serde_yaml::Value,
    },

    /// Always generate null
    Null,
}

/// Generation rule of a single column.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ColumnRule {
    /// Value generator
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Probability in `[0, 1]` of emitting null instead of a value
    #[serde(default)]
    pub null_rate: f64,
}

impl ColumnRule {
    /// Rule with the given generator and no nulls.
    pub fn new(generator: GeneratorConfig) -> Self {
        Self {
            generator,
            null_rate: 0.0,
        }
    }

    /// Set the null probability.
    pub fn with_null_rate(mut self, null_rate: f64) -> Self {
        self.null_rate = null_rate;
        self
    }
}

fn default_length() -> usize {
    5
}

fn default_max_nesting_depth() -> usize {
    4
}

/// Defaults applied when a column uses the `random` generator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationDefaults {
    /// Length of random strings
    #[serde(default = "default_length")]
    pub string_length: usize,

    /// Length of random byte arrays
    #[serde(default = "default_length")]
    pub bytes_length: usize,

    /// Number of elements in random arrays
    #[serde(default = "default_length")]
    pub array_size: usize,

    /// Number of entries in random maps
    #[serde(default = "default_length")]
    pub map_size: usize,

    /// Deepest allowed array/map/row nesting
    #[serde(default = "default_max_nesting_depth")]
    pub max_nesting_depth: usize,
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            string_length: default_length(),
            bytes_length: default_length(),
            array_size: default_length(),
            map_size: default_length(),
            max_nesting_depth: default_max_nesting_depth(),
        }
    }
}

/// Reader pacing: at most `rows_per_interval` rows per `interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    /// Rows emitted per interval
    pub rows_per_interval: u64,
    /// Length of one interval
    pub interval: Duration,
}

/// A prepare-time rule violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleViolation {
    /// Rule identifier, e.g. `range-bounds`
    pub rule: &'static str,
    /// Human readable description
    pub message: String,
}

impl RuleViolation {
    pub fn new(rule: &'static str, message: impl Into<String>) -> Self {
        Self {
            rule,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for RuleViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.rule, self.message)
    }
}

impl std::error::Error for RuleViolation {}

/// Immutable generation configuration of one source instance.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    /// Per-column rules, keyed by column name
    pub columns: BTreeMap<String, ColumnRule>,

    /// Type defaults for random generation
    pub defaults: GenerationDefaults,

    /// Total rows across all splits when the source is bounded
    pub row_num: u64,

    /// Number of parallel splits
    pub split_num: u32,

    /// Base seed; split `i` uses `seed + i`
    pub seed: u64,

    /// Optional reader pacing
    pub rate: Option<RateLimit>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            columns: BTreeMap::new(),
            defaults: GenerationDefaults::default(),
            row_num: 5,
            split_num: 1,
            seed: 0,
            rate: None,
        }
    }
}

impl GenerationConfig {
    /// Create a config producing `row_num` rows over `split_num` splits.
    pub fn new(split_num: u32, row_num: u64) -> Self {
        Self {
            split_num,
            row_num,
            ..Self::default()
        }
    }

    /// Set the rule of a column.
    pub fn with_rule(mut self, column: impl Into<String>, rule: ColumnRule) -> Self {
        self.columns.insert(column.into(), rule);
        self
    }

    /// Set the base seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set reader pacing.
    pub fn with_rate(mut self, rate: RateLimit) -> Self {
        self.rate = Some(rate);
        self
    }

    /// Replace the random-generation defaults.
    pub fn with_defaults(mut self, defaults: GenerationDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Rule for a column, or the default rule when none is configured.
    pub fn rule(&self, column: &str) -> ColumnRule {
        self.columns.get(column).cloned().unwrap_or_default()
    }

    /// Seed of split `split_id`. A pure function of the id.
    pub fn split_seed(&self, split_id: u64) -> u64 {
        self.seed.wrapping_add(split_id)
    }

    /// Row limit of split `split_id` when bounded.
    ///
    /// Rows are spread evenly; the first `row_num % split_num` splits take one
    /// extra row so that the limits sum to `row_num`.
    pub fn split_row_limit(&self, split_id: u64) -> u64 {
        let splits = self.split_num.max(1) as u64;
        let base = self.row_num / splits;
        let remainder = self.row_num % splits;
        if split_id < remainder {
            base + 1
        } else {
            base
        }
    }

    /// Check every rule against the schema.
    pub fn validate(&self, schema: &Schema) -> Result<(), RuleViolation> {
        if self.split_num == 0 {
            return Err(RuleViolation::new(
                "split-num-positive",
                "split_num must be at least 1",
            ));
        }
        if let Some(rate) = &self.rate {
            if rate.rows_per_interval == 0 || rate.interval.is_zero() {
                return Err(RuleViolation::new(
                    "rate-positive",
                    "rate.rows_per_interval and rate.interval must be positive",
                ));
            }
        }
        for name in self.columns.keys() {
            if schema.get_column(name).is_none() {
                return Err(RuleViolation::new(
                    "unknown-column",
                    format!("rule configured for unknown column '{name}'"),
                ));
            }
        }
        for column in schema.columns() {
            let depth = column.column_type.depth();
            if depth > self.defaults.max_nesting_depth {
                return Err(RuleViolation::new(
                    "nesting-depth",
                    format!(
                        "column '{}' nests {depth} levels, limit is {}",
                        column.name, self.defaults.max_nesting_depth
                    ),
                ));
            }
            plan::check_map_keys(&column.name, &column.column_type)?;
            let rule = self.rule(&column.name);
            if !(0.0..=1.0).contains(&rule.null_rate) {
                return Err(RuleViolation::new(
                    "null-rate-range",
                    format!(
                        "column '{}' null_rate {} is outside [0, 1]",
                        column.name, rule.null_rate
                    ),
                ));
            }
            plan::compile(&column.name, &rule.generator, &column.column_type)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake_types::{ColumnDefinition, ColumnType};

    fn schema() -> Schema {
        Schema::new(vec![
            ColumnDefinition::new("id", ColumnType::Int),
            ColumnDefinition::new("name", ColumnType::String),
        ])
        .unwrap()
    }

    #[test]
    fn test_split_row_limits_sum_to_total() {
        let config = GenerationConfig::new(3, 10);
        let limits: Vec<u64> = (0..3).map(|i| config.split_row_limit(i)).collect();
        assert_eq!(limits, vec![4, 3, 3]);
        assert_eq!(limits.iter().sum::<u64>(), 10);

        let config = GenerationConfig::new(2, 10);
        assert_eq!(config.split_row_limit(0), 5);
        assert_eq!(config.split_row_limit(1), 5);
    }

    #[test]
    fn test_split_seed_is_function_of_id() {
        let config = GenerationConfig::new(2, 10);
        assert_eq!(config.split_seed(0), 0);
        assert_eq!(config.split_seed(1), 1);
        let config = config.with_seed(100);
        assert_eq!(config.split_seed(3), 103);
    }

    #[test]
    fn test_rule_yaml() {
        let yaml = r#"
generator:
  type: int_range
  min: 1
  max: 9
null_rate: 0.25
"#;
        let rule: ColumnRule = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(rule.generator, GeneratorConfig::IntRange { min: 1, max: 9 });
        assert_eq!(rule.null_rate, 0.25);

        let rule: ColumnRule = serde_yaml::from_str("null_rate: 0.5").unwrap();
        assert_eq!(rule.generator, GeneratorConfig::Random);
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(GenerationConfig::new(2, 10).validate(&schema()).is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_splits() {
        let err = GenerationConfig::new(0, 10).validate(&schema()).unwrap_err();
        assert_eq!(err.rule, "split-num-positive");
    }

    #[test]
    fn test_validate_rejects_bad_null_rate() {
        let config = GenerationConfig::new(1, 10)
            .with_rule("name", ColumnRule::default().with_null_rate(1.5));
        assert_eq!(config.validate(&schema()).unwrap_err().rule, "null-rate-range");
    }

    #[test]
    fn test_validate_rejects_contradictory_bounds() {
        let config = GenerationConfig::new(1, 10).with_rule(
            "id",
            ColumnRule::new(GeneratorConfig::IntRange { min: 10, max: 1 }),
        );
        assert_eq!(config.validate(&schema()).unwrap_err().rule, "range-bounds");
    }

    #[test]
    fn test_validate_rejects_unknown_column() {
        let config = GenerationConfig::new(1, 10)
            .with_rule("missing", ColumnRule::new(GeneratorConfig::Null));
        assert_eq!(config.validate(&schema()).unwrap_err().rule, "unknown-column");
    }

    #[test]
    fn test_validate_rejects_zero_rate() {
        let config = GenerationConfig::new(1, 10).with_rate(RateLimit {
            rows_per_interval: 0,
            interval: Duration::from_secs(1),
        });
        assert_eq!(config.validate(&schema()).unwrap_err().rule, "rate-positive");
    }

    #[test]
    fn test_validate_rejects_deep_nesting() {
        let mut ty = ColumnType::Int;
        for _ in 0..5 {
            ty = ColumnType::array(ty);
        }
        let schema = Schema::new(vec![ColumnDefinition::new("deep", ty)]).unwrap();
        let err = GenerationConfig::new(1, 1).validate(&schema).unwrap_err();
        assert_eq!(err.rule, "nesting-depth");
    }
}
