//! Numeric value generators.

use fake_types::{ColumnType, FakeValue};
use rand::Rng;

/// Narrow an i64 to the given integer column type.
///
/// Returns `None` when the value does not fit.
pub fn int_value(column_type: &ColumnType, value: i64) -> Option<FakeValue> {
    match column_type {
        ColumnType::TinyInt => i8::try_from(value).ok().map(FakeValue::TinyInt),
        ColumnType::SmallInt => i16::try_from(value).ok().map(FakeValue::SmallInt),
        ColumnType::Int => i32::try_from(value).ok().map(FakeValue::Int),
        ColumnType::BigInt => Some(FakeValue::BigInt(value)),
        _ => None,
    }
}

/// Generate a random integer in the given range (inclusive).
pub fn generate_int_range<R: Rng>(
    rng: &mut R,
    column_type: &ColumnType,
    min: i64,
    max: i64,
) -> Option<FakeValue> {
    int_value(column_type, rng.random_range(min..=max))
}

/// Generate a random non-negative integer of the given type.
pub fn generate_int<R: Rng>(rng: &mut R, column_type: &ColumnType) -> Option<FakeValue> {
    let (_, max) = column_type.integer_bounds()?;
    generate_int_range(rng, column_type, 0, max)
}

/// Uniform float in `[min, max]`, or `min` when the range is empty.
///
/// Interpolates instead of scaling `max - min`, which overflows to infinity
/// for bounds of opposite sign near `f64::MAX`.
fn uniform_f64<R: Rng>(rng: &mut R, min: f64, max: f64) -> f64 {
    let unit: f64 = rng.random();
    ((1.0 - unit) * min + unit * max).max(min).min(max)
}

/// Generate a random float or double in the given range.
pub fn generate_float_range<R: Rng>(
    rng: &mut R,
    column_type: &ColumnType,
    min: f64,
    max: f64,
) -> FakeValue {
    let value = uniform_f64(rng, min, max);
    match column_type {
        ColumnType::Float => FakeValue::Float(value as f32),
        _ => FakeValue::Double(value),
    }
}

/// Format a float as a decimal string with `scale` fractional digits.
pub fn format_decimal(value: f64, scale: u8) -> String {
    format!("{value:.prec$}", prec = scale as usize)
}

/// Generate a random decimal in the given range.
pub fn generate_decimal_range<R: Rng>(rng: &mut R, min: f64, max: f64, scale: u8) -> FakeValue {
    FakeValue::Decimal(format_decimal(uniform_f64(rng, min, max), scale))
}

/// Generate a random non-negative decimal that fits `precision` and `scale`.
pub fn generate_decimal<R: Rng>(rng: &mut R, precision: u8, scale: u8) -> FakeValue {
    let integer_digits = precision.saturating_sub(scale).min(18) as u32;
    let fraction_digits = scale.min(18) as u32;
    let integer: u64 = rng.random_range(0..10u64.pow(integer_digits));
    if fraction_digits == 0 {
        return FakeValue::Decimal(integer.to_string());
    }
    let fraction: u64 = rng.random_range(0..10u64.pow(fraction_digits));
    FakeValue::Decimal(format!(
        "{integer}.{fraction:0width$}",
        width = fraction_digits as usize
    ))
}
