//! Pattern-based string generator.
//!
//! Supports placeholders:
//! - `{index}` - split-local row index
//! - `{seed}` - split seed
//! - `{uuid}` - UUID drawn from the column stream
//! - `{rand:N}` - random N-digit number

use super::uuid::generate_uuid;
use fake_types::FakeValue;
use rand::Rng;

/// Generate a string based on a pattern with placeholders.
pub fn generate_pattern<R: Rng>(pattern: &str, rng: &mut R, seed: u64, index: u64) -> FakeValue {
    let mut result = pattern
        .replace("{index}", &index.to_string())
        .replace("{seed}", &seed.to_string());

    while result.contains("{uuid}") {
        let uuid = generate_uuid(rng).to_string();
        result = result.replacen("{uuid}", &uuid, 1);
    }

    // Replace {rand:N} patterns
    let mut search_from = 0;
    while let Some(found) = result[search_from..].find("{rand:") {
        let start = search_from + found;
        let Some(close) = result[start..].find('}') else {
            break;
        };
        let end = start + close;
        match result[start + 6..end].parse::<usize>() {
            Ok(digits) => {
                let random_num = generate_random_digits(rng, digits);
                result = format!("{}{}{}", &result[..start], random_num, &result[end + 1..]);
                search_from = start + random_num.len();
            }
            // Invalid format, leave it in place
            Err(_) => search_from = end + 1,
        }
    }

    FakeValue::String(result)
}

/// Generate a random number with exactly N digits.
fn generate_random_digits<R: Rng>(rng: &mut R, digits: usize) -> String {
    if digits == 0 {
        return String::new();
    }

    let mut result = String::with_capacity(digits);

    // First digit should be 1-9 to avoid leading zeros
    result.push(char::from(b'0' + rng.random_range(1..10u8)));

    for _ in 1..digits {
        result.push(char::from(b'0' + rng.random_range(0..10u8)));
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_generate_pattern_index() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let value = generate_pattern("user_{index}@example.com", &mut rng, 0, 123);

        assert_eq!(value, FakeValue::String("user_123@example.com".to_string()));
    }

    #[test]
    fn test_generate_pattern_seed() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let value = generate_pattern("s{seed}-{index}", &mut rng, 7, 1);
        assert_eq!(value, FakeValue::String("s7-1".to_string()));
    }

    #[test]
    fn test_generate_pattern_uuid_is_deterministic() {
        let mut rng1 = ChaCha8Rng::seed_from_u64(42);
        let mut rng2 = ChaCha8Rng::seed_from_u64(42);
        let value1 = generate_pattern("id-{uuid}", &mut rng1, 0, 0);
        let value2 = generate_pattern("id-{uuid}", &mut rng2, 0, 0);

        assert_eq!(value1, value2);
        let s = value1.as_str().unwrap();
        assert!(s.starts_with("id-"));
        assert_eq!(s.len(), 3 + 36);
    }

    #[test]
    fn test_generate_pattern_random_digits() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let value = generate_pattern("code-{rand:6}", &mut rng, 0, 0);

        let s = value.as_str().unwrap();
        assert!(s.starts_with("code-"));
        assert_eq!(s.len(), 5 + 6);
        assert!(s[5..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_generate_pattern_invalid_placeholder_kept() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let value = generate_pattern("{rand:x}-{rand:2}", &mut rng, 0, 0);
        let s = value.as_str().unwrap();
        assert!(s.starts_with("{rand:x}-"));
        assert_eq!(s.len(), "{rand:x}-".len() + 2);
    }
}
