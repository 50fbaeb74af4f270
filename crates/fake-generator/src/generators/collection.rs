//! Array sampling generator.

use fake_types::FakeValue;
use rand::Rng;

/// Generate an array by sampling from a pool of values (with repetition).
pub fn generate_sample_array<R: Rng>(
    rng: &mut R,
    pool: &[FakeValue],
    min_length: usize,
    max_length: usize,
) -> FakeValue {
    if pool.is_empty() || max_length == 0 {
        return FakeValue::Array(vec![]);
    }

    let length = rng.random_range(min_length..=max_length);

    let items = (0..length)
        .map(|_| pool[rng.random_range(0..pool.len())].clone())
        .collect();

    FakeValue::Array(items)
}

/// Pick one value uniformly from a non-empty pool.
pub fn choose<'a, R: Rng>(rng: &mut R, pool: &'a [FakeValue]) -> Option<&'a FakeValue> {
    if pool.is_empty() {
        return None;
    }
    pool.get(rng.random_range(0..pool.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn pool() -> Vec<FakeValue> {
        vec![
            FakeValue::String("a".into()),
            FakeValue::String("b".into()),
            FakeValue::String("c".into()),
        ]
    }

    #[test]
    fn test_generate_sample_array() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let pool = pool();

        for _ in 0..10 {
            let value = generate_sample_array(&mut rng, &pool, 1, 3);
            let arr = value.as_array().unwrap();
            assert!(!arr.is_empty());
            assert!(arr.len() <= 3);
            assert!(arr.iter().all(|v| pool.contains(v)));
        }
    }

    #[test]
    fn test_generate_sample_array_empty_pool() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let value = generate_sample_array(&mut rng, &[], 0, 3);
        assert_eq!(value, FakeValue::Array(vec![]));
    }

    #[test]
    fn test_choose() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let pool = pool();
        assert!(pool.contains(choose(&mut rng, &pool).unwrap()));
        assert!(choose(&mut rng, &[]).is_none());
    }
}
