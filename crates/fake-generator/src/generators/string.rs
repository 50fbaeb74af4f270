//! Random string and byte generators.

use rand::distr::Alphanumeric;
use rand::Rng;

/// Generate an alphanumeric string of exactly `length` characters.
pub fn generate_string<R: Rng>(rng: &mut R, length: usize) -> String {
    (0..length)
        .map(|_| char::from(rng.sample(Alphanumeric)))
        .collect()
}

/// Generate `length` random bytes.
pub fn generate_bytes<R: Rng>(rng: &mut R, length: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; length];
    rng.fill(bytes.as_mut_slice());
    bytes
}

/// Pick a length uniformly in `[min, max]`.
pub fn pick_length<R: Rng>(rng: &mut R, min: usize, max: usize) -> usize {
    rng.random_range(min..=max)
}
