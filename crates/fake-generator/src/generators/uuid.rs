//! UUID value generator.

use rand::Rng;
use uuid::Uuid;

/// Generate a version 4 UUID from the provided stream.
pub fn generate_uuid<R: Rng>(rng: &mut R) -> Uuid {
    let mut bytes = [0u8; 16];
    rng.fill(&mut bytes);
    uuid::Builder::from_random_bytes(bytes).into_uuid()
}
