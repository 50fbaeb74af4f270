//! Per-column pseudorandom stream derivation.
//!
//! Every value is drawn from its own stream, seeded from the split seed, the
//! row index and a key path naming the value (column name, then element,
//! map entry or row field steps). Paths are hashed with a step tag and length
//! prefix, so distinct paths never collide by concatenation.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;
const GOLDEN_GAMMA: u64 = 0x9e3779b97f4a7c15;

const TAG_COLUMN: u8 = 1;
const TAG_ELEMENT: u8 = 2;
const TAG_MAP_KEY: u8 = 3;
const TAG_MAP_VALUE: u8 = 4;
const TAG_FIELD: u8 = 5;
const TAG_TABLE: u8 = 6;

/// Key path of one generated value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamPath {
    hash: u64,
}

impl StreamPath {
    /// Root path of a split seed.
    pub fn new(seed: u64) -> Self {
        Self {
            hash: FNV_OFFSET ^ seed,
        }
    }

    fn step(self, tag: u8, bytes: &[u8]) -> Self {
        let mut hash = self.hash;
        for byte in std::iter::once(tag)
            .chain((bytes.len() as u64).to_le_bytes())
            .chain(bytes.iter().copied())
        {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
        Self { hash }
    }

    /// Top-level column, keyed by name so projection keeps streams stable.
    pub fn column(self, name: &str) -> Self {
        self.step(TAG_COLUMN, name.as_bytes())
    }

    /// Array element `index`.
    pub fn element(self, index: usize) -> Self {
        self.step(TAG_ELEMENT, &(index as u64).to_le_bytes())
    }

    /// Key of map entry `index`.
    pub fn map_key(self, index: usize) -> Self {
        self.step(TAG_MAP_KEY, &(index as u64).to_le_bytes())
    }

    /// Value of map entry `index`.
    pub fn map_value(self, index: usize) -> Self {
        self.step(TAG_MAP_VALUE, &(index as u64).to_le_bytes())
    }

    /// Named field of a nested row.
    pub fn field(self, name: &str) -> Self {
        self.step(TAG_FIELD, name.as_bytes())
    }

    /// Stream of this path at `row_index`.
    pub fn rng(self, row_index: u64) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(splitmix64(
            self.hash ^ row_index.wrapping_mul(GOLDEN_GAMMA),
        ))
    }
}

/// Seed used for one of several fanned-out tables sharing a split.
pub fn table_seed(seed: u64, table: &str) -> u64 {
    splitmix64(StreamPath::new(seed).step(TAG_TABLE, table.as_bytes()).hash)
}

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(GOLDEN_GAMMA);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}
