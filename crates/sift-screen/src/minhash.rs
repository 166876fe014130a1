//! MinHash signatures and a banded LSH index for approximate title matching.
//!
//! Signatures use universal hashing `(a * h + b) mod p` over a Mersenne prime,
//! truncated to 32 bits. Permutation coefficients come from a fixed seed, so
//! two runs over the same input produce the same candidate sets.

use std::collections::{BTreeSet, HashMap};
use std::hash::{DefaultHasher, Hash, Hasher};

const MERSENNE_PRIME: u64 = (1 << 61) - 1;
const MAX_HASH: u64 = (1 << 32) - 1;
const DEFAULT_SEED: u64 = 1;
const INTEGRATION_STEPS: u32 = 100;

/// A MinHash signature: one minimum per permutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature(Vec<u64>);

impl Signature {
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Estimated Jaccard similarity: the share of permutations whose minima agree.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn jaccard(&self, other: &Self) -> f64 {
        if self.0.is_empty() || self.0.len() != other.0.len() {
            return 0.0;
        }
        let equal = self.0.iter().zip(&other.0).filter(|(a, b)| a == b).count();
        equal as f64 / self.0.len() as f64
    }

    fn band(&self, index: usize, rows: usize) -> &[u64] {
        &self.0[index * rows..(index + 1) * rows]
    }
}

/// Generates signatures for a fixed number of permutations.
#[derive(Debug, Clone)]
pub struct MinHasher {
    permutations: Vec<(u64, u64)>,
}

impl MinHasher {
    #[must_use]
    pub fn new(num_perm: usize) -> Self {
        Self::with_seed(num_perm, DEFAULT_SEED)
    }

    #[must_use]
    pub fn with_seed(num_perm: usize, seed: u64) -> Self {
        let mut state = seed;
        let permutations = (0..num_perm)
            .map(|_| {
                let a = splitmix64(&mut state) % (MERSENNE_PRIME - 1) + 1;
                let b = splitmix64(&mut state) % MERSENNE_PRIME;
                (a, b)
            })
            .collect();
        Self { permutations }
    }

    #[must_use]
    pub fn num_perm(&self) -> usize {
        self.permutations.len()
    }

    /// Signature over a set of shingles. Duplicated shingles do not change it.
    #[must_use]
    pub fn signature<S: AsRef<str>>(&self, shingles: &[S]) -> Signature {
        let mut mins = vec![MAX_HASH; self.permutations.len()];
        for shingle in shingles {
            let hv = u128::from(fnv1a32(shingle.as_ref().as_bytes()));
            for (slot, &(a, b)) in mins.iter_mut().zip(&self.permutations) {
                let permuted = (u128::from(a) * hv + u128::from(b)) % u128::from(MERSENNE_PRIME);
                // Truncation to 32 bits is the point of the mask.
                #[allow(clippy::cast_possible_truncation)]
                let permuted = (permuted as u64) & MAX_HASH;
                if permuted < *slot {
                    *slot = permuted;
                }
            }
        }
        Signature(mins)
    }
}

/// Band/row split of a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LshParams {
    pub bands: usize,
    pub rows: usize,
}

impl LshParams {
    /// The split that minimizes the equally weighted sum of false-positive and
    /// false-negative probability mass around `threshold`.
    #[must_use]
    pub fn optimal(threshold: f64, num_perm: usize) -> Self {
        let mut best = Self { bands: 1, rows: num_perm.max(1) };
        let mut best_error = f64::INFINITY;
        for bands in 1..=num_perm {
            for rows in 1..=num_perm / bands {
                let fp = false_positive_area(threshold, bands, rows);
                let fn_ = false_negative_area(threshold, bands, rows);
                let error = 0.5 * fp + 0.5 * fn_;
                if error < best_error {
                    best_error = error;
                    best = Self { bands, rows };
                }
            }
        }
        best
    }
}

/// Banded LSH index over signatures keyed by caller-supplied integers.
#[derive(Debug)]
pub struct LshIndex {
    params: LshParams,
    tables: Vec<HashMap<u64, Vec<usize>>>,
}

impl LshIndex {
    #[must_use]
    pub fn new(params: LshParams) -> Self {
        Self { params, tables: vec![HashMap::new(); params.bands] }
    }

    #[must_use]
    pub const fn params(&self) -> LshParams {
        self.params
    }

    pub fn insert(&mut self, key: usize, signature: &Signature) {
        let rows = self.params.rows;
        for (band, table) in self.tables.iter_mut().enumerate() {
            table.entry(band_hash(signature.band(band, rows))).or_default().push(key);
        }
    }

    /// Keys sharing at least one band with `signature`, ascending.
    #[must_use]
    pub fn query(&self, signature: &Signature) -> Vec<usize> {
        let rows = self.params.rows;
        let mut found = BTreeSet::new();
        for (band, table) in self.tables.iter().enumerate() {
            if let Some(keys) = table.get(&band_hash(signature.band(band, rows))) {
                found.extend(keys.iter().copied());
            }
        }
        found.into_iter().collect()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn fnv1a32(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 0x811C_9DC5;
    for byte in bytes {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

fn band_hash(rows: &[u64]) -> u64 {
    let mut hasher = DefaultHasher::new();
    rows.hash(&mut hasher);
    hasher.finish()
}

/// Probability that a pair with similarity `s` shares at least one band.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn collision_probability(s: f64, bands: usize, rows: usize) -> f64 {
    1.0 - (1.0 - s.powi(rows as i32)).powi(bands as i32)
}

fn integrate(f: impl Fn(f64) -> f64, from: f64, to: f64) -> f64 {
    let step = (to - from) / f64::from(INTEGRATION_STEPS);
    (0..INTEGRATION_STEPS)
        .map(|i| f((f64::from(i) + 0.5).mul_add(step, from)) * step)
        .sum()
}

fn false_positive_area(threshold: f64, bands: usize, rows: usize) -> f64 {
    integrate(|s| collision_probability(s, bands, rows), 0.0, threshold)
}

fn false_negative_area(threshold: f64, bands: usize, rows: usize) -> f64 {
    integrate(|s| 1.0 - collision_probability(s, bands, rows), threshold, 1.0)
}
