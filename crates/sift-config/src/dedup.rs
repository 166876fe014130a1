//! Deduplication thresholds.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

const fn default_pairwise_threshold() -> usize {
    500
}

const fn default_similarity_cutoff() -> u8 {
    90
}

const fn default_jaccard_threshold() -> f64 {
    0.65
}

const fn default_num_perm() -> usize {
    128
}

const fn default_shingle_size() -> usize {
    3
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DedupConfig {
    /// Corpora at or below this size are compared pairwise; larger ones use min-hash LSH.
    #[serde(default = "default_pairwise_threshold")]
    pub pairwise_threshold: usize,

    /// Title similarity ratio (0-100) at or above which two records are duplicates.
    #[serde(default = "default_similarity_cutoff")]
    pub similarity_cutoff: u8,

    /// Jaccard threshold used to tune the LSH band layout.
    #[serde(default = "default_jaccard_threshold")]
    pub jaccard_threshold: f64,

    /// Number of min-hash permutations per signature.
    #[serde(default = "default_num_perm")]
    pub num_perm: usize,

    /// Tokens per title shingle.
    #[serde(default = "default_shingle_size")]
    pub shingle_size: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            pairwise_threshold: default_pairwise_threshold(),
            similarity_cutoff: default_similarity_cutoff(),
            jaccard_threshold: default_jaccard_threshold(),
            num_perm: default_num_perm(),
            shingle_size: default_shingle_size(),
        }
    }
}

impl DedupConfig {
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for out-of-range thresholds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.similarity_cutoff > 100 {
            return Err(ConfigError::invalid(
                "dedup.similarity_cutoff",
                format!("{} is outside 0..=100", self.similarity_cutoff),
            ));
        }
        if !(self.jaccard_threshold > 0.0 && self.jaccard_threshold <= 1.0) {
            return Err(ConfigError::invalid(
                "dedup.jaccard_threshold",
                format!("{} is outside (0, 1]", self.jaccard_threshold),
            ));
        }
        if self.num_perm < 2 {
            return Err(ConfigError::invalid("dedup.num_perm", "needs at least 2 permutations"));
        }
        if self.shingle_size == 0 {
            return Err(ConfigError::invalid("dedup.shingle_size", "must be at least 1"));
        }
        Ok(())
    }
}
