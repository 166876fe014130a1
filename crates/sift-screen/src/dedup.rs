//! Two-stage record deduplication.
//!
//! 1. **Exact**: records sharing a normalized external identifier collapse to
//!    the first one seen.
//! 2. **Approximate**: surviving records whose normalized titles reach the
//!    similarity cutoff collapse to the earliest accepted record. Small
//!    corpora compare every pair; above `pairwise_threshold`, MinHash/LSH
//!    proposes candidates that are then confirmed with the same cutoff.
//!
//! Records without an identifier skip stage 1. Records whose title normalizes
//! to nothing skip stage 2 and are always kept.

use std::collections::HashMap;

use serde::Serialize;
use sift_config::DedupConfig;
use sift_core::entities::{CandidateRecord, DedupStats};

use crate::error::ScreeningError;
use crate::minhash::{LshIndex, LshParams, MinHasher};
use crate::similarity;
use crate::text::{normalize_identifier, normalize_title, shingles};

/// Which stage dropped a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStage {
    ExactIdentifier,
    NearTitle,
}

/// A dropped record and the accepted record it duplicated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateMatch {
    pub dropped_id: String,
    pub kept_id: String,
    pub stage: MatchStage,
    /// Title similarity for near-duplicates, `None` for identifier matches.
    pub similarity: Option<f64>,
}

/// Result of a deduplication run.
#[derive(Debug, Clone)]
pub struct DedupOutcome {
    /// Survivors in input order.
    pub unique: Vec<CandidateRecord>,
    pub duplicates: Vec<DuplicateMatch>,
    pub stats: DedupStats,
}

pub struct Deduplicator {
    config: DedupConfig,
    hasher: MinHasher,
}

impl Deduplicator {
    /// # Errors
    ///
    /// Returns `ScreeningError::Config` if `config` fails validation.
    pub fn new(config: DedupConfig) -> Result<Self, ScreeningError> {
        config.validate()?;
        let hasher = MinHasher::new(config.num_perm);
        Ok(Self { config, hasher })
    }

    #[must_use]
    pub const fn config(&self) -> &DedupConfig {
        &self.config
    }

    /// Deduplicate `records`, keeping the first-seen record of every group.
    #[must_use]
    pub fn deduplicate(&self, records: Vec<CandidateRecord>) -> DedupOutcome {
        let identified = records.len() as u64;
        let mut duplicates = Vec::new();

        let survivors = exact_stage(records, &mut duplicates);
        let exact_duplicates = duplicates.len() as u64;

        let unique = if survivors.len() > self.config.pairwise_threshold {
            tracing::debug!(
                records = survivors.len(),
                threshold = self.config.pairwise_threshold,
                "dedup: using MinHash/LSH candidate generation"
            );
            self.approximate_lsh(survivors, &mut duplicates)
        } else {
            self.approximate_pairwise(survivors, &mut duplicates)
        };

        let stats = DedupStats {
            identified,
            exact_duplicates,
            near_duplicates: duplicates.len() as u64 - exact_duplicates,
        };
        tracing::info!(
            identified = stats.identified,
            exact = stats.exact_duplicates,
            near = stats.near_duplicates,
            unique = unique.len(),
            "dedup: complete"
        );

        DedupOutcome { unique, duplicates, stats }
    }

    fn approximate_pairwise(
        &self,
        records: Vec<CandidateRecord>,
        duplicates: &mut Vec<DuplicateMatch>,
    ) -> Vec<CandidateRecord> {
        let cutoff = f64::from(self.config.similarity_cutoff);
        let mut accepted: Vec<(CandidateRecord, String)> = Vec::with_capacity(records.len());

        for record in records {
            let title = normalize_title(&record.title);
            if !title.is_empty() {
                let hit = accepted
                    .iter()
                    .filter(|(_, kept_title)| !kept_title.is_empty())
                    .map(|(kept, kept_title)| (kept, similarity::ratio(&title, kept_title)))
                    .find(|(_, score)| *score >= cutoff);
                if let Some((kept, score)) = hit {
                    duplicates.push(near_match(&record, kept, score));
                    continue;
                }
            }
            accepted.push((record, title));
        }

        accepted.into_iter().map(|(record, _)| record).collect()
    }

    fn approximate_lsh(
        &self,
        records: Vec<CandidateRecord>,
        duplicates: &mut Vec<DuplicateMatch>,
    ) -> Vec<CandidateRecord> {
        let cutoff = f64::from(self.config.similarity_cutoff);
        let params = LshParams::optimal(self.config.jaccard_threshold, self.config.num_perm);
        let mut index = LshIndex::new(params);
        let mut accepted: Vec<(CandidateRecord, String)> = Vec::with_capacity(records.len());

        for record in records {
            let title = normalize_title(&record.title);
            if title.is_empty() {
                accepted.push((record, title));
                continue;
            }

            let signature = self.hasher.signature(&shingles(&title, self.config.shingle_size));
            let hit = index
                .query(&signature)
                .into_iter()
                .map(|key| (key, similarity::ratio(&title, &accepted[key].1)))
                .find(|(_, score)| *score >= cutoff);

            if let Some((key, score)) = hit {
                duplicates.push(near_match(&record, &accepted[key].0, score));
            } else {
                index.insert(accepted.len(), &signature);
                accepted.push((record, title));
            }
        }

        accepted.into_iter().map(|(record, _)| record).collect()
    }
}

fn exact_stage(
    records: Vec<CandidateRecord>,
    duplicates: &mut Vec<DuplicateMatch>,
) -> Vec<CandidateRecord> {
    let mut seen: HashMap<String, String> = HashMap::new();
    let mut survivors = Vec::with_capacity(records.len());

    for record in records {
        let key = record.external_id.as_deref().and_then(normalize_identifier);
        match key {
            Some(key) => {
                if let Some(kept_id) = seen.get(&key) {
                    duplicates.push(DuplicateMatch {
                        dropped_id: record.id.clone(),
                        kept_id: kept_id.clone(),
                        stage: MatchStage::ExactIdentifier,
                        similarity: None,
                    });
                } else {
                    seen.insert(key, record.id.clone());
                    survivors.push(record);
                }
            }
            None => survivors.push(record),
        }
    }

    survivors
}

fn near_match(dropped: &CandidateRecord, kept: &CandidateRecord, score: f64) -> DuplicateMatch {
    DuplicateMatch {
        dropped_id: dropped.id.clone(),
        kept_id: kept.id.clone(),
        stage: MatchStage::NearTitle,
        similarity: Some(score),
    }
}
