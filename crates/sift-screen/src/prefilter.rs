//! Relevance prefilter applied before dual review.
//!
//! Records excluded here are recorded with a machine-readable reason code and
//! never reach the oracle. Policies:
//!
//! - `hard_gate`: exclude records matching fewer than `min_matches` terms.
//! - `ranked`: score every record with BM25 against the terms and forward only
//!   the top `top_n`.
//! - `disabled`: forward everything.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sift_config::PrefilterConfig;
use sift_core::entities::{CandidateRecord, Decision, DualOutcome};
use sift_core::enums::{
    DecisionKind, ExclusionReason, PrefilterPolicy, ReviewerRole, Stage, Verdict,
};
use sift_core::errors::StoreError;
use sift_core::store::ScreeningStore;

use crate::error::ScreeningError;
use crate::text::tokenize;

const BM25_K1: f64 = 1.5;
const BM25_B: f64 = 0.75;

/// Why one record was held back.
#[derive(Debug, Clone, PartialEq)]
pub struct PrefilterExclusion {
    pub reason: ExclusionReason,
    /// Term-match count (hard gate) or BM25 score (ranked).
    pub score: f64,
    pub detail: String,
}

#[derive(Debug, Clone, Default)]
pub struct PrefilterOutcome {
    /// Records passed on to dual review, in input order.
    pub forwarded: Vec<CandidateRecord>,
    pub excluded: Vec<(CandidateRecord, PrefilterExclusion)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Prefilter {
    Disabled,
    HardGate { terms: Vec<Vec<String>>, min_matches: usize },
    Ranked { terms: Vec<Vec<String>>, top_n: usize },
}

impl Prefilter {
    /// Build a prefilter from config.
    ///
    /// # Errors
    ///
    /// Returns `ScreeningError::Config` for an unknown policy or a ranked
    /// policy without terms.
    pub fn from_config(config: &PrefilterConfig) -> Result<Self, ScreeningError> {
        config.validate()?;
        let terms: Vec<Vec<String>> = config
            .terms
            .iter()
            .map(|t| tokenize(t))
            .filter(|t| !t.is_empty())
            .collect();
        Ok(match config.policy()? {
            PrefilterPolicy::Disabled => Self::Disabled,
            PrefilterPolicy::HardGate => Self::HardGate { terms, min_matches: config.min_matches },
            PrefilterPolicy::Ranked => Self::Ranked { terms, top_n: config.top_n },
        })
    }

    #[must_use]
    pub const fn policy(&self) -> PrefilterPolicy {
        match self {
            Self::Disabled => PrefilterPolicy::Disabled,
            Self::HardGate { .. } => PrefilterPolicy::HardGate,
            Self::Ranked { .. } => PrefilterPolicy::Ranked,
        }
    }

    /// Split `records` into forwarded and excluded sets.
    #[must_use]
    pub fn partition(&self, records: Vec<CandidateRecord>) -> PrefilterOutcome {
        let outcome = match self {
            Self::Disabled => PrefilterOutcome { forwarded: records, excluded: Vec::new() },
            Self::HardGate { terms, min_matches } => hard_gate(records, terms, *min_matches),
            Self::Ranked { terms, top_n } => ranked(records, terms, *top_n),
        };
        tracing::info!(
            policy = %self.policy(),
            forwarded = outcome.forwarded.len(),
            excluded = outcome.excluded.len(),
            "prefilter: partitioned records"
        );
        outcome
    }
}

/// Number of distinct terms occurring in `tokens` as contiguous token runs.
#[must_use]
pub fn keyword_matches(tokens: &[String], terms: &[Vec<String>]) -> usize {
    terms
        .iter()
        .filter(|term| tokens.windows(term.len()).any(|w| w == term.as_slice()))
        .count()
}

fn hard_gate(
    records: Vec<CandidateRecord>,
    terms: &[Vec<String>],
    min_matches: usize,
) -> PrefilterOutcome {
    let mut outcome = PrefilterOutcome::default();
    for record in records {
        let matches = keyword_matches(&tokenize(&record.screening_text()), terms);
        if matches >= min_matches {
            outcome.forwarded.push(record);
        } else {
            #[allow(clippy::cast_precision_loss)]
            let score = matches as f64;
            outcome.excluded.push((
                record,
                PrefilterExclusion {
                    reason: ExclusionReason::BelowKeywordThreshold,
                    score,
                    detail: format!("matched {matches} of {min_matches} required terms"),
                },
            ));
        }
    }
    outcome
}

fn ranked(records: Vec<CandidateRecord>, terms: &[Vec<String>], top_n: usize) -> PrefilterOutcome {
    let documents: Vec<Vec<String>> =
        records.iter().map(|r| tokenize(&r.screening_text())).collect();
    let query: Vec<String> = terms
        .iter()
        .flatten()
        .cloned()
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let scores = bm25_scores(&documents, &query);

    let mut order: Vec<usize> = (0..records.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));
    let mut rank = vec![0usize; records.len()];
    for (position, &index) in order.iter().enumerate() {
        rank[index] = position + 1;
    }

    let mut outcome = PrefilterOutcome::default();
    for (index, record) in records.into_iter().enumerate() {
        if rank[index] <= top_n {
            outcome.forwarded.push(record);
        } else {
            outcome.excluded.push((
                record,
                PrefilterExclusion {
                    reason: ExclusionReason::BelowRelevanceRank,
                    score: scores[index],
                    detail: format!("ranked {} of {}, cutoff {top_n}", rank[index], rank.len()),
                },
            ));
        }
    }
    outcome
}

/// BM25 score of every document against `query`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn bm25_scores(documents: &[Vec<String>], query: &[String]) -> Vec<f64> {
    if documents.is_empty() {
        return Vec::new();
    }
    let total_docs = documents.len() as f64;
    let avg_len = documents.iter().map(Vec::len).sum::<usize>() as f64 / total_docs;

    let mut doc_freq: HashMap<&str, usize> = HashMap::new();
    for document in documents {
        let unique: HashSet<&str> = document.iter().map(String::as_str).collect();
        for term in unique {
            *doc_freq.entry(term).or_default() += 1;
        }
    }

    documents
        .iter()
        .map(|document| {
            let len = document.len() as f64;
            let norm = if avg_len > 0.0 { len / avg_len } else { 0.0 };
            query
                .iter()
                .map(|term| {
                    let tf = document.iter().filter(|t| *t == term).count() as f64;
                    if tf == 0.0 {
                        return 0.0;
                    }
                    let df = doc_freq.get(term.as_str()).copied().unwrap_or(0) as f64;
                    let idf = ((total_docs - df + 0.5) / (df + 0.5)).ln_1p();
                    idf * (tf * (BM25_K1 + 1.0)) / (tf + BM25_K1 * (1.0 - BM25_B + BM25_B * norm))
                })
                .sum()
        })
        .collect()
}

/// Persist prefilter exclusions so they appear in the ledger and the flow.
///
/// Each excluded record gets one `prefilter` decision and a `prefiltered`
/// outcome. Records that already have an outcome at `stage` are left alone.
/// Returns the number of records newly recorded.
///
/// # Errors
///
/// Returns `StoreError` if the store rejects a read or write.
pub async fn persist_prefilter_exclusions<S: ScreeningStore>(
    store: &S,
    stage: Stage,
    excluded: &[(CandidateRecord, PrefilterExclusion)],
) -> Result<usize, StoreError> {
    let mut written = 0;
    for (record, exclusion) in excluded {
        if store.get_outcome(&record.id, stage).await?.is_some() {
            continue;
        }
        let now = Utc::now();
        let decision = Decision {
            record_id: record.id.clone(),
            stage,
            role: ReviewerRole::ReviewerA,
            verdict: Verdict::Exclude,
            confidence: 1.0,
            rationale: exclusion.detail.clone(),
            exclusion_reason: Some(exclusion.reason),
            kind: DecisionKind::Prefilter,
            created_at: now,
        };
        store.append_decision(&decision).await?;
        store
            .upsert_outcome(&DualOutcome {
                record_id: record.id.clone(),
                stage,
                reviewer_a: Verdict::Exclude,
                reviewer_b: Verdict::Exclude,
                agreement: true,
                final_verdict: Verdict::Exclude,
                adjudicated: false,
                exclusion_reason: Some(exclusion.reason),
                prefiltered: true,
                updated_at: now,
            })
            .await?;
        written += 1;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config(policy: &str, terms: &[&str]) -> PrefilterConfig {
        PrefilterConfig {
            policy: policy.to_string(),
            terms: terms.iter().map(ToString::to_string).collect(),
            ..PrefilterConfig::default()
        }
    }

    fn corpus() -> Vec<CandidateRecord> {
        vec![
            CandidateRecord::new("r1", "Intelligent tutoring systems in primary school")
                .with_abstract("A randomized trial of tutoring with machine learning."),
            CandidateRecord::new("r2", "Soil microbial diversity in arid farmland"),
            CandidateRecord::new("r3", "Machine learning for crop yield"),
            CandidateRecord::new("r4", "Peer tutoring outcomes"),
        ]
    }

    fn ids(records: &[CandidateRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn multi_word_terms_match_contiguously() {
        let tokens = tokenize("Advances in machine learning");
        let terms = vec![tokenize("machine learning"), tokenize("learning machine")];
        assert_eq!(keyword_matches(&tokens, &terms), 1);
    }

    #[test]
    fn hard_gate_excludes_below_threshold() {
        let mut cfg = config("hard_gate", &["tutoring", "machine learning"]);
        cfg.min_matches = 2;
        let outcome = Prefilter::from_config(&cfg).unwrap().partition(corpus());

        assert_eq!(ids(&outcome.forwarded), vec!["r1"]);
        assert_eq!(outcome.excluded.len(), 3);
        assert!(outcome
            .excluded
            .iter()
            .all(|(_, e)| e.reason == ExclusionReason::BelowKeywordThreshold));
    }

    #[test]
    fn hard_gate_with_zero_threshold_forwards_all() {
        let outcome = Prefilter::from_config(&config("hard_gate", &[]))
            .unwrap()
            .partition(corpus());
        assert_eq!(outcome.forwarded.len(), 4);
    }

    #[test]
    fn ranked_keeps_top_n_in_input_order() {
        let mut cfg = config("ranked", &["tutoring"]);
        cfg.top_n = 2;
        let outcome = Prefilter::from_config(&cfg).unwrap().partition(corpus());

        assert_eq!(ids(&outcome.forwarded), vec!["r1", "r4"]);
        assert_eq!(outcome.excluded.len(), 2);
        assert!(outcome
            .excluded
            .iter()
            .all(|(_, e)| e.reason == ExclusionReason::BelowRelevanceRank));
    }

    #[test]
    fn disabled_forwards_everything() {
        let outcome = Prefilter::from_config(&config("disabled", &[])).unwrap().partition(corpus());
        assert_eq!(outcome.forwarded.len(), 4);
        assert!(outcome.excluded.is_empty());
    }

    #[test]
    fn unknown_policy_is_a_config_error() {
        let err = Prefilter::from_config(&config("sometimes", &[])).unwrap_err();
        assert!(matches!(err, ScreeningError::Config(_)));
    }

    #[test]
    fn bm25_prefers_term_dense_documents() {
        let docs = vec![
            tokenize("tutoring tutoring outcomes"),
            tokenize("crop yields"),
            tokenize("tutoring"),
        ];
        let scores = bm25_scores(&docs, &["tutoring".to_string()]);
        assert!(scores[0] > 0.0);
        assert!(scores[1].abs() < f64::EPSILON);
        assert!(scores[2] > 0.0);
    }
}
