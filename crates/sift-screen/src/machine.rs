//! Per-record dual-review state machine.
//!
//! ```text
//! Pending -> AwaitingPair -> Agreed ------------------------------> Final
//!                         \-> Disagreed -> AwaitingAdjudication -> Adjudicated -> Final
//! ```
//!
//! Reviewers A and B are consulted concurrently and independently. The
//! adjudicator is consulted only on disagreement, after both verdicts exist,
//! and sees both prior decisions. Every decision is appended to the store as
//! soon as it exists; the outcome is upserted last, so a persisted outcome
//! always has its supporting decisions.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sift_config::ScreeningConfig;
use sift_core::entities::{CandidateRecord, Decision, DualOutcome};
use sift_core::enums::{ExclusionReason, ReviewerRole, ScreeningState, Stage, Verdict};
use sift_core::errors::CoreError;
use sift_core::store::ScreeningStore;

use crate::error::{OracleError, ScreeningError};
use crate::limiter::RateLimiter;
use crate::oracle::{DecisionOracle, OracleReply, OracleRequest};

/// Result of evaluating one record at one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    /// An outcome already existed; nothing was called or written.
    Skipped(DualOutcome),
    Finalized(DualOutcome),
}

impl Evaluation {
    #[must_use]
    pub const fn outcome(&self) -> &DualOutcome {
        match self {
            Self::Skipped(o) | Self::Finalized(o) => o,
        }
    }
}

pub struct ScreeningMachine<O, S> {
    oracle: Arc<O>,
    store: Arc<S>,
    limiter: Arc<RateLimiter>,
    reviewer_tier: String,
    adjudicator_tier: String,
    timeout: Duration,
}

impl<O: DecisionOracle, S: ScreeningStore> ScreeningMachine<O, S> {
    /// # Errors
    ///
    /// Returns `ScreeningError::UnknownTier` if either configured tier has no
    /// budget in `limiter`.
    pub fn new(
        oracle: Arc<O>,
        store: Arc<S>,
        limiter: Arc<RateLimiter>,
        config: &ScreeningConfig,
    ) -> Result<Self, ScreeningError> {
        for tier in [&config.reviewer_tier, &config.adjudicator_tier] {
            if !limiter.has_tier(tier) {
                return Err(ScreeningError::UnknownTier(tier.clone()));
            }
        }
        Ok(Self {
            oracle,
            store,
            limiter,
            reviewer_tier: config.reviewer_tier.clone(),
            adjudicator_tier: config.adjudicator_tier.clone(),
            timeout: config.oracle_timeout(),
        })
    }

    #[must_use]
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    #[must_use]
    pub const fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Drive `record` through dual review at `stage`.
    ///
    /// Idempotent: a record that already has an outcome at `stage` is skipped
    /// without any oracle call.
    ///
    /// # Errors
    ///
    /// - `ScreeningError::Oracle` if an oracle call failed or timed out. Any
    ///   decisions obtained before the failure are already persisted.
    /// - `ScreeningError::Store` if the store failed.
    pub async fn evaluate(
        &self,
        record: &CandidateRecord,
        stage: Stage,
    ) -> Result<Evaluation, ScreeningError> {
        if let Some(existing) = self.store.get_outcome(&record.id, stage).await? {
            tracing::debug!(record = %record.id, %stage, "screening: outcome exists, skipping");
            return Ok(Evaluation::Skipped(existing));
        }

        let mut state = ScreeningState::Pending;
        let mut pair: Option<(Decision, Decision)> = None;
        let mut adjudication: Option<Decision> = None;

        loop {
            let next = match state {
                ScreeningState::Pending => ScreeningState::AwaitingPair,
                ScreeningState::AwaitingPair => {
                    let (a, b) = self.review_pair(record, stage).await?;
                    let agreed = a.verdict == b.verdict;
                    pair = Some((a, b));
                    if agreed {
                        ScreeningState::Agreed
                    } else {
                        ScreeningState::Disagreed
                    }
                }
                ScreeningState::Disagreed => ScreeningState::AwaitingAdjudication,
                ScreeningState::AwaitingAdjudication => {
                    let (a, b) = pair.as_ref().ok_or_else(|| missing(record, "reviewer pair"))?;
                    adjudication = Some(self.adjudicate(record, stage, a, b).await?);
                    ScreeningState::Adjudicated
                }
                ScreeningState::Agreed | ScreeningState::Adjudicated => ScreeningState::Final,
                ScreeningState::Final => break,
            };
            transition(record, stage, state, next)?;
            state = next;
        }

        let (a, b) = pair.ok_or_else(|| missing(record, "reviewer pair"))?;
        let outcome = build_outcome(record, stage, &a, &b, adjudication.as_ref());
        self.store.upsert_outcome(&outcome).await?;
        tracing::debug!(
            record = %record.id,
            %stage,
            verdict = %outcome.final_verdict,
            adjudicated = outcome.adjudicated,
            "screening: outcome finalized"
        );
        Ok(Evaluation::Finalized(outcome))
    }

    async fn review_pair(
        &self,
        record: &CandidateRecord,
        stage: Stage,
    ) -> Result<(Decision, Decision), ScreeningError> {
        let (a, b) = tokio::join!(
            self.consult(record, stage, ReviewerRole::ReviewerA, &[]),
            self.consult(record, stage, ReviewerRole::ReviewerB, &[]),
        );
        Ok((a?, b?))
    }

    async fn adjudicate(
        &self,
        record: &CandidateRecord,
        stage: Stage,
        a: &Decision,
        b: &Decision,
    ) -> Result<Decision, ScreeningError> {
        let prior = [a.clone(), b.clone()];
        self.consult(record, stage, ReviewerRole::Adjudicator, &prior).await
    }

    /// One rate-limited, timed oracle call. The resulting decision is
    /// persisted before it is returned.
    async fn consult(
        &self,
        record: &CandidateRecord,
        stage: Stage,
        role: ReviewerRole,
        prior: &[Decision],
    ) -> Result<Decision, ScreeningError> {
        let tier = if role.is_adjudicator() {
            self.adjudicator_tier.as_str()
        } else {
            self.reviewer_tier.as_str()
        };
        self.limiter.acquire(tier).await?;

        let request = OracleRequest { record, stage, role, prior, tier };
        let reply = match tokio::time::timeout(self.timeout, self.oracle.evaluate(&request)).await {
            Ok(reply) => reply,
            Err(_) => Err(OracleError::Timeout(self.timeout)),
        }
        .map_err(|source| ScreeningError::Oracle {
            record_id: record.id.clone(),
            stage,
            role,
            source,
        })?;

        let decision = match reply {
            OracleReply::Parsed(assessment) => assessment.into_decision(&record.id, stage, role),
            OracleReply::Unparseable { raw, reason } => {
                tracing::warn!(
                    record = %record.id,
                    %stage,
                    %role,
                    %reason,
                    raw_len = raw.len(),
                    "screening: unparseable oracle reply, recording uncertain"
                );
                Decision::parse_failure(&record.id, stage, role, &reason)
            }
        };
        self.store.append_decision(&decision).await?;
        Ok(decision)
    }
}

fn transition(
    record: &CandidateRecord,
    stage: Stage,
    from: ScreeningState,
    to: ScreeningState,
) -> Result<(), ScreeningError> {
    if !from.can_transition_to(to) {
        return Err(CoreError::InvalidTransition {
            entity_type: format!("screening[{stage}]"),
            id: record.id.clone(),
            from: from.to_string(),
            to: to.to_string(),
        }
        .into());
    }
    tracing::trace!(record = %record.id, %stage, %from, %to, "screening: transition");
    Ok(())
}

fn missing(record: &CandidateRecord, what: &str) -> ScreeningError {
    CoreError::Validation(format!("{} has no {what} at this point", record.id)).into()
}

/// Combine the reviewer pair and optional adjudication into an outcome.
///
/// The exclusion reason comes from the deciding decision: the adjudicator
/// when adjudicated, otherwise reviewer A, falling back to reviewer B. At a
/// stage that requires a reason, an exclusion without one gets
/// [`ExclusionReason::FULL_TEXT_DEFAULT`].
#[must_use]
pub fn build_outcome(
    record: &CandidateRecord,
    stage: Stage,
    a: &Decision,
    b: &Decision,
    adjudication: Option<&Decision>,
) -> DualOutcome {
    let agreement = a.verdict == b.verdict;
    let (final_verdict, reason) = match adjudication {
        Some(adj) => (adj.verdict, adj.exclusion_reason),
        None => (a.verdict, a.exclusion_reason.or(b.exclusion_reason)),
    };

    let exclusion_reason = match (final_verdict, reason) {
        (Verdict::Exclude, Some(reason)) => Some(reason),
        (Verdict::Exclude, None) if stage.requires_exclusion_reason() => {
            tracing::debug!(
                record = %record.id,
                %stage,
                "screening: exclusion without a reason, using default"
            );
            Some(ExclusionReason::FULL_TEXT_DEFAULT)
        }
        _ => None,
    };

    DualOutcome {
        record_id: record.id.clone(),
        stage,
        reviewer_a: a.verdict,
        reviewer_b: b.verdict,
        agreement,
        final_verdict,
        adjudicated: adjudication.is_some(),
        exclusion_reason,
        prefiltered: false,
        updated_at: Utc::now(),
    }
}
