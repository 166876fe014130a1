use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{DecisionKind, ExclusionReason, ReviewerRole, Stage, Verdict};

/// One evaluation of a record at a stage. Append-only audit ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Decision {
    pub record_id: String,
    pub stage: Stage,
    pub role: ReviewerRole,
    pub verdict: Verdict,
    /// Reviewer confidence in `[0, 1]`.
    pub confidence: f64,
    pub rationale: String,
    pub exclusion_reason: Option<ExclusionReason>,
    pub kind: DecisionKind,
    pub created_at: DateTime<Utc>,
}

impl Decision {
    /// Decision recorded when an oracle reply could not be parsed.
    #[must_use]
    pub fn parse_failure(record_id: &str, stage: Stage, role: ReviewerRole, reason: &str) -> Self {
        Self {
            record_id: record_id.to_string(),
            stage,
            role,
            verdict: Verdict::Uncertain,
            confidence: 0.0,
            rationale: format!("unparseable oracle reply: {reason}"),
            exclusion_reason: None,
            kind: DecisionKind::ParseFailure,
            created_at: Utc::now(),
        }
    }

    /// Decision recorded when an oracle call failed outright.
    #[must_use]
    pub fn call_failure(record_id: &str, stage: Stage, role: ReviewerRole, error: &str) -> Self {
        Self {
            record_id: record_id.to_string(),
            stage,
            role,
            verdict: Verdict::Uncertain,
            confidence: 0.0,
            rationale: format!("oracle call failed: {error}"),
            exclusion_reason: None,
            kind: DecisionKind::CallFailure,
            created_at: Utc::now(),
        }
    }

    /// Confidence clamped into `[0, 1]`; NaN becomes 0.
    #[must_use]
    pub fn clamp_confidence(value: f64) -> f64 {
        if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
    }
}
