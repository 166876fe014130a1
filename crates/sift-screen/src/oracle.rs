//! Decision-oracle contract and reply parsing.
//!
//! An oracle is whatever answers "include, exclude, or unsure?" for a record
//! at a stage: a hosted model, a human queue, or a scripted stub in tests. It
//! returns either a parsed [`Assessment`] or raw text that could not be
//! parsed. Unparseable replies are data, not errors; only a missing reply is
//! an [`OracleError`].

use std::future::Future;

use chrono::Utc;
use serde::Deserialize;
use sift_core::entities::{CandidateRecord, Decision};
use sift_core::enums::{DecisionKind, ExclusionReason, ReviewerRole, Stage, Verdict};

use crate::error::OracleError;

/// Confidence assumed when a reply omits it.
const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Everything an oracle sees for one call.
#[derive(Debug, Clone, Copy)]
pub struct OracleRequest<'a> {
    pub record: &'a CandidateRecord,
    pub stage: Stage,
    pub role: ReviewerRole,
    /// Prior decisions on this record and stage. Populated for the adjudicator.
    pub prior: &'a [Decision],
    /// Rate-limit tier the call was admitted under.
    pub tier: &'a str,
}

/// A parsed oracle verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub verdict: Verdict,
    pub confidence: f64,
    pub rationale: String,
    pub exclusion_reason: Option<ExclusionReason>,
}

impl Assessment {
    #[must_use]
    pub fn new(verdict: Verdict, confidence: f64, rationale: impl Into<String>) -> Self {
        Self {
            verdict,
            confidence: Decision::clamp_confidence(confidence),
            rationale: rationale.into(),
            exclusion_reason: None,
        }
    }

    #[must_use]
    pub const fn with_reason(mut self, reason: ExclusionReason) -> Self {
        self.exclusion_reason = Some(reason);
        self
    }

    /// Ledger entry for this assessment. Reasons on non-exclusions are dropped.
    #[must_use]
    pub fn into_decision(self, record_id: &str, stage: Stage, role: ReviewerRole) -> Decision {
        let exclusion_reason = if self.verdict == Verdict::Exclude {
            self.exclusion_reason
        } else {
            None
        };
        Decision {
            record_id: record_id.to_string(),
            stage,
            role,
            verdict: self.verdict,
            confidence: Decision::clamp_confidence(self.confidence),
            rationale: self.rationale,
            exclusion_reason,
            kind: DecisionKind::Oracle,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OracleReply {
    Parsed(Assessment),
    Unparseable { raw: String, reason: String },
}

pub trait DecisionOracle: Send + Sync {
    /// Evaluate one record. Must not panic on malformed backend output; return
    /// [`OracleReply::Unparseable`] instead.
    fn evaluate(
        &self,
        request: &OracleRequest<'_>,
    ) -> impl Future<Output = Result<OracleReply, OracleError>> + Send;
}

// ---------------------------------------------------------------------------
// Reply parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct WireAssessment {
    #[serde(alias = "decision")]
    verdict: String,
    confidence: Option<f64>,
    #[serde(default, alias = "reasoning")]
    rationale: String,
    #[serde(default)]
    exclusion_reason: Option<String>,
}

/// Parse a free-text oracle reply.
///
/// Accepts a bare JSON object, a fenced code block, or an object embedded in
/// surrounding prose. Verdict and reason names are matched case-insensitively;
/// an unrecognized exclusion reason, or a code reserved for the prefilter, is
/// recorded as `other`.
#[must_use]
pub fn parse_reply(raw: &str) -> OracleReply {
    let unparseable = |reason: String| OracleReply::Unparseable {
        raw: raw.to_string(),
        reason,
    };

    let Some(json) = extract_json_object(raw) else {
        return unparseable("no JSON object found".to_string());
    };
    let wire: WireAssessment = match serde_json::from_str(json) {
        Ok(wire) => wire,
        Err(e) => return unparseable(format!("invalid JSON: {e}")),
    };
    let Some(verdict) = parse_verdict(&wire.verdict) else {
        return unparseable(format!("unknown verdict '{}'", wire.verdict));
    };

    let exclusion_reason = wire
        .exclusion_reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(|r| {
            parse_exclusion_reason(r).unwrap_or_else(|| {
                tracing::debug!(
                    reason = r,
                    "oracle: unrecognized exclusion reason, recording as other",
                );
                ExclusionReason::Other
            })
        });

    OracleReply::Parsed(Assessment {
        verdict,
        confidence: Decision::clamp_confidence(wire.confidence.unwrap_or(DEFAULT_CONFIDENCE)),
        rationale: wire.rationale,
        exclusion_reason,
    })
}

fn extract_json_object(raw: &str) -> Option<&str> {
    let body = match raw.find("```") {
        Some(open) => {
            let after = &raw[open + 3..];
            let after = after.find('\n').map_or(after, |nl| &after[nl + 1..]);
            after.find("```").map_or(after, |close| &after[..close])
        }
        None => raw,
    };
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    (start < end).then(|| &body[start..=end])
}

fn parse_verdict(s: &str) -> Option<Verdict> {
    match s.trim().to_lowercase().as_str() {
        "include" | "included" => Some(Verdict::Include),
        "exclude" | "excluded" => Some(Verdict::Exclude),
        "uncertain" | "unsure" | "maybe" => Some(Verdict::Uncertain),
        _ => None,
    }
}

fn parse_exclusion_reason(s: &str) -> Option<ExclusionReason> {
    let key = s.trim().to_lowercase().replace([' ', '-'], "_");
    ExclusionReason::ALL
        .iter()
        .copied()
        .find(|r| !r.is_prefilter_code() && r.as_str() == key)
}
