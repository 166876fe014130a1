use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{ExclusionReason, Stage, Verdict};

/// Authoritative per-(record, stage) screening result.
///
/// Upserted exactly once the stage's required decisions exist. Its presence is
/// what makes re-running a batch safe.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct DualOutcome {
    pub record_id: String,
    pub stage: Stage,
    pub reviewer_a: Verdict,
    pub reviewer_b: Verdict,
    pub agreement: bool,
    pub final_verdict: Verdict,
    pub adjudicated: bool,
    /// Reason carried by the deciding decision, if the final verdict is an exclusion.
    pub exclusion_reason: Option<ExclusionReason>,
    /// Excluded by the relevance prefilter without dual review.
    #[serde(default)]
    pub prefiltered: bool,
    pub updated_at: DateTime<Utc>,
}

impl DualOutcome {
    #[must_use]
    pub fn is_excluded(&self) -> bool {
        self.final_verdict == Verdict::Exclude
    }

    #[must_use]
    pub fn is_included(&self) -> bool {
        self.final_verdict == Verdict::Include
    }
}
