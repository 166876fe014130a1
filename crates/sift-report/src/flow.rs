//! Identification-to-inclusion flow counts and their validation.
//!
//! Counts are rebuilt from dedup statistics and outcome rows every time; they
//! are never stored or edited. The expected identities are:
//!
//! ```text
//! identified - duplicates             = screened
//! screened   - excluded_at_screen     = sought
//! sought     - not_retrieved          = assessed
//! assessed   - sum(excluded_with_reasons) = included
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sift_core::entities::{DedupStats, DualOutcome};
use sift_core::enums::{ExclusionReason, Stage, Verdict};
use sift_core::store::ScreeningStore;

use crate::error::ReportError;

/// Inputs that do not come from outcome rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowInputs {
    pub dedup: DedupStats,
    /// Reports sought but not retrieved for full-text assessment.
    pub not_retrieved: u64,
    /// Included studies that also entered quantitative synthesis.
    pub quantitative: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowCounts {
    pub identified: u64,
    pub duplicates: u64,
    pub screened: u64,
    pub excluded_at_screen: u64,
    /// Part of `excluded_at_screen` removed by the prefilter.
    pub prefiltered: u64,
    pub sought: u64,
    pub not_retrieved: u64,
    pub assessed: u64,
    pub excluded_with_reasons: BTreeMap<ExclusionReason, u64>,
    pub included_qualitative: u64,
    pub included_quantitative: u64,
    /// Full-text outcomes that ended uncertain.
    pub unresolved: u64,
    pub arithmetic_valid: bool,
}

impl FlowCounts {
    #[must_use]
    pub const fn included(&self) -> u64 {
        self.included_qualitative + self.included_quantitative
    }

    #[must_use]
    pub fn excluded_at_assessment(&self) -> u64 {
        self.excluded_with_reasons.values().sum()
    }

    /// Identity checks as `(rule, expected, actual)`; a rule holds when both agree.
    fn identities(&self) -> [(FlowRule, Option<u64>, u64); 4] {
        [
            (
                FlowRule::ScreenedIdentity,
                self.identified.checked_sub(self.duplicates),
                self.screened,
            ),
            (
                FlowRule::SoughtIdentity,
                self.screened.checked_sub(self.excluded_at_screen),
                self.sought,
            ),
            (
                FlowRule::AssessedIdentity,
                self.sought.checked_sub(self.not_retrieved),
                self.assessed,
            ),
            (
                FlowRule::IncludedIdentity,
                self.assessed.checked_sub(self.excluded_at_assessment()),
                self.included(),
            ),
        ]
    }

    fn identities_hold(&self) -> bool {
        self.identities().iter().all(|(_, expected, actual)| *expected == Some(*actual))
    }
}

/// Build flow counts from dedup statistics and the outcomes of both stages.
///
/// `sought` is derived from the screening identity; `assessed` counts
/// full-text outcomes. A full-text exclusion without a reason is counted
/// under [`ExclusionReason::FULL_TEXT_DEFAULT`].
#[must_use]
pub fn aggregate(
    inputs: &FlowInputs,
    title_abstract: &[DualOutcome],
    full_text: &[DualOutcome],
) -> FlowCounts {
    let identified = inputs.dedup.identified;
    let duplicates = inputs.dedup.duplicates();
    let screened = identified.saturating_sub(duplicates);

    let screen_exclusions = title_abstract
        .iter()
        .filter(|o| o.stage == Stage::TitleAbstract && o.final_verdict == Verdict::Exclude);
    let mut excluded_at_screen = 0;
    let mut prefiltered = 0;
    for outcome in screen_exclusions {
        excluded_at_screen += 1;
        if outcome.prefiltered {
            prefiltered += 1;
        }
    }
    let sought = screened.saturating_sub(excluded_at_screen);

    let mut assessed = 0;
    let mut included = 0;
    let mut unresolved = 0;
    let mut excluded_with_reasons = BTreeMap::new();
    for outcome in full_text.iter().filter(|o| o.stage == Stage::FullText) {
        assessed += 1;
        match outcome.final_verdict {
            Verdict::Include => included += 1,
            Verdict::Exclude => {
                let reason = outcome.exclusion_reason.unwrap_or(ExclusionReason::FULL_TEXT_DEFAULT);
                *excluded_with_reasons.entry(reason).or_insert(0) += 1;
            }
            Verdict::Uncertain => unresolved += 1,
        }
    }

    let included_quantitative = inputs.quantitative.min(included);
    let mut counts = FlowCounts {
        identified,
        duplicates,
        screened,
        excluded_at_screen,
        prefiltered,
        sought,
        not_retrieved: inputs.not_retrieved,
        assessed,
        excluded_with_reasons,
        included_qualitative: included - included_quantitative,
        included_quantitative,
        unresolved,
        arithmetic_valid: false,
    };
    counts.arithmetic_valid = counts.identities_hold();
    counts
}

/// Load both stages' outcomes from `store` and aggregate them.
///
/// # Errors
///
/// Returns `ReportError::Store` if the store fails.
pub async fn collect_flow<S: ScreeningStore>(
    store: &S,
    inputs: &FlowInputs,
) -> Result<FlowCounts, ReportError> {
    let title_abstract = store.list_outcomes(Stage::TitleAbstract).await?;
    let full_text = store.list_outcomes(Stage::FullText).await?;
    Ok(aggregate(inputs, &title_abstract, &full_text))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowRule {
    AssessedExceedsSought,
    AssessedBelowMinimum,
    IncludedExceedsAssessed,
    DecompositionMismatch,
    ScreenedIdentity,
    SoughtIdentity,
    AssessedIdentity,
    IncludedIdentity,
}

impl FlowRule {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AssessedExceedsSought => "assessed_exceeds_sought",
            Self::AssessedBelowMinimum => "assessed_below_minimum",
            Self::IncludedExceedsAssessed => "included_exceeds_assessed",
            Self::DecompositionMismatch => "decomposition_mismatch",
            Self::ScreenedIdentity => "screened_identity",
            Self::SoughtIdentity => "sought_identity",
            Self::AssessedIdentity => "assessed_identity",
            Self::IncludedIdentity => "included_identity",
        }
    }
}

impl fmt::Display for FlowRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// An identity does not hold; counts may still be usable.
    Warning,
    /// The one permitted correction was applied.
    Corrected,
    /// Impossible counts. Must be surfaced to the operator.
    Hard,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowWarning {
    pub rule: FlowRule,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlowValidation {
    pub warnings: Vec<FlowWarning>,
    /// Whether `assessed` was raised to `included`.
    pub corrected: bool,
}

impl FlowValidation {
    #[must_use]
    pub fn has_hard_errors(&self) -> bool {
        self.warnings.iter().any(|w| w.severity == Severity::Hard)
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    fn push(&mut self, rule: FlowRule, severity: Severity, message: String) {
        self.warnings.push(FlowWarning { rule, severity, message });
    }
}

/// Check `counts` and apply the single permitted correction.
///
/// When `included > assessed` and `included <= sought`, `assessed` is raised
/// to `included` and logged. Every other violation is reported and left as is.
/// `counts.arithmetic_valid` is updated to reflect the result.
pub fn validate(counts: &mut FlowCounts) -> FlowValidation {
    let mut validation = FlowValidation::default();
    let included = counts.included();

    if included > counts.assessed {
        if included <= counts.sought {
            tracing::warn!(
                from = counts.assessed,
                to = included,
                sought = counts.sought,
                "flow: included exceeds assessed, raising assessed to included"
            );
            validation.push(
                FlowRule::IncludedExceedsAssessed,
                Severity::Corrected,
                format!(
                    "included ({included}) exceeded assessed ({}); assessed raised to {included}",
                    counts.assessed
                ),
            );
            counts.assessed = included;
            validation.corrected = true;
        } else {
            validation.push(
                FlowRule::IncludedExceedsAssessed,
                Severity::Hard,
                format!(
                    "included ({included}) exceeds assessed ({}) and sought ({}); not corrected",
                    counts.assessed, counts.sought
                ),
            );
        }
    }

    if counts.assessed > counts.sought {
        validation.push(
            FlowRule::AssessedExceedsSought,
            Severity::Hard,
            format!("assessed ({}) exceeds sought ({})", counts.assessed, counts.sought),
        );
    }

    if let Some(minimum) = counts.sought.checked_sub(counts.not_retrieved) {
        if counts.assessed < minimum {
            validation.push(
                FlowRule::AssessedBelowMinimum,
                Severity::Hard,
                format!(
                    "assessed ({}) is below sought minus not retrieved ({minimum})",
                    counts.assessed
                ),
            );
        }
    }

    if counts.assessed + counts.not_retrieved > counts.sought {
        validation.push(
            FlowRule::DecompositionMismatch,
            Severity::Hard,
            format!(
                "assessed ({}) plus not retrieved ({}) exceeds sought ({})",
                counts.assessed, counts.not_retrieved, counts.sought
            ),
        );
    }

    for (rule, expected, actual) in counts.identities() {
        if expected != Some(actual) {
            let expected = expected.map_or_else(|| "negative".to_string(), |e| e.to_string());
            validation.push(
                rule,
                Severity::Warning,
                format!("{rule}: expected {expected}, found {actual}"),
            );
        }
    }

    counts.arithmetic_valid = counts.identities_hold() && !validation.has_hard_errors();
    if validation.has_hard_errors() {
        tracing::warn!(warnings = validation.warnings.len(), "flow: counts failed validation");
    }
    validation
}
