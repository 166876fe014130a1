//! Inter-rater reliability between reviewer A and reviewer B.
//!
//! Outcomes excluded by the prefilter are left out: they were never dually
//! reviewed, and counting them would inflate agreement.

use std::fmt::{self, Write as _};

use serde::Serialize;
use sift_core::entities::{Decision, DualOutcome};
use sift_core::enums::{DecisionKind, ExclusionReason, ReviewerRole, Stage, Verdict};
use sift_core::store::ScreeningStore;

use crate::error::ReportError;

// ---------------------------------------------------------------------------
// Kappa
// ---------------------------------------------------------------------------

/// Landis & Koch bands for a kappa value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgreementLevel {
    Poor,
    Slight,
    Fair,
    Moderate,
    Substantial,
    AlmostPerfect,
}

impl AgreementLevel {
    #[must_use]
    pub fn from_kappa(kappa: f64) -> Self {
        match kappa {
            k if k < 0.0 => Self::Poor,
            k if k <= 0.20 => Self::Slight,
            k if k <= 0.40 => Self::Fair,
            k if k <= 0.60 => Self::Moderate,
            k if k <= 0.80 => Self::Substantial,
            _ => Self::AlmostPerfect,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Poor => "poor",
            Self::Slight => "slight",
            Self::Fair => "fair",
            Self::Moderate => "moderate",
            Self::Substantial => "substantial",
            Self::AlmostPerfect => "almost perfect",
        }
    }
}

impl fmt::Display for AgreementLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cohen's kappa over `{include, exclude, uncertain}`.
///
/// `None` for no pairs. When both raters used one category throughout,
/// expected agreement is 1 and the ratio is undefined; perfect observed
/// agreement is reported as 1.0.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn cohen_kappa(pairs: &[(Verdict, Verdict)]) -> Option<f64> {
    if pairs.is_empty() {
        return None;
    }
    let table = confusion(pairs);
    let n = pairs.len() as f64;

    let observed = (0..3).map(|k| table[k][k]).sum::<u64>() as f64 / n;
    let expected: f64 = (0..3)
        .map(|k| {
            let row: u64 = table[k].iter().sum();
            let col: u64 = table.iter().map(|r| r[k]).sum();
            (row as f64 / n) * (col as f64 / n)
        })
        .sum();

    if (1.0 - expected).abs() < f64::EPSILON {
        return Some(if (observed - 1.0).abs() < f64::EPSILON { 1.0 } else { 0.0 });
    }
    Some((observed - expected) / (1.0 - expected))
}

/// Rows are reviewer A, columns reviewer B, both indexed by [`Verdict::index`].
fn confusion(pairs: &[(Verdict, Verdict)]) -> [[u64; 3]; 3] {
    let mut table = [[0u64; 3]; 3];
    for (a, b) in pairs {
        table[a.index()][b.index()] += 1;
    }
    table
}

// ---------------------------------------------------------------------------
// ReliabilityReport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReliabilityReport {
    pub stage: Stage,
    /// Dually reviewed outcomes.
    pub items: usize,
    pub agreements: usize,
    /// Raw agreement in percent, 0 when there are no items.
    pub percent_agreement: f64,
    pub kappa: Option<f64>,
    pub level: Option<AgreementLevel>,
    /// Outcomes left out because the prefilter excluded them.
    pub prefiltered: usize,
    pub confusion: [[u64; 3]; 3],
}

/// Reliability of the reviewer pair over the outcomes of one stage.
///
/// Outcomes from other stages are ignored.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn reliability(stage: Stage, outcomes: &[DualOutcome]) -> ReliabilityReport {
    let at_stage = outcomes.iter().filter(|o| o.stage == stage);
    let (prefiltered, reviewed): (Vec<&DualOutcome>, Vec<&DualOutcome>) =
        at_stage.partition(|o| o.prefiltered);

    let pairs: Vec<(Verdict, Verdict)> =
        reviewed.iter().map(|o| (o.reviewer_a, o.reviewer_b)).collect();
    let agreements = pairs.iter().filter(|(a, b)| a == b).count();
    let percent_agreement = if pairs.is_empty() {
        0.0
    } else {
        100.0 * agreements as f64 / pairs.len() as f64
    };
    let kappa = cohen_kappa(&pairs);

    ReliabilityReport {
        stage,
        items: pairs.len(),
        agreements,
        percent_agreement,
        kappa,
        level: kappa.map(AgreementLevel::from_kappa),
        prefiltered: prefiltered.len(),
        confusion: confusion(&pairs),
    }
}

// ---------------------------------------------------------------------------
// Disagreements
// ---------------------------------------------------------------------------

/// One reviewer's side of a disagreement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewerView {
    pub verdict: Verdict,
    pub confidence: f64,
    pub rationale: String,
    pub exclusion_reason: Option<ExclusionReason>,
}

impl From<&Decision> for ReviewerView {
    fn from(d: &Decision) -> Self {
        Self {
            verdict: d.verdict,
            confidence: d.confidence,
            rationale: d.rationale.clone(),
            exclusion_reason: d.exclusion_reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisagreementItem {
    pub record_id: String,
    pub reviewer_a: ReviewerView,
    pub reviewer_b: ReviewerView,
    pub adjudicator: Option<ReviewerView>,
    pub final_verdict: Verdict,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisagreementReport {
    pub stage: Stage,
    pub items: Vec<DisagreementItem>,
}

/// Every disagreement at `stage`, with both reviewers' reasoning and the
/// adjudicated verdict.
///
/// When a record was retried, the latest decision per role is shown.
///
/// # Errors
///
/// Returns `ReportError::Store` if the store fails, or
/// `ReportError::MissingDecision` if an outcome lacks a reviewer decision.
pub async fn disagreements<S: ScreeningStore>(
    store: &S,
    stage: Stage,
) -> Result<DisagreementReport, ReportError> {
    let mut items = Vec::new();
    for outcome in store.list_outcomes(stage).await? {
        if outcome.agreement || outcome.prefiltered {
            continue;
        }
        let ledger = store.list_decisions(&outcome.record_id, stage).await?;
        let require = |role: ReviewerRole| {
            latest(&ledger, role)
                .map(ReviewerView::from)
                .ok_or_else(|| ReportError::MissingDecision {
                    record_id: outcome.record_id.clone(),
                    stage,
                    role,
                })
        };
        let reviewer_a = require(ReviewerRole::ReviewerA)?;
        let reviewer_b = require(ReviewerRole::ReviewerB)?;
        let adjudicator = latest(&ledger, ReviewerRole::Adjudicator).map(ReviewerView::from);

        items.push(DisagreementItem {
            record_id: outcome.record_id,
            reviewer_a,
            reviewer_b,
            adjudicator,
            final_verdict: outcome.final_verdict,
        });
    }
    tracing::debug!(%stage, count = items.len(), "report: collected disagreements");
    Ok(DisagreementReport { stage, items })
}

/// Latest non-failure decision by `role`.
fn latest(ledger: &[Decision], role: ReviewerRole) -> Option<&Decision> {
    ledger
        .iter()
        .rev()
        .find(|d| d.role == role && d.kind != DecisionKind::CallFailure)
}

impl DisagreementReport {
    #[must_use]
    pub fn render_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Reviewer disagreements: {}\n", self.stage);
        if self.items.is_empty() {
            out.push_str("No disagreements.\n");
            return out;
        }
        let _ = writeln!(out, "{} disagreement(s).\n", self.items.len());

        for item in &self.items {
            let _ = writeln!(out, "## {}\n", item.record_id);
            write_view(&mut out, "Reviewer A", &item.reviewer_a);
            write_view(&mut out, "Reviewer B", &item.reviewer_b);
            if let Some(adj) = &item.adjudicator {
                write_view(&mut out, "Adjudicator", adj);
            }
            let _ = writeln!(out, "**Final verdict:** {}\n", item.final_verdict);
        }
        out
    }
}

fn write_view(out: &mut String, label: &str, view: &ReviewerView) {
    let _ = write!(out, "- **{label}:** {} ({:.2})", view.verdict, view.confidence);
    if let Some(reason) = view.exclusion_reason {
        let _ = write!(out, " [{}]", reason.label());
    }
    let rationale = view.rationale.trim();
    if rationale.is_empty() {
        out.push('\n');
    } else {
        let _ = writeln!(out, ": {rationale}");
    }
}
