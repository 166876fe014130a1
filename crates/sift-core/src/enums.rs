//! Screening stages, verdicts, reviewer roles, exclusion reasons, and the
//! per-(record, stage) screening state machine.
//!
//! All enums use `snake_case` serialization via `#[serde(rename_all = "snake_case")]`,
//! which is also the representation stored in SQL columns.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Screening stage a decision belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    TitleAbstract,
    FullText,
}

impl Stage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TitleAbstract => "title_abstract",
            Self::FullText => "full_text",
        }
    }

    /// Every exclusion at this stage must carry a reason.
    #[must_use]
    pub const fn requires_exclusion_reason(self) -> bool {
        matches!(self, Self::FullText)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

/// Outcome of a single evaluation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Include,
    Exclude,
    Uncertain,
}

impl Verdict {
    /// All verdicts, in the category order used by agreement tables.
    pub const ALL: [Self; 3] = [Self::Include, Self::Exclude, Self::Uncertain];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Include => "include",
            Self::Exclude => "exclude",
            Self::Uncertain => "uncertain",
        }
    }

    /// Position of this verdict in [`Verdict::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Include => 0,
            Self::Exclude => 1,
            Self::Uncertain => 2,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ReviewerRole
// ---------------------------------------------------------------------------

/// Which reviewer produced a decision.
///
/// Reviewer A leans towards recall, reviewer B towards precision. The
/// adjudicator only runs when A and B disagree.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ReviewerRole {
    ReviewerA,
    ReviewerB,
    Adjudicator,
}

impl ReviewerRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReviewerA => "reviewer_a",
            Self::ReviewerB => "reviewer_b",
            Self::Adjudicator => "adjudicator",
        }
    }

    #[must_use]
    pub const fn is_adjudicator(self) -> bool {
        matches!(self, Self::Adjudicator)
    }
}

impl fmt::Display for ReviewerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ExclusionReason
// ---------------------------------------------------------------------------

/// Closed taxonomy of exclusion reasons.
///
/// The last two variants are only ever assigned by the relevance prefilter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    WrongPopulation,
    WrongIntervention,
    WrongComparator,
    WrongOutcome,
    WrongStudyDesign,
    WrongPublicationType,
    WrongSetting,
    Language,
    Duplicate,
    FullTextUnavailable,
    InsufficientData,
    Other,
    BelowKeywordThreshold,
    BelowRelevanceRank,
}

impl ExclusionReason {
    /// Reason substituted when a full-text exclusion arrives without one.
    pub const FULL_TEXT_DEFAULT: Self = Self::Other;

    pub const ALL: [Self; 14] = [
        Self::WrongPopulation,
        Self::WrongIntervention,
        Self::WrongComparator,
        Self::WrongOutcome,
        Self::WrongStudyDesign,
        Self::WrongPublicationType,
        Self::WrongSetting,
        Self::Language,
        Self::Duplicate,
        Self::FullTextUnavailable,
        Self::InsufficientData,
        Self::Other,
        Self::BelowKeywordThreshold,
        Self::BelowRelevanceRank,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WrongPopulation => "wrong_population",
            Self::WrongIntervention => "wrong_intervention",
            Self::WrongComparator => "wrong_comparator",
            Self::WrongOutcome => "wrong_outcome",
            Self::WrongStudyDesign => "wrong_study_design",
            Self::WrongPublicationType => "wrong_publication_type",
            Self::WrongSetting => "wrong_setting",
            Self::Language => "language",
            Self::Duplicate => "duplicate",
            Self::FullTextUnavailable => "full_text_unavailable",
            Self::InsufficientData => "insufficient_data",
            Self::Other => "other",
            Self::BelowKeywordThreshold => "below_keyword_threshold",
            Self::BelowRelevanceRank => "below_relevance_rank",
        }
    }

    /// Human-readable label for flow diagrams and tables.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::WrongPopulation => "Wrong population",
            Self::WrongIntervention => "Wrong intervention",
            Self::WrongComparator => "Wrong comparator",
            Self::WrongOutcome => "Wrong outcome",
            Self::WrongStudyDesign => "Wrong study design",
            Self::WrongPublicationType => "Wrong publication type",
            Self::WrongSetting => "Wrong setting",
            Self::Language => "Language",
            Self::Duplicate => "Duplicate",
            Self::FullTextUnavailable => "Full text unavailable",
            Self::InsufficientData => "Insufficient data",
            Self::Other => "Other",
            Self::BelowKeywordThreshold => "Below keyword threshold",
            Self::BelowRelevanceRank => "Below relevance rank",
        }
    }

    #[must_use]
    pub const fn is_prefilter_code(self) -> bool {
        matches!(self, Self::BelowKeywordThreshold | Self::BelowRelevanceRank)
    }
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// DecisionKind
// ---------------------------------------------------------------------------

/// How a ledger decision came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    /// Structured reply from the decision oracle.
    Oracle,
    /// The oracle answered but the reply could not be parsed.
    ParseFailure,
    /// The oracle call itself failed (timeout, unreachable).
    CallFailure,
    /// Synthetic decision written by the relevance prefilter.
    Prefilter,
}

impl DecisionKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Oracle => "oracle",
            Self::ParseFailure => "parse_failure",
            Self::CallFailure => "call_failure",
            Self::Prefilter => "prefilter",
        }
    }
}

impl fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ScreeningState
// ---------------------------------------------------------------------------

/// Lifecycle of one (record, stage) evaluation.
///
/// ```text
/// pending → awaiting_pair → agreed → final
///                         → disagreed → awaiting_adjudication → adjudicated → final
/// ```
///
/// `Pending` is implicit (no outcome row); `Final` is represented by the
/// presence of an outcome row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ScreeningState {
    Pending,
    AwaitingPair,
    Agreed,
    Disagreed,
    AwaitingAdjudication,
    Adjudicated,
    Final,
}

impl ScreeningState {
    /// Valid next states from the current state.
    #[must_use]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::AwaitingPair],
            Self::AwaitingPair => &[Self::Agreed, Self::Disagreed],
            Self::Agreed | Self::Adjudicated => &[Self::Final],
            Self::Disagreed => &[Self::AwaitingAdjudication],
            Self::AwaitingAdjudication => &[Self::Adjudicated],
            Self::Final => &[],
        }
    }

    /// Check whether transitioning to `next` is allowed.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Final)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::AwaitingPair => "awaiting_pair",
            Self::Agreed => "agreed",
            Self::Disagreed => "disagreed",
            Self::AwaitingAdjudication => "awaiting_adjudication",
            Self::Adjudicated => "adjudicated",
            Self::Final => "final",
        }
    }
}

impl fmt::Display for ScreeningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// PrefilterPolicy
// ---------------------------------------------------------------------------

/// Relevance prefilter policy selected by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PrefilterPolicy {
    /// Require at least K configured terms in title + abstract.
    HardGate,
    /// Forward only the top-N records by BM25 score.
    Ranked,
    /// Forward everything.
    Disabled,
}

impl PrefilterPolicy {
    /// Parse the configuration spelling of a policy.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hard_gate" => Some(Self::HardGate),
            "ranked" => Some(Self::Ranked),
            "disabled" | "none" => Some(Self::Disabled),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HardGate => "hard_gate",
            Self::Ranked => "ranked",
            Self::Disabled => "disabled",
        }
    }
}

impl fmt::Display for PrefilterPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
