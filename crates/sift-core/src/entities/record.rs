use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A candidate bibliographic record produced by upstream ingestion.
///
/// Immutable once ingested and never deleted: it is the unit the funnel counts
/// against.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct CandidateRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub year: Option<i32>,
    /// External identifier such as a DOI.
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Where the record came from (database name, citation chasing, ...).
    #[serde(default)]
    pub provenance: Option<String>,
}

impl CandidateRecord {
    /// Minimal record with only an id and a title.
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            authors: Vec::new(),
            year: None,
            external_id: None,
            abstract_text: None,
            keywords: Vec::new(),
            provenance: None,
        }
    }

    #[must_use]
    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    #[must_use]
    pub fn with_abstract(mut self, text: impl Into<String>) -> Self {
        self.abstract_text = Some(text.into());
        self
    }

    /// Title and abstract joined, the text the prefilter scores against.
    #[must_use]
    pub fn screening_text(&self) -> String {
        match self.abstract_text.as_deref() {
            Some(abs) if !abs.is_empty() => format!("{} {abs}", self.title),
            _ => self.title.clone(),
        }
    }
}

/// Counts produced by one deduplication run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct DedupStats {
    /// Records received from ingestion.
    pub identified: u64,
    /// Records dropped by the exact identifier stage.
    pub exact_duplicates: u64,
    /// Records dropped by the approximate title stage.
    pub near_duplicates: u64,
}

impl DedupStats {
    #[must_use]
    pub const fn duplicates(&self) -> u64 {
        self.exact_duplicates + self.near_duplicates
    }

    #[must_use]
    pub const fn unique(&self) -> u64 {
        self.identified.saturating_sub(self.duplicates())
    }
}

/// Timestamped dedup statistics as persisted by the store.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct DedupRun {
    pub stats: DedupStats,
    pub created_at: DateTime<Utc>,
}
