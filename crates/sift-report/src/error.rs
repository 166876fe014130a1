use sift_core::enums::{ReviewerRole, Stage};
use sift_core::errors::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// An outcome exists without the decision that must support it.
    #[error("outcome for {record_id} at {stage} has no {role} decision")]
    MissingDecision {
        record_id: String,
        stage: Stage,
        role: ReviewerRole,
    },
}
