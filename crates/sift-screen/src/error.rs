//! Screening error types for sift-screen.

use std::time::Duration;

use sift_config::ConfigError;
use sift_core::enums::{ReviewerRole, Stage};
use sift_core::errors::{CoreError, StoreError};

/// A decision-oracle call that produced no reply at all.
///
/// Replies that arrive but cannot be parsed are not errors; see
/// [`crate::oracle::OracleReply::Unparseable`].
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// The call did not complete within the configured timeout.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The oracle backend could not be reached or returned a transport error.
    #[error("unreachable: {0}")]
    Unreachable(String),
}

/// Errors from the screening engine.
#[derive(Debug, thiserror::Error)]
pub enum ScreeningError {
    /// A record-level oracle call failure. Recorded by the batch driver; the
    /// rest of the batch keeps going.
    #[error("oracle call failed for {record_id} at {stage} ({role}): {source}")]
    Oracle {
        record_id: String,
        stage: Stage,
        role: ReviewerRole,
        #[source]
        source: OracleError,
    },

    /// The persistent store failed. Fatal for the run.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Invalid configuration. Fatal for the run.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A rate-limit tier was requested that has no configured budget.
    #[error("unknown rate-limit tier '{0}'")]
    UnknownTier(String),

    /// The screening state machine attempted an illegal transition.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ScreeningError {
    /// Whether this error should stop the whole batch rather than one record.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Config(_) | Self::UnknownTier(_))
    }
}
