//! # sift-screen
//!
//! Screening engine for Sift: record deduplication, the relevance prefilter,
//! and the dual-reviewer state machine with its batch driver.
//!
//! The engine never talks to a model directly. It calls a [`DecisionOracle`]
//! under per-tier rate limits and writes everything through a
//! [`sift_core::store::ScreeningStore`].

pub mod cancel;
pub mod dedup;
pub mod driver;
pub mod error;
pub mod limiter;
pub mod machine;
pub mod minhash;
pub mod oracle;
pub mod prefilter;
pub mod similarity;
pub mod text;

pub use cancel::{CancelState, CancellationToken};
pub use dedup::{DedupOutcome, Deduplicator, DuplicateMatch, MatchStage};
pub use driver::{BatchSummary, ScreeningDriver};
pub use error::{OracleError, ScreeningError};
pub use limiter::{RateLimitObserver, RateLimitWait, RateLimiter, TierStats, TracingObserver};
pub use machine::{Evaluation, ScreeningMachine};
pub use oracle::{Assessment, DecisionOracle, OracleReply, OracleRequest, parse_reply};
pub use prefilter::{Prefilter, PrefilterExclusion, PrefilterOutcome, persist_prefilter_exclusions};
