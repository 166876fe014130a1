//! Persistent store contract consumed by the screening engine.
//!
//! Every write is keyed by `(record_id, stage)` and is either a strict append
//! (decisions) or a single-row upsert (outcomes), so concurrent workers on
//! disjoint records need no cross-record locking. Per-key atomicity is the
//! only transactional guarantee required.

use std::future::Future;

use crate::entities::{Decision, DualOutcome};
use crate::enums::Stage;
use crate::errors::StoreError;

pub trait ScreeningStore: Send + Sync {
    /// Append a decision to the ledger. Never overwrites.
    fn append_decision(
        &self,
        decision: &Decision,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Insert or replace the outcome row for `(outcome.record_id, outcome.stage)`.
    fn upsert_outcome(
        &self,
        outcome: &DualOutcome,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// All decisions for a record at a stage, oldest first.
    fn list_decisions(
        &self,
        record_id: &str,
        stage: Stage,
    ) -> impl Future<Output = Result<Vec<Decision>, StoreError>> + Send;

    fn get_outcome(
        &self,
        record_id: &str,
        stage: Stage,
    ) -> impl Future<Output = Result<Option<DualOutcome>, StoreError>> + Send;

    /// All outcomes at a stage, ordered by record id.
    fn list_outcomes(
        &self,
        stage: Stage,
    ) -> impl Future<Output = Result<Vec<DualOutcome>, StoreError>> + Send;
}
