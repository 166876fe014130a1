//! `ScreeningStore` implementation backed by libSQL.

use sift_core::entities::{Decision, DualOutcome};
use sift_core::enums::Stage;
use sift_core::errors::StoreError;
use sift_core::store::ScreeningStore;

use crate::service::SiftService;

impl ScreeningStore for SiftService {
    async fn append_decision(&self, decision: &Decision) -> Result<(), StoreError> {
        self.record_decision(decision).await.map_err(Into::into)
    }

    async fn upsert_outcome(&self, outcome: &DualOutcome) -> Result<(), StoreError> {
        self.save_outcome(outcome).await.map_err(Into::into)
    }

    async fn list_decisions(
        &self,
        record_id: &str,
        stage: Stage,
    ) -> Result<Vec<Decision>, StoreError> {
        self.query_decisions(record_id, stage)
            .await
            .map_err(Into::into)
    }

    async fn get_outcome(
        &self,
        record_id: &str,
        stage: Stage,
    ) -> Result<Option<DualOutcome>, StoreError> {
        self.find_outcome(record_id, stage).await.map_err(Into::into)
    }

    async fn list_outcomes(&self, stage: Stage) -> Result<Vec<DualOutcome>, StoreError> {
        self.query_outcomes(stage).await.map_err(Into::into)
    }
}
