//! Bounded-concurrency batch driver.
//!
//! Runs [`ScreeningMachine::evaluate`] for a batch of records with at most
//! `max_workers` records in flight. Record-level oracle failures are written
//! to the ledger as `call_failure` decisions and the batch keeps going; the
//! record stays without an outcome, so the next run retries it. Store
//! failures stop the batch.
//!
//! Cancellation is polled between records (soft) and raced against in-flight
//! work (hard).

use std::sync::Arc;

use serde::Serialize;
use sift_core::entities::{CandidateRecord, Decision};
use sift_core::enums::Stage;
use sift_core::store::ScreeningStore;
use tokio::task::{JoinError, JoinSet};

use crate::cancel::{CancelState, CancellationToken};
use crate::error::ScreeningError;
use crate::machine::{Evaluation, ScreeningMachine};
use crate::oracle::DecisionOracle;
use crate::prefilter::{Prefilter, persist_prefilter_exclusions};

/// Counts for one batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub stage: Stage,
    pub submitted: usize,
    /// Outcomes written during this run.
    pub finalized: usize,
    /// Records that already had an outcome.
    pub skipped: usize,
    /// Finalized outcomes that needed the adjudicator.
    pub adjudicated: usize,
    /// Records whose oracle calls failed. They have no outcome yet.
    pub failed: usize,
    /// Records never started because of cancellation.
    pub not_started: usize,
    /// In-flight records discarded by a hard cancel.
    pub aborted: usize,
    /// Records excluded by the prefilter before review.
    pub prefiltered: usize,
    pub cancellation: CancelState,
}

impl BatchSummary {
    const fn new(stage: Stage, submitted: usize) -> Self {
        Self {
            stage,
            submitted,
            finalized: 0,
            skipped: 0,
            adjudicated: 0,
            failed: 0,
            not_started: 0,
            aborted: 0,
            prefiltered: 0,
            cancellation: CancelState::Running,
        }
    }

    /// Every submitted record is accounted for exactly once.
    #[must_use]
    pub const fn is_balanced(&self) -> bool {
        self.finalized
            + self.skipped
            + self.failed
            + self.not_started
            + self.aborted
            + self.prefiltered
            == self.submitted
    }
}

type TaskResult = (String, Result<Evaluation, ScreeningError>);

pub struct ScreeningDriver<O, S> {
    machine: Arc<ScreeningMachine<O, S>>,
    max_workers: usize,
}

impl<O, S> ScreeningDriver<O, S>
where
    O: DecisionOracle + 'static,
    S: ScreeningStore + 'static,
{
    #[must_use]
    pub fn new(machine: ScreeningMachine<O, S>, max_workers: usize) -> Self {
        Self { machine: Arc::new(machine), max_workers: max_workers.max(1) }
    }

    #[must_use]
    pub const fn machine(&self) -> &Arc<ScreeningMachine<O, S>> {
        &self.machine
    }

    /// Apply `prefilter`, record its exclusions, then screen what it forwards.
    ///
    /// # Errors
    ///
    /// Same as [`Self::run`].
    pub async fn run_with_prefilter(
        &self,
        records: Vec<CandidateRecord>,
        stage: Stage,
        prefilter: &Prefilter,
        cancel: &CancellationToken,
    ) -> Result<BatchSummary, ScreeningError> {
        let submitted = records.len();
        let partition = prefilter.partition(records);
        persist_prefilter_exclusions(self.machine.store().as_ref(), stage, &partition.excluded)
            .await?;

        let mut summary = self.run(partition.forwarded, stage, cancel).await?;
        summary.submitted = submitted;
        summary.prefiltered = partition.excluded.len();
        Ok(summary)
    }

    /// Screen `records` at `stage`.
    ///
    /// # Errors
    ///
    /// Returns `ScreeningError::Store` (or another fatal error) if the batch
    /// had to stop. In-flight work is aborted first.
    pub async fn run(
        &self,
        records: Vec<CandidateRecord>,
        stage: Stage,
        cancel: &CancellationToken,
    ) -> Result<BatchSummary, ScreeningError> {
        let mut summary = BatchSummary::new(stage, records.len());
        let mut tasks: JoinSet<TaskResult> = JoinSet::new();
        let mut queue = records.into_iter();

        tracing::info!(
            %stage,
            records = summary.submitted,
            workers = self.max_workers,
            "screening: batch started",
        );

        'feed: loop {
            while tasks.len() >= self.max_workers {
                tokio::select! {
                    biased;
                    () = cancel.hard_cancelled() => break 'feed,
                    joined = tasks.join_next() => {
                        if let Some(joined) = joined {
                            self.settle(joined, &mut summary).await?;
                        }
                    }
                }
            }

            if cancel.is_cancelled() {
                break;
            }
            let Some(record) = queue.next() else {
                break;
            };
            let machine = Arc::clone(&self.machine);
            tasks.spawn(async move {
                let result = machine.evaluate(&record, stage).await;
                (record.id, result)
            });
        }

        let remaining = queue.count();
        if remaining > 0 {
            tracing::info!(
                %stage,
                remaining,
                "screening: cancellation requested, not starting remaining records",
            );
        }
        summary.not_started = remaining;

        loop {
            tokio::select! {
                biased;
                () = cancel.hard_cancelled(), if !tasks.is_empty() => {
                    tracing::warn!(
                        %stage,
                        in_flight = tasks.len(),
                        "screening: hard cancel, aborting in-flight records",
                    );
                    tasks.abort_all();
                    while let Some(joined) = tasks.join_next().await {
                        self.settle(joined, &mut summary).await?;
                    }
                    break;
                }
                joined = tasks.join_next() => match joined {
                    Some(joined) => self.settle(joined, &mut summary).await?,
                    None => break,
                }
            }
        }

        summary.cancellation = cancel.state();
        tracing::info!(
            %stage,
            finalized = summary.finalized,
            skipped = summary.skipped,
            adjudicated = summary.adjudicated,
            failed = summary.failed,
            not_started = summary.not_started,
            aborted = summary.aborted,
            cancellation = %summary.cancellation,
            "screening: batch finished"
        );
        Ok(summary)
    }

    /// Fold one finished task into the summary. Fatal errors abort nothing
    /// here; the caller's `?` drops the `JoinSet`, which aborts the rest.
    async fn settle(
        &self,
        joined: Result<TaskResult, JoinError>,
        summary: &mut BatchSummary,
    ) -> Result<(), ScreeningError> {
        match joined {
            Ok((_, Ok(Evaluation::Finalized(outcome)))) => {
                summary.finalized += 1;
                if outcome.adjudicated {
                    summary.adjudicated += 1;
                }
            }
            Ok((_, Ok(Evaluation::Skipped(_)))) => summary.skipped += 1,
            Ok((record_id, Err(ScreeningError::Oracle { stage, role, source, .. }))) => {
                tracing::warn!(
                    record = %record_id,
                    %stage,
                    %role,
                    error = %source,
                    "screening: oracle call failed, record left for retry",
                );
                let decision = Decision::call_failure(&record_id, stage, role, &source.to_string());
                self.machine.store().append_decision(&decision).await?;
                summary.failed += 1;
            }
            Ok((record_id, Err(e))) if e.is_fatal() => {
                tracing::error!(
                    record = %record_id,
                    error = %e,
                    "screening: fatal error, stopping batch",
                );
                return Err(e);
            }
            Ok((record_id, Err(e))) => {
                tracing::warn!(record = %record_id, error = %e, "screening: record failed");
                summary.failed += 1;
            }
            Err(e) if e.is_cancelled() => summary.aborted += 1,
            Err(e) => {
                tracing::error!(error = %e, "screening: worker panicked");
                summary.failed += 1;
            }
        }
        Ok(())
    }
}
