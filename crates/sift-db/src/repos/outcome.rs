//! Dual outcome repository. One upsertable row per (record, stage).

use sift_core::entities::DualOutcome;
use sift_core::enums::Stage;

use crate::error::DatabaseError;
use crate::helpers::{bool_to_sql, get_opt_string, parse_datetime, parse_enum, parse_optional_enum};
use crate::service::SiftService;

const OUTCOME_COLUMNS: &str = "record_id, stage, reviewer_a, reviewer_b, agreement, final_verdict, \
     adjudicated, exclusion_reason, prefiltered, updated_at";

fn row_to_outcome(row: &libsql::Row) -> Result<DualOutcome, DatabaseError> {
    Ok(DualOutcome {
        record_id: row.get::<String>(0)?,
        stage: parse_enum(&row.get::<String>(1)?)?,
        reviewer_a: parse_enum(&row.get::<String>(2)?)?,
        reviewer_b: parse_enum(&row.get::<String>(3)?)?,
        agreement: row.get::<i64>(4)? != 0,
        final_verdict: parse_enum(&row.get::<String>(5)?)?,
        adjudicated: row.get::<i64>(6)? != 0,
        exclusion_reason: parse_optional_enum(get_opt_string(row, 7)?.as_deref())?,
        prefiltered: row.get::<i64>(8)? != 0,
        updated_at: parse_datetime(&row.get::<String>(9)?)?,
    })
}

impl SiftService {
    /// Insert or replace the outcome for `(record_id, stage)`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the statement fails.
    pub async fn save_outcome(&self, outcome: &DualOutcome) -> Result<(), DatabaseError> {
        self.db()
            .conn()
            .execute(
                &format!(
                    "INSERT INTO dual_outcomes ({OUTCOME_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                     ON CONFLICT(record_id, stage) DO UPDATE SET
                         reviewer_a = excluded.reviewer_a,
                         reviewer_b = excluded.reviewer_b,
                         agreement = excluded.agreement,
                         final_verdict = excluded.final_verdict,
                         adjudicated = excluded.adjudicated,
                         exclusion_reason = excluded.exclusion_reason,
                         prefiltered = excluded.prefiltered,
                         updated_at = excluded.updated_at"
                ),
                libsql::params![
                    outcome.record_id.as_str(),
                    outcome.stage.as_str(),
                    outcome.reviewer_a.as_str(),
                    outcome.reviewer_b.as_str(),
                    bool_to_sql(outcome.agreement),
                    outcome.final_verdict.as_str(),
                    bool_to_sql(outcome.adjudicated),
                    outcome.exclusion_reason.map(|r| r.as_str()),
                    bool_to_sql(outcome.prefiltered),
                    outcome.updated_at.to_rfc3339()
                ],
            )
            .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails or the row cannot be decoded.
    pub async fn find_outcome(
        &self,
        record_id: &str,
        stage: Stage,
    ) -> Result<Option<DualOutcome>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {OUTCOME_COLUMNS} FROM dual_outcomes WHERE record_id = ?1 AND stage = ?2"
                ),
                libsql::params![record_id, stage.as_str()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_outcome(&row)?)),
            None => Ok(None),
        }
    }

    /// All outcomes at a stage, ordered by record id.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails or a row cannot be decoded.
    pub async fn query_outcomes(&self, stage: Stage) -> Result<Vec<DualOutcome>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {OUTCOME_COLUMNS} FROM dual_outcomes WHERE stage = ?1 ORDER BY record_id"
                ),
                [stage.as_str()],
            )
            .await?;

        let mut outcomes = Vec::new();
        while let Some(row) = rows.next().await? {
            outcomes.push(row_to_outcome(&row)?);
        }
        Ok(outcomes)
    }
}
