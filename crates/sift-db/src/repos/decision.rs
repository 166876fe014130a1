//! Decision ledger repository. Append-only.

use sift_core::entities::Decision;
use sift_core::enums::Stage;

use crate::error::DatabaseError;
use crate::helpers::{get_opt_string, parse_datetime, parse_enum, parse_optional_enum};
use crate::service::SiftService;

const DECISION_COLUMNS: &str =
    "record_id, stage, role, verdict, confidence, rationale, exclusion_reason, kind, created_at";

fn row_to_decision(row: &libsql::Row) -> Result<Decision, DatabaseError> {
    Ok(Decision {
        record_id: row.get::<String>(0)?,
        stage: parse_enum(&row.get::<String>(1)?)?,
        role: parse_enum(&row.get::<String>(2)?)?,
        verdict: parse_enum(&row.get::<String>(3)?)?,
        confidence: row.get::<f64>(4)?,
        rationale: row.get::<String>(5)?,
        exclusion_reason: parse_optional_enum(get_opt_string(row, 6)?.as_deref())?,
        kind: parse_enum(&row.get::<String>(7)?)?,
        created_at: parse_datetime(&row.get::<String>(8)?)?,
    })
}

impl SiftService {
    /// Append a decision to the ledger and mirror it to the JSONL trail.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the INSERT or the trail write fails.
    pub async fn record_decision(&self, decision: &Decision) -> Result<(), DatabaseError> {
        self.db()
            .conn()
            .execute(
                &format!(
                    "INSERT INTO decisions ({DECISION_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
                ),
                libsql::params![
                    decision.record_id.as_str(),
                    decision.stage.as_str(),
                    decision.role.as_str(),
                    decision.verdict.as_str(),
                    Decision::clamp_confidence(decision.confidence),
                    decision.rationale.as_str(),
                    decision.exclusion_reason.map(|r| r.as_str()),
                    decision.kind.as_str(),
                    decision.created_at.to_rfc3339()
                ],
            )
            .await?;

        self.trail().append(decision)?;
        Ok(())
    }

    /// All decisions for one record at one stage, in append order.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails or a row cannot be decoded.
    pub async fn query_decisions(
        &self,
        record_id: &str,
        stage: Stage,
    ) -> Result<Vec<Decision>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {DECISION_COLUMNS} FROM decisions
                     WHERE record_id = ?1 AND stage = ?2 ORDER BY seq"
                ),
                libsql::params![record_id, stage.as_str()],
            )
            .await?;

        let mut decisions = Vec::new();
        while let Some(row) = rows.next().await? {
            decisions.push(row_to_decision(&row)?);
        }
        Ok(decisions)
    }

    /// Every decision recorded at a stage, in append order.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails or a row cannot be decoded.
    pub async fn query_stage_decisions(
        &self,
        stage: Stage,
    ) -> Result<Vec<Decision>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {DECISION_COLUMNS} FROM decisions WHERE stage = ?1 ORDER BY seq"),
                [stage.as_str()],
            )
            .await?;

        let mut decisions = Vec::new();
        while let Some(row) = rows.next().await? {
            decisions.push(row_to_decision(&row)?);
        }
        Ok(decisions)
    }
}
