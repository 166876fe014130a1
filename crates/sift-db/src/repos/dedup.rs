//! Dedup run statistics.

use chrono::Utc;
use sift_core::entities::{DedupRun, DedupStats};

use crate::error::DatabaseError;
use crate::helpers::{count_from_sql, count_to_sql, parse_datetime};
use crate::service::SiftService;

impl SiftService {
    /// Persist the counts of one dedup run.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the INSERT fails.
    pub async fn record_dedup_stats(&self, stats: &DedupStats) -> Result<(), DatabaseError> {
        self.db()
            .conn()
            .execute(
                "INSERT INTO dedup_runs (identified, exact_duplicates, near_duplicates, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                libsql::params![
                    count_to_sql(stats.identified),
                    count_to_sql(stats.exact_duplicates),
                    count_to_sql(stats.near_duplicates),
                    Utc::now().to_rfc3339()
                ],
            )
            .await?;
        Ok(())
    }

    /// Most recent dedup run, if any.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn latest_dedup_stats(&self) -> Result<Option<DedupRun>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT identified, exact_duplicates, near_duplicates, created_at
                 FROM dedup_runs ORDER BY id DESC LIMIT 1",
                (),
            )
            .await?;
        let Some(row) = rows.next().await? else {
            return Ok(None);
        };
        Ok(Some(DedupRun {
            stats: DedupStats {
                identified: count_from_sql(row.get::<i64>(0)?),
                exact_duplicates: count_from_sql(row.get::<i64>(1)?),
                near_duplicates: count_from_sql(row.get::<i64>(2)?),
            },
            created_at: parse_datetime(&row.get::<String>(3)?)?,
        }))
    }
}
