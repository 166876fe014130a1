//! Candidate record repository. Insert-once, never updated or deleted.

use sift_core::entities::CandidateRecord;
use sift_core::enums::{Stage, Verdict};

use crate::error::DatabaseError;
use crate::helpers::{encode_string_list, get_opt_string, parse_string_list};
use crate::service::SiftService;

const RECORD_COLUMNS: &str =
    "r.id, r.title, r.authors, r.year, r.external_id, r.abstract, r.keywords, r.provenance";

fn row_to_record(row: &libsql::Row) -> Result<CandidateRecord, DatabaseError> {
    Ok(CandidateRecord {
        id: row.get::<String>(0)?,
        title: row.get::<String>(1)?,
        authors: parse_string_list(&row.get::<String>(2)?)?,
        year: row
            .get::<Option<i64>>(3)?
            .and_then(|y| i32::try_from(y).ok()),
        external_id: get_opt_string(row, 4)?,
        abstract_text: get_opt_string(row, 5)?,
        keywords: parse_string_list(&row.get::<String>(6)?)?,
        provenance: get_opt_string(row, 7)?,
    })
}

impl SiftService {
    /// Insert records, ignoring ids that already exist. Returns how many were new.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if an INSERT fails.
    pub async fn insert_records(&self, records: &[CandidateRecord]) -> Result<u64, DatabaseError> {
        let mut inserted = 0;
        for record in records {
            inserted += self
                .db()
                .conn()
                .execute(
                    "INSERT OR IGNORE INTO records (id, title, authors, year, external_id, abstract, keywords, provenance)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    libsql::params![
                        record.id.as_str(),
                        record.title.as_str(),
                        encode_string_list(&record.authors)?,
                        record.year.map(i64::from),
                        record.external_id.as_deref(),
                        record.abstract_text.as_deref(),
                        encode_string_list(&record.keywords)?,
                        record.provenance.as_deref()
                    ],
                )
                .await?;
        }
        tracing::debug!(inserted, offered = records.len(), "stored candidate records");
        Ok(inserted)
    }

    /// # Errors
    ///
    /// Returns `DatabaseError::NoResult` if no record has this id.
    pub async fn get_record(&self, id: &str) -> Result<CandidateRecord, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {RECORD_COLUMNS} FROM records r WHERE r.id = ?1"),
                [id],
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        row_to_record(&row)
    }

    /// All records in ingestion order.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails or a row cannot be decoded.
    pub async fn list_records(&self) -> Result<Vec<CandidateRecord>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {RECORD_COLUMNS} FROM records r ORDER BY r.rowid"),
                (),
            )
            .await?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(row_to_record(&row)?);
        }
        Ok(records)
    }

    /// Records still waiting for an outcome at `stage`, in ingestion order.
    ///
    /// Full-text screening only sees records that have a title/abstract
    /// outcome whose final verdict is not `exclude`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails or a row cannot be decoded.
    pub async fn list_unscreened_records(
        &self,
        stage: Stage,
    ) -> Result<Vec<CandidateRecord>, DatabaseError> {
        let (eligible, params) = match stage {
            Stage::TitleAbstract => ("", vec![stage.as_str()]),
            Stage::FullText => (
                "JOIN dual_outcomes ta ON ta.record_id = r.id
                     AND ta.stage = ?2 AND ta.final_verdict != ?3",
                vec![stage.as_str(), Stage::TitleAbstract.as_str(), Verdict::Exclude.as_str()],
            ),
        };
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {RECORD_COLUMNS} FROM records r
                     {eligible}
                     LEFT JOIN dual_outcomes o ON o.record_id = r.id AND o.stage = ?1
                     WHERE o.record_id IS NULL
                     ORDER BY r.rowid"
                ),
                params,
            )
            .await?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(row_to_record(&row)?);
        }
        Ok(records)
    }
}
