//! # sift-db
//!
//! libSQL persistence for Sift.
//!
//! Holds the candidate records, the append-only decision ledger, the
//! per-(record, stage) dual outcomes, and dedup run statistics. `SiftService`
//! implements the `ScreeningStore` contract from `sift-core` on top of it and
//! mirrors every appended decision into an optional JSONL trail.

pub mod error;
pub mod helpers;
mod migrations;
pub mod repos;
pub mod service;
mod store;
#[cfg(test)]
mod test_support;
pub mod trail;

use error::DatabaseError;
use libsql::Builder;

pub use service::SiftService;

/// Central database handle.
///
/// Wraps a libSQL database and connection. The connection is shared by all
/// concurrent screening workers; libSQL serializes statements internally.
pub struct SiftDb {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: libsql::Connection,
}

impl SiftDb {
    /// Open a local database at the given path, or `":memory:"`.
    ///
    /// Runs migrations automatically on open.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or
    /// migrations fail.
    pub async fn open_local(path: &str) -> Result<Self, DatabaseError> {
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;

        let sift_db = Self { db, conn };
        sift_db.run_migrations().await?;
        tracing::debug!(path, "opened sift database");
        Ok(sift_db)
    }

    /// Access the underlying libSQL connection for direct queries.
    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }
}
