//! Service layer pairing the database with the JSONL decision trail.
//!
//! `SiftService` wraps `SiftDb` (raw database access) and `TrailWriter`
//! (JSONL mirror of the decision ledger). All repo methods are implemented as
//! `impl SiftService` blocks under `repos/`.

use std::path::PathBuf;

use sift_config::StoreConfig;

use crate::SiftDb;
use crate::error::DatabaseError;
use crate::trail::writer::TrailWriter;

/// Store used by the screening engine and the reporting layer.
///
/// Decision appends follow this protocol:
/// 1. Insert the ledger row
/// 2. Append the same decision to the JSONL trail (if enabled)
pub struct SiftService {
    db: SiftDb,
    trail: TrailWriter,
}

impl SiftService {
    /// Create a new service over a local database.
    ///
    /// # Arguments
    ///
    /// * `db_path` - Path to the libSQL database file, or `":memory:"` for tests.
    /// * `trail_dir` - Directory for JSONL trail files. `None` disables the trail.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or the trail
    /// directory cannot be created.
    pub async fn new_local(
        db_path: &str,
        trail_dir: Option<PathBuf>,
    ) -> Result<Self, DatabaseError> {
        let db = SiftDb::open_local(db_path).await?;
        let trail = match trail_dir {
            Some(dir) => TrailWriter::new(dir)?,
            None => TrailWriter::disabled(),
        };
        Ok(Self { db, trail })
    }

    /// Open the store described by the `[store]` config section.
    ///
    /// Creates the parent directory of a file-backed database if needed.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the directory, database, or trail cannot be set up.
    pub async fn from_config(config: &StoreConfig) -> Result<Self, DatabaseError> {
        if config.path != ":memory:" {
            if let Some(parent) = std::path::Path::new(&config.path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| DatabaseError::Other(e.into()))?;
                }
            }
        }
        Self::new_local(&config.path, config.trail_dir().map(PathBuf::from)).await
    }

    /// Create from an existing `SiftDb` (for testing).
    #[must_use]
    pub const fn from_db(db: SiftDb, trail: TrailWriter) -> Self {
        Self { db, trail }
    }

    /// Access the underlying database handle.
    #[must_use]
    pub const fn db(&self) -> &SiftDb {
        &self.db
    }

    /// Access the trail writer.
    #[must_use]
    pub const fn trail(&self) -> &TrailWriter {
        &self.trail
    }
}
