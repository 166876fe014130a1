//! JSONL trail writer.
//!
//! Appends every ledger `Decision` to a per-stage `{trail_dir}/{stage}.jsonl`
//! file. Uses `serde_jsonlines::append_json_lines` for per-line appends.

use std::path::{Path, PathBuf};

use sift_core::entities::Decision;
use sift_core::enums::Stage;

use crate::error::DatabaseError;

/// Appends decisions to per-stage JSONL files.
pub struct TrailWriter {
    trail_dir: PathBuf,
    enabled: bool,
}

impl TrailWriter {
    /// Create a new `TrailWriter` pointing at the given directory.
    ///
    /// Creates the directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the directory cannot be created.
    pub fn new(trail_dir: PathBuf) -> Result<Self, DatabaseError> {
        std::fs::create_dir_all(&trail_dir).map_err(|e| DatabaseError::Other(e.into()))?;
        Ok(Self {
            trail_dir,
            enabled: true,
        })
    }

    /// Create a disabled writer (for testing or when the trail is not needed).
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            trail_dir: PathBuf::new(),
            enabled: false,
        }
    }

    /// Whether trail writing is enabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Append a decision to its stage's JSONL file.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the file write fails.
    pub fn append(&self, decision: &Decision) -> Result<(), DatabaseError> {
        if !self.enabled {
            return Ok(());
        }

        let path = self.stage_path(decision.stage);
        serde_jsonlines::append_json_lines(&path, [decision])
            .map_err(|e| DatabaseError::Other(e.into()))?;
        Ok(())
    }

    /// Read back every decision recorded for a stage.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the file exists but cannot be parsed.
    pub fn read_stage(&self, stage: Stage) -> Result<Vec<Decision>, DatabaseError> {
        let path = self.stage_path(stage);
        if !self.enabled || !path.exists() {
            return Ok(Vec::new());
        }
        serde_jsonlines::json_lines::<Decision, _>(&path)
            .and_then(|lines| lines.collect::<std::io::Result<Vec<Decision>>>())
            .map_err(|e| DatabaseError::Other(e.into()))
    }

    /// The directory where trail files are stored.
    #[must_use]
    pub fn trail_dir(&self) -> &Path {
        &self.trail_dir
    }

    fn stage_path(&self, stage: Stage) -> PathBuf {
        self.trail_dir.join(format!("{}.jsonl", stage.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sift_core::enums::{DecisionKind, ReviewerRole, Verdict};

    fn decision(record_id: &str, stage: Stage) -> Decision {
        Decision {
            record_id: record_id.into(),
            stage,
            role: ReviewerRole::ReviewerA,
            verdict: Verdict::Include,
            confidence: 0.7,
            rationale: "population matches".into(),
            exclusion_reason: None,
            kind: DecisionKind::Oracle,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn appends_per_stage_files() {
        let dir = tempfile::tempdir().unwrap();
        let writer = TrailWriter::new(dir.path().join("trail")).unwrap();

        writer.append(&decision("rec-1", Stage::TitleAbstract)).unwrap();
        writer.append(&decision("rec-2", Stage::TitleAbstract)).unwrap();
        writer.append(&decision("rec-1", Stage::FullText)).unwrap();

        let ta = writer.read_stage(Stage::TitleAbstract).unwrap();
        let ft = writer.read_stage(Stage::FullText).unwrap();
        assert_eq!(ta.len(), 2);
        assert_eq!(ft.len(), 1);
        assert_eq!(ta[1].record_id, "rec-2");
        assert!(dir.path().join("trail/title_abstract.jsonl").exists());
    }

    #[test]
    fn disabled_writer_is_a_no_op() {
        let writer = TrailWriter::disabled();
        writer.append(&decision("rec-1", Stage::FullText)).unwrap();
        assert!(!writer.is_enabled());
        assert!(writer.read_stage(Stage::FullText).unwrap().is_empty());
    }
}
