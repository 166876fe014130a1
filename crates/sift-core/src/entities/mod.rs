//! Entity structs for the screening domain.
//!
//! Each entity maps to a table in the libSQL store (see `sift-db`). All structs
//! derive `Serialize`, `Deserialize`, and `JsonSchema` for JSON roundtrip and
//! schema export.

mod decision;
mod outcome;
mod record;

pub use decision::Decision;
pub use outcome::DualOutcome;
pub use record::{CandidateRecord, DedupRun, DedupStats};
