//! Repository modules for all Sift tables.
//!
//! Each module adds methods to `SiftService` via `impl SiftService` blocks.

pub mod decision;
pub mod dedup;
pub mod outcome;
pub mod record;
