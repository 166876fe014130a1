//! JSONL mirror of the decision ledger.

pub mod writer;
