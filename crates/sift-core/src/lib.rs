//! # sift-core
//!
//! Core types, screening enums, and error types for Sift.
//!
//! This crate provides the foundational types shared across all Sift crates:
//! - Entity structs (candidate records, decisions, dual outcomes, dedup stats)
//! - Stage, verdict, reviewer-role, and exclusion-reason enums
//! - The per-(record, stage) screening state machine
//! - The persistent store contract
//! - Cross-cutting error types

pub mod entities;
pub mod enums;
pub mod errors;
pub mod store;
