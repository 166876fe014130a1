//! # sift-report
//!
//! Derived, read-only reports over screening outcomes:
//!
//! - [`reliability`]: Cohen's kappa and raw agreement between the two
//!   reviewers, plus a listing of every disagreement.
//! - [`flow`]: the identification-to-inclusion funnel and its arithmetic
//!   validation.
//!
//! Nothing here writes to the store.

pub mod error;
pub mod flow;
pub mod reliability;

pub use error::ReportError;
pub use flow::{
    FlowCounts, FlowInputs, FlowRule, FlowValidation, FlowWarning, Severity, aggregate,
    collect_flow, validate,
};
pub use reliability::{
    AgreementLevel, DisagreementItem, DisagreementReport, ReliabilityReport, ReviewerView,
    cohen_kappa, disagreements, reliability,
};
