use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::cli::global::StageArg;

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Read candidate records from JSONL, deduplicate, and store them.
    Ingest(IngestArgs),
    /// Apply the configured relevance prefilter to unscreened records.
    Prefilter(PrefilterArgs),
    /// Inter-rater reliability for a stage.
    Reliability(ReliabilityArgs),
    /// Build and validate the flow counts.
    Flow(FlowArgs),
    /// Show the decision ledger for a stage or one record.
    Decisions(DecisionsArgs),
}

#[derive(Clone, Debug, Args)]
pub struct IngestArgs {
    /// JSONL file with one candidate record per line.
    pub path: PathBuf,
}

#[derive(Clone, Debug, Args)]
pub struct PrefilterArgs {
    /// Stage whose unscreened records are filtered.
    #[arg(long, value_enum, default_value = "title-abstract")]
    pub stage: StageArg,

    /// Report what would be excluded without writing anything.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Clone, Debug, Args)]
pub struct ReliabilityArgs {
    #[arg(long, value_enum)]
    pub stage: StageArg,

    /// Also list every disagreement (markdown with --format table).
    #[arg(long)]
    pub disagreements: bool,
}

#[derive(Clone, Debug, Args)]
pub struct FlowArgs {
    /// Reports sought but not retrieved.
    #[arg(long, default_value_t = 0)]
    pub not_retrieved: u64,

    /// Included studies that entered quantitative synthesis.
    #[arg(long, default_value_t = 0)]
    pub quantitative: u64,
}

#[derive(Clone, Debug, Args)]
pub struct DecisionsArgs {
    /// Only show this record's entries; the whole stage otherwise.
    #[arg(long)]
    pub record: Option<String>,

    #[arg(long, value_enum)]
    pub stage: StageArg,

    /// Read the JSONL trail mirror instead of the database ledger.
    #[arg(long)]
    pub from_trail: bool,
}
