use std::collections::HashSet;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use sift_config::DedupConfig;
use sift_core::entities::{CandidateRecord, DedupStats};
use sift_screen::{Deduplicator, DuplicateMatch};

use crate::cli::GlobalFlags;
use crate::cli::root_commands::IngestArgs;
use crate::context::AppContext;
use crate::output::output;

#[derive(Debug, Serialize)]
struct IngestResponse {
    read: usize,
    inserted: u64,
    run: DedupStats,
    cumulative: DedupStats,
    duplicates: Vec<DuplicateMatch>,
}

/// Records to store and the dedup counts for one ingest.
#[derive(Debug)]
pub struct IngestPlan {
    pub fresh: Vec<CandidateRecord>,
    pub run: DedupStats,
    pub duplicates: Vec<DuplicateMatch>,
}

/// Deduplicate `incoming` against `existing` and each other.
///
/// Stored records come first and therefore always win. A surviving incoming
/// record whose id is already taken, by a stored record or an earlier line of
/// the same file, is an error: storing it would silently drop a distinct
/// record and leave the flow counts overstated.
pub fn plan_ingest(
    existing: Vec<CandidateRecord>,
    incoming: Vec<CandidateRecord>,
    config: &DedupConfig,
) -> anyhow::Result<IngestPlan> {
    let read = incoming.len() as u64;
    let stored: HashSet<String> = existing.iter().map(|r| r.id.clone()).collect();
    let mut corpus = existing;
    corpus.extend(incoming);

    let outcome = Deduplicator::new(config.clone())?.deduplicate(corpus);

    // Survivors keep input order, so the first holder of a stored id is the
    // stored record itself.
    let mut taken: HashSet<String> = HashSet::new();
    let mut fresh = Vec::new();
    let mut collisions = Vec::new();
    for record in outcome.unique {
        if !taken.insert(record.id.clone()) {
            collisions.push(record.id);
        } else if !stored.contains(&record.id) {
            fresh.push(record);
        }
    }
    if !collisions.is_empty() {
        anyhow::bail!(
            "{} record id(s) already in use by a different record: {}",
            collisions.len(),
            collisions.join(", ")
        );
    }

    let run = DedupStats {
        identified: read,
        exact_duplicates: outcome.stats.exact_duplicates,
        near_duplicates: outcome.stats.near_duplicates,
    };
    if run.unique() != fresh.len() as u64 {
        anyhow::bail!(
            "stored records collapse under the current dedup settings ({} new of {} expected)",
            fresh.len(),
            run.unique()
        );
    }
    Ok(IngestPlan { fresh, run, duplicates: outcome.duplicates })
}

/// Handle `sift ingest`.
///
/// Dedup statistics accumulate across ingests so the flow counts cover every
/// file ever read.
pub async fn handle(
    args: &IngestArgs,
    ctx: &mut AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let incoming = read_records(&args.path)?;
    let read = incoming.len();

    let existing = ctx.service.list_records().await?;
    let plan = plan_ingest(existing, incoming, &ctx.config.dedup)?;
    let inserted = ctx.service.insert_records(&plan.fresh).await?;
    if inserted != plan.fresh.len() as u64 {
        anyhow::bail!(
            "stored {inserted} of {} new records; dedup statistics were not updated",
            plan.fresh.len()
        );
    }

    let previous = ctx
        .service
        .latest_dedup_stats()
        .await?
        .map(|run| run.stats)
        .unwrap_or_default();
    let run = plan.run;
    let cumulative = DedupStats {
        identified: previous.identified + run.identified,
        exact_duplicates: previous.exact_duplicates + run.exact_duplicates,
        near_duplicates: previous.near_duplicates + run.near_duplicates,
    };
    ctx.service.record_dedup_stats(&cumulative).await?;

    tracing::info!(read, inserted, duplicates = run.duplicates(), "ingest: stored records");
    output(
        &IngestResponse { read, inserted, run, cumulative, duplicates: plan.duplicates },
        flags.format,
    )
}

/// Parse one `CandidateRecord` per line.
pub fn read_records(path: &Path) -> anyhow::Result<Vec<CandidateRecord>> {
    let lines = serde_jsonlines::json_lines::<CandidateRecord, _>(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    lines
        .enumerate()
        .map(|(index, record)| {
            record.with_context(|| {
                format!("{}: invalid record on line {}", path.display(), index + 1)
            })
        })
        .collect()
}
