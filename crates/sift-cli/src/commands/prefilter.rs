use serde::Serialize;
use sift_core::enums::{ExclusionReason, PrefilterPolicy, Stage};
use sift_screen::{Prefilter, persist_prefilter_exclusions};

use crate::cli::GlobalFlags;
use crate::cli::root_commands::PrefilterArgs;
use crate::context::AppContext;
use crate::output::output;

#[derive(Debug, Serialize)]
struct ExcludedRow {
    record_id: String,
    reason: ExclusionReason,
    score: f64,
    detail: String,
}

#[derive(Debug, Serialize)]
struct PrefilterResponse {
    stage: Stage,
    policy: PrefilterPolicy,
    considered: usize,
    forwarded: usize,
    excluded: Vec<ExcludedRow>,
    recorded: usize,
    dry_run: bool,
}

/// Handle `sift prefilter`.
pub async fn handle(
    args: &PrefilterArgs,
    ctx: &mut AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let stage = Stage::from(args.stage);
    let prefilter = Prefilter::from_config(&ctx.config.prefilter)?;

    let pending = ctx.service.list_unscreened_records(stage).await?;
    let considered = pending.len();
    let partition = prefilter.partition(pending);

    let recorded = if args.dry_run {
        0
    } else {
        persist_prefilter_exclusions(&ctx.service, stage, &partition.excluded).await?
    };

    let excluded = partition
        .excluded
        .into_iter()
        .map(|(record, exclusion)| ExcludedRow {
            record_id: record.id,
            reason: exclusion.reason,
            score: exclusion.score,
            detail: exclusion.detail,
        })
        .collect();

    output(
        &PrefilterResponse {
            stage,
            policy: prefilter.policy(),
            considered,
            forwarded: partition.forwarded.len(),
            excluded,
            recorded,
            dry_run: args.dry_run,
        },
        flags.format,
    )
}
