use sift_core::entities::Decision;
use sift_core::enums::Stage;
use sift_db::SiftService;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::DecisionsArgs;
use crate::context::AppContext;
use crate::output::output;

/// Handle `sift decisions`: the audit ledger for a stage, oldest first.
pub async fn handle(
    args: &DecisionsArgs,
    ctx: &mut AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let stage = Stage::from(args.stage);
    let ledger = load_ledger(&ctx.service, args.record.as_deref(), stage, args.from_trail).await?;
    if ledger.is_empty() {
        tracing::warn!(record = ?args.record, %stage, "decisions: no ledger entries");
    }
    output(&ledger, flags.format)
}

/// Decisions for a stage from the database ledger or its JSONL mirror,
/// narrowed to one record when given.
pub async fn load_ledger(
    service: &SiftService,
    record: Option<&str>,
    stage: Stage,
    from_trail: bool,
) -> anyhow::Result<Vec<Decision>> {
    if from_trail {
        if !service.trail().is_enabled() {
            anyhow::bail!("the decision trail is disabled; set store.trail_dir to enable it");
        }
        let mut ledger = service.trail().read_stage(stage)?;
        if let Some(record) = record {
            ledger.retain(|d| d.record_id == record);
        }
        return Ok(ledger);
    }

    let ledger = match record {
        Some(record) => service.query_decisions(record, stage).await?,
        None => service.query_stage_decisions(stage).await?,
    };
    Ok(ledger)
}
