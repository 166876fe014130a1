use serde::Serialize;
use sift_report::{FlowCounts, FlowInputs, FlowValidation, collect_flow, validate};

use crate::cli::GlobalFlags;
use crate::cli::root_commands::FlowArgs;
use crate::context::AppContext;
use crate::output::output;

#[derive(Debug, Serialize)]
struct FlowResponse {
    counts: FlowCounts,
    validation: FlowValidation,
}

/// Handle `sift flow`. Exits non-zero when validation finds hard errors.
pub async fn handle(
    args: &FlowArgs,
    ctx: &mut AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let dedup = ctx
        .service
        .latest_dedup_stats()
        .await?
        .map(|run| run.stats)
        .unwrap_or_default();
    let inputs = FlowInputs {
        dedup,
        not_retrieved: args.not_retrieved,
        quantitative: args.quantitative,
    };

    let mut counts = collect_flow(&ctx.service, &inputs).await?;
    let validation = validate(&mut counts);
    let failed = validation.has_hard_errors();
    output(&FlowResponse { counts, validation }, flags.format)?;

    if failed {
        anyhow::bail!("flow counts failed validation");
    }
    Ok(())
}
