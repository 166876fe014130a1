use sift_core::enums::Stage;
use sift_core::store::ScreeningStore;
use sift_report::{disagreements, reliability};

use crate::cli::{GlobalFlags, OutputFormat};
use crate::cli::root_commands::ReliabilityArgs;
use crate::context::AppContext;
use crate::output::output;

/// Handle `sift reliability`.
pub async fn handle(
    args: &ReliabilityArgs,
    ctx: &mut AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let stage = Stage::from(args.stage);
    let outcomes = ctx.service.list_outcomes(stage).await?;
    let report = reliability(stage, &outcomes);
    output(&report, flags.format)?;

    if args.disagreements {
        let listing = disagreements(&ctx.service, stage).await?;
        match flags.format {
            OutputFormat::Table => println!("\n{}", listing.render_markdown()),
            OutputFormat::Json => output(&listing, flags.format)?,
        }
    }
    Ok(())
}
