use crate::cli::GlobalFlags;
use crate::cli::root_commands::Commands;
use crate::commands;
use crate::context::AppContext;

/// Dispatch a parsed command to its handler.
pub async fn dispatch(
    command: Commands,
    ctx: &mut AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match command {
        Commands::Ingest(args) => commands::ingest::handle(&args, ctx, flags).await,
        Commands::Prefilter(args) => commands::prefilter::handle(&args, ctx, flags).await,
        Commands::Reliability(args) => commands::reliability::handle(&args, ctx, flags).await,
        Commands::Flow(args) => commands::flow::handle(&args, ctx, flags).await,
        Commands::Decisions(args) => commands::decisions::handle(&args, ctx, flags).await,
    }
}
