use crate::cli::GlobalFlags;
use crate::cli::root_commands::Commands;
use crate::commands;
use crate::context::AppContext;

/// Dispatch a parsed command to the corresponding handler module.
pub async fn dispatch(command: Commands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    match command {
        Commands::Run(args) => commands::run::handle(&args, ctx, flags).await,
        Commands::Trends(args) => commands::trends::handle(&args, ctx, flags).await,
        Commands::Queue(args) => commands::queue::list(&args, ctx, flags).await,
        Commands::Send(args) => commands::queue::send(&args, ctx, flags).await,
        Commands::Dismiss(args) => commands::queue::dismiss(&args, ctx, flags).await,
        Commands::Purge => commands::purge::handle(ctx, flags).await,
    }
}
