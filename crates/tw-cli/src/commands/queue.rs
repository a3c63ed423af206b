use anyhow::Context;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::{KeyArgs, QueueArgs};
use crate::context::AppContext;
use crate::output::output;

pub async fn list(args: &QueueArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let limit = args.limit.unwrap_or(ctx.default_limit);
    let entries = ctx.cycle.peek(args.status.into(), limit).await?;
    output(&entries, flags.format)
}

pub async fn send(args: &KeyArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let entry = ctx
        .cycle
        .mark_sent(&args.key)
        .await
        .with_context(|| format!("failed to mark '{}' as sent", args.key))?;
    output(&entry, flags.format)
}

pub async fn dismiss(args: &KeyArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let entry = ctx
        .cycle
        .dismiss(&args.key)
        .await
        .with_context(|| format!("failed to dismiss '{}'", args.key))?;
    output(&entry, flags.format)
}
