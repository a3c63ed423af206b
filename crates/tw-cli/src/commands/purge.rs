use serde_json::json;

use crate::cli::GlobalFlags;
use crate::context::AppContext;
use crate::output::output;

pub async fn handle(ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let removed = ctx.cycle.purge_expired().await?;
    output(&json!({ "removed": removed }), flags.format)
}
