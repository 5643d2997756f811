// src/tasks/clean.rs

use anyhow::{Context, Result};
use tracing::info;

use crate::tasks::{BuildContext, TaskReport};

/// Remove the whole destination tree.
pub async fn run(ctx: &BuildContext) -> Result<TaskReport> {
    let dst = ctx.config.dst_dir();
    ctx.fs
        .remove_dir_all(&dst)
        .with_context(|| format!("removing {}", dst.display()))?;
    info!(path = %dst.display(), "destination cleaned");
    Ok(TaskReport::default())
}
