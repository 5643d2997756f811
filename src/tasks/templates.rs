// src/tasks/templates.rs

use anyhow::Result;
use tracing::info;

use crate::tasks::copy::copy_category;
use crate::tasks::{BuildContext, TaskReport};

/// Copy markup, data files and `.htaccess` into the destination tree.
pub async fn run(ctx: &BuildContext) -> Result<TaskReport> {
    let report = copy_category(ctx, &ctx.config.templates)?;
    info!(?report, "templates copied");
    Ok(report)
}
