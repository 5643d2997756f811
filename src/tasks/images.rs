// src/tasks/images.rs

//! Images and generic files.
//!
//! Both categories are copied with the staleness check; only images are
//! optimised. In production PNG/JPEG go through the remote compression
//! service when a key is configured.

use anyhow::Result;
use tracing::{info, warn};

use crate::tasks::compress::{optimize_locally, ImageKind, RemoteCompressor};
use crate::tasks::copy::{copy_category, pending_copies};
use crate::tasks::{BuildContext, TaskKind, TaskReport};

pub async fn run(ctx: &BuildContext) -> Result<TaskReport> {
    let mut report = copy_category(ctx, &ctx.config.files)?;
    report.merge(copy_images(ctx).await?);
    info!(?report, "images and files copied");
    Ok(report)
}

async fn copy_images(ctx: &BuildContext) -> Result<TaskReport> {
    let mut report = TaskReport::default();
    let pending = pending_copies(ctx, &ctx.config.images.paths, &mut report)?;
    if pending.is_empty() {
        return Ok(report);
    }

    let remote = remote_compressor(ctx);
    for copy in pending {
        let bytes = ctx.fs.read(&copy.src)?;
        let kind = ImageKind::from_path(&copy.src);
        let out = match optimize(remote.as_ref(), kind, bytes.clone()).await {
            Ok(out) => out,
            Err(err) => {
                ctx.report_error(TaskKind::Images, format!("{}: {err:#}", copy.src.display()));
                report.errors += 1;
                bytes
            }
        };
        ctx.fs.write(&copy.dst, &out)?;
        report.written += 1;
    }
    Ok(report)
}

fn remote_compressor(ctx: &BuildContext) -> Option<RemoteCompressor> {
    if !ctx.env.is_prod() {
        return None;
    }
    let images = &ctx.config.images;
    match images.effective_compression_key() {
        Some(key) => Some(RemoteCompressor::new(images.compression_endpoint.clone(), key)),
        None => {
            warn!("no image compression key configured; optimising locally");
            None
        }
    }
}

async fn optimize(
    remote: Option<&RemoteCompressor>,
    kind: ImageKind,
    bytes: Vec<u8>,
) -> Result<Vec<u8>> {
    match remote {
        Some(remote) if kind.is_remote_compressible() => remote.compress(bytes).await,
        _ => optimize_locally(kind, bytes),
    }
}
