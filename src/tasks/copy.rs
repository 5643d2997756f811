// src/tasks/copy.rs

//! Staleness-checked copying shared by the templates and images tasks.

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::trace;

use crate::config::CategoryConfig;
use crate::fs::FileSystem;
use crate::tasks::{destination_for, matching_sources, BuildContext, TaskReport};

/// A source whose destination is missing or older than the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCopy {
    pub src: PathBuf,
    pub dst: PathBuf,
}

/// True when `dst` exists and is at least as new as `src`.
pub fn is_up_to_date(fs: &dyn FileSystem, src: &Path, dst: &Path) -> Result<bool> {
    if !fs.is_file(dst) {
        return Ok(false);
    }
    Ok(fs.modified(dst)? >= fs.modified(src)?)
}

/// Matched sources of `category` that need copying; up-to-date ones are
/// counted in `report.skipped`.
pub fn pending_copies(
    ctx: &BuildContext,
    category: &CategoryConfig,
    report: &mut TaskReport,
) -> Result<Vec<PendingCopy>> {
    let mut pending = Vec::new();
    for src in matching_sources(ctx, category)? {
        let dst = destination_for(&ctx.config, category, &src)?;
        if is_up_to_date(ctx.fs.as_ref(), &src, &dst)? {
            trace!(path = %src.display(), "destination up to date");
            report.skipped += 1;
        } else {
            pending.push(PendingCopy { src, dst });
        }
    }
    Ok(pending)
}

/// Copy every stale file of `category` unchanged.
pub fn copy_category(ctx: &BuildContext, category: &CategoryConfig) -> Result<TaskReport> {
    let mut report = TaskReport::default();
    for copy in pending_copies(ctx, category, &mut report)? {
        let bytes = ctx.fs.read(&copy.src)?;
        ctx.fs.write(&copy.dst, &bytes)?;
        report.written += 1;
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn missing_destination_is_stale() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/a.html", "a");
        assert!(!is_up_to_date(&fs, Path::new("/p/src/a.html"), Path::new("/p/dist/a.html")).unwrap());
    }

    #[test]
    fn newer_source_is_stale_again() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/a.html", "a");
        fs.add_file("/p/dist/a.html", "a");
        let (src, dst) = (Path::new("/p/src/a.html"), Path::new("/p/dist/a.html"));
        assert!(is_up_to_date(&fs, src, dst).unwrap());
        fs.touch(src);
        assert!(!is_up_to_date(&fs, src, dst).unwrap());
    }
}
