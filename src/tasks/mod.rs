// src/tasks/mod.rs

//! Asset tasks and the context they run in.
//!
//! Every task is an `async fn(&BuildContext) -> anyhow::Result<TaskReport>`:
//! - per-file problems (bad CSS, broken SVG, a bundler syntax error) are sent
//!   to the [`Notifier`] and counted in [`TaskReport::errors`];
//! - path and tooling problems are returned as `Err` and abort the pipeline.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;

use crate::config::{CategoryConfig, ConfigFile};
use crate::errors::AssetpipeError;
use crate::fs::FileSystem;
use crate::notifier::Notifier;
use crate::types::Env;
use crate::watch::patterns::{collect_matching_files, PatternSet};

pub mod clean;
pub mod compress;
pub mod copy;
pub mod images;
pub mod scripts;
pub mod sprite_cache;
pub mod sprites;
pub mod styles;
pub mod svg;
pub mod templates;

pub use sprite_cache::{SharedSpriteCache, SpriteCache, SpriteEntry};

/// Every node a pipeline can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskKind {
    Clean,
    Templates,
    Scripts,
    Styles,
    Images,
    Sprites,
    Watch,
    Serve,
}

impl TaskKind {
    pub const ALL: [TaskKind; 8] = [
        TaskKind::Clean,
        TaskKind::Templates,
        TaskKind::Scripts,
        TaskKind::Styles,
        TaskKind::Images,
        TaskKind::Sprites,
        TaskKind::Watch,
        TaskKind::Serve,
    ];

    /// The five tasks that turn sources into destination files.
    pub const ASSET_TASKS: [TaskKind; 5] = [
        TaskKind::Templates,
        TaskKind::Scripts,
        TaskKind::Styles,
        TaskKind::Images,
        TaskKind::Sprites,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::Clean => "clean",
            TaskKind::Templates => "templates",
            TaskKind::Scripts => "scripts",
            TaskKind::Styles => "styles",
            TaskKind::Images => "images",
            TaskKind::Sprites => "sprites",
            TaskKind::Watch => "watch",
            TaskKind::Serve => "serve",
        }
    }

    /// Long-lived tasks never complete; they report progress once started.
    pub fn is_long_lived(self) -> bool {
        matches!(self, TaskKind::Watch | TaskKind::Serve)
    }

    /// Notification title used for per-file errors.
    pub fn title(self) -> &'static str {
        match self {
            TaskKind::Clean => "Clean",
            TaskKind::Templates => "Templates",
            TaskKind::Scripts => "Scripts",
            TaskKind::Styles => "Styles",
            TaskKind::Images => "Images",
            TaskKind::Sprites => "Sprites",
            TaskKind::Watch => "Watch",
            TaskKind::Serve => "Serve",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = AssetpipeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        TaskKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| AssetpipeError::TaskNotFound(s.to_string()))
    }
}

/// Everything a task needs, created once per invocation.
///
/// `env` is fixed at construction; `build` creates the context with
/// [`Env::Prod`] before any task runs.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub env: Env,
    pub config: Arc<ConfigFile>,
    pub fs: Arc<dyn FileSystem>,
    pub notifier: Arc<dyn Notifier>,
    pub sprite_cache: SharedSpriteCache,
    /// Asset tasks the source watcher re-runs on change.
    pub watched_tasks: Vec<TaskKind>,
}

impl BuildContext {
    pub fn new(
        env: Env,
        config: Arc<ConfigFile>,
        fs: Arc<dyn FileSystem>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            env,
            config,
            fs,
            notifier,
            sprite_cache: SpriteCache::shared(),
            watched_tasks: TaskKind::ASSET_TASKS.to_vec(),
        }
    }

    pub fn with_watched_tasks(mut self, tasks: Vec<TaskKind>) -> Self {
        self.watched_tasks = tasks;
        self
    }

    /// Share an existing sprite cache (the watcher holds the same handle).
    pub fn with_sprite_cache(mut self, cache: SharedSpriteCache) -> Self {
        self.sprite_cache = cache;
        self
    }

    /// Report a per-file error through the notifier.
    pub fn report_error(&self, kind: TaskKind, message: impl AsRef<str>) {
        self.notifier.notify(kind.title(), message.as_ref());
    }
}

/// Summary of one asset task invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskReport {
    /// Destination files written.
    pub written: usize,
    /// Sources skipped because their destination was up to date.
    pub skipped: usize,
    /// Per-file errors reported through the notifier.
    pub errors: usize,
}

impl TaskReport {
    pub fn merge(&mut self, other: TaskReport) {
        self.written += other.written;
        self.skipped += other.skipped;
        self.errors += other.errors;
    }
}

/// Run one finite task to completion.
///
/// `watch` and `serve` are long-lived and handled by the executor directly.
pub async fn run_task(kind: TaskKind, ctx: &BuildContext) -> Result<TaskReport> {
    match kind {
        TaskKind::Clean => clean::run(ctx).await,
        TaskKind::Templates => templates::run(ctx).await,
        TaskKind::Scripts => scripts::run(ctx).await,
        TaskKind::Styles => styles::run(ctx).await,
        TaskKind::Images => images::run(ctx).await,
        TaskKind::Sprites => sprites::run(ctx).await,
        TaskKind::Watch | TaskKind::Serve => {
            anyhow::bail!("task '{kind}' is long-lived and cannot be run to completion")
        }
    }
}

/// Destination of `file` when copied from `category`, preserving the
/// structure below the category's base directory.
pub fn destination_for(cfg: &ConfigFile, category: &CategoryConfig, file: &Path) -> Result<PathBuf> {
    let base = cfg.category_base(category);
    let rel = file.strip_prefix(&base).map_err(|_| {
        anyhow::anyhow!(
            "{} is not below the category base {}",
            file.display(),
            base.display()
        )
    })?;
    Ok(cfg.category_dst(category).join(rel))
}

/// The configured `src` directory; its absence is a fatal path error.
pub fn existing_src_dir(ctx: &BuildContext) -> Result<PathBuf> {
    let src_dir = ctx.config.src_dir();
    if !ctx.fs.is_dir(&src_dir) {
        return Err(AssetpipeError::MissingSource(src_dir).into());
    }
    Ok(src_dir)
}

/// Source files of `category`, sorted.
pub fn matching_sources(ctx: &BuildContext, category: &CategoryConfig) -> Result<Vec<PathBuf>> {
    let src_dir = existing_src_dir(ctx)?;
    let patterns: Vec<&str> = category.src.iter().collect();
    let set = PatternSet::new(&patterns)?;
    collect_matching_files(ctx.fs.as_ref(), &src_dir, &set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RawConfigFile;

    fn cfg() -> ConfigFile {
        ConfigFile::try_from(RawConfigFile {
            root: "/proj".into(),
            ..RawConfigFile::default()
        })
        .unwrap()
    }

    #[test]
    fn task_names_round_trip() {
        for kind in TaskKind::ALL {
            assert_eq!(kind.as_str().parse::<TaskKind>().unwrap(), kind);
        }
        assert!("setProd".parse::<TaskKind>().is_err());
    }

    #[test]
    fn only_watch_and_serve_are_long_lived() {
        let long_lived: Vec<_> = TaskKind::ALL.into_iter().filter(|k| k.is_long_lived()).collect();
        assert_eq!(long_lived, vec![TaskKind::Watch, TaskKind::Serve]);
    }

    #[test]
    fn destination_preserves_structure_below_base() {
        let cfg = cfg();
        let file = Path::new("/proj/src/images/icons/logo.png");
        let dst = destination_for(&cfg, &cfg.images.paths, file).unwrap();
        assert_eq!(dst, PathBuf::from("/proj/dist/images/icons/logo.png"));
    }

    #[test]
    fn destination_outside_base_is_an_error() {
        let cfg = cfg();
        let file = Path::new("/elsewhere/logo.png");
        assert!(destination_for(&cfg, &cfg.images.paths, file).is_err());
    }

    #[test]
    fn report_merge_adds_counts() {
        let mut a = TaskReport { written: 1, skipped: 2, errors: 0 };
        a.merge(TaskReport { written: 3, skipped: 0, errors: 1 });
        assert_eq!(a, TaskReport { written: 4, skipped: 2, errors: 1 });
    }
}
