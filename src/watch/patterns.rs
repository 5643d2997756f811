// src/watch/patterns.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::ConfigFile;
use crate::engine::TaskName;
use crate::fs::FileSystem;
use crate::tasks::TaskKind;
use crate::types::Env;

/// Compiled include/exclude glob patterns.
///
/// Patterns are relative to some root directory; callers pass relative paths
/// with forward slashes (e.g. `"css/style.css"`) into [`PatternSet::matches`].
#[derive(Clone)]
pub struct PatternSet {
    include: GlobSet,
    exclude: Option<GlobSet>,
}

impl fmt::Debug for PatternSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternSet")
            .field("include", &self.include.len())
            .finish_non_exhaustive()
    }
}

impl PatternSet {
    pub fn new<S: AsRef<str>>(include: &[S]) -> Result<Self> {
        Ok(Self {
            include: build_globset(include)?,
            exclude: None,
        })
    }

    pub fn with_exclude<S: AsRef<str>>(mut self, exclude: &[S]) -> Result<Self> {
        if !exclude.is_empty() {
            self.exclude = Some(build_globset(exclude)?);
        }
        Ok(self)
    }

    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.include.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }
}

/// Watch patterns for one asset task.
#[derive(Clone)]
pub struct TaskWatchProfile {
    kind: TaskKind,
    name: TaskName,
    patterns: PatternSet,
}

impl fmt::Debug for TaskWatchProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskWatchProfile")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl TaskWatchProfile {
    pub fn new<S: AsRef<str>>(kind: TaskKind, patterns: &[S]) -> Result<Self> {
        let patterns = PatternSet::new(patterns)
            .with_context(|| format!("building watch globset for task {}", kind))?;
        Ok(Self {
            kind,
            name: kind.as_str().to_string(),
            patterns,
        })
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Name of the task this profile re-invokes.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if this task is interested in the given path (relative
    /// to the source root), e.g. `"css/partials/_vars.css"`.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.patterns.matches(rel_path)
    }
}

/// Build one watch profile per asset category.
///
/// - `styles`: `css.watch`
/// - `sprites`: `sprites.src`
/// - `images`: `images.watch` plus the generic `files` patterns
/// - `templates`: `templates.watch`
/// - `scripts`: `js.watch`, only in dev mode, where it stands in for an
///   incremental bundler that stays resident.
pub fn build_profiles_from_config(cfg: &ConfigFile, env: Env) -> Result<Vec<TaskWatchProfile>> {
    let mut images = cfg.images.paths.watch_patterns();
    images.extend(cfg.files.watch_patterns());

    let mut profiles = vec![
        TaskWatchProfile::new(TaskKind::Styles, &cfg.css.paths.watch_patterns())?,
        TaskWatchProfile::new(TaskKind::Sprites, &cfg.sprites.paths.watch_patterns())?,
        TaskWatchProfile::new(TaskKind::Images, &images)?,
        TaskWatchProfile::new(TaskKind::Templates, &cfg.templates.watch_patterns())?,
    ];

    if env.is_dev() {
        profiles.push(TaskWatchProfile::new(
            TaskKind::Scripts,
            &cfg.js.paths.watch_patterns(),
        )?);
    }

    Ok(profiles)
}

/// Build a GlobSet from simple string patterns.
fn build_globset<S: AsRef<str>>(patterns: &[S]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let pat = pat.as_ref();
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Collect all files under `root` whose root-relative path matches `patterns`.
///
/// The result is sorted so that concatenation and sprite order are stable.
pub fn collect_matching_files(
    fs: &dyn FileSystem,
    root: &Path,
    patterns: &PatternSet,
) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                stack.push(path);
            } else if fs.is_file(&path) {
                if let Ok(rel) = path.strip_prefix(root) {
                    let rel_str = rel.to_string_lossy().replace('\\', "/");
                    if patterns.matches(&rel_str) {
                        files.push(path);
                    }
                }
            }
        }
    }

    files.sort();
    Ok(files)
}
