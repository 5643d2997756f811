// src/tasks/styles.rs

//! Stylesheet pipeline built on lightningcss.
//!
//! For every `css.src` entry the matching files are bundled (`@import`
//! resolved), concatenated, then parsed again as one sheet and transformed
//! for the configured browsers. Nesting is flattened whenever a target
//! browser lacks native support.

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, LazyLock};

use anyhow::{anyhow, Context, Result};
use base64::Engine;
use lightningcss::bundler::{Bundler, ResolveResult, SourceProvider};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use parcel_sourcemap::SourceMap;
use regex::Regex;
use tracing::{debug, info};

use crate::errors::AssetpipeError;
use crate::fs::FileSystem;
use crate::tasks::{existing_src_dir, BuildContext, TaskKind, TaskReport};
use crate::types::Env;
use crate::watch::patterns::{collect_matching_files, PatternSet};

static LEADING_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(/\*[\s\S]*?\*/)").expect("static comment pattern"));

/// One configured entry: the files it concatenates and its output path.
#[derive(Debug, Clone)]
struct StyleEntry {
    pattern: String,
    files: Vec<PathBuf>,
    output: PathBuf,
}

/// Stylesheet sources read through the task's [`FileSystem`].
///
/// Every `*.css` file below the source directory is loaded up front, so
/// `@import`s resolve against the same filesystem the task writes to.
#[derive(Debug, Default)]
pub struct StyleSources {
    files: HashMap<PathBuf, String>,
}

impl StyleSources {
    pub fn load(fs: &dyn FileSystem, src_dir: &Path) -> Result<Self> {
        let set = PatternSet::new(&["**/*.css"])?;
        let mut files = HashMap::new();
        for path in collect_matching_files(fs, src_dir, &set)? {
            let text = fs.read_to_string(&path)?;
            files.insert(normalize(&path), text);
        }
        Ok(Self { files })
    }

    fn get(&self, path: &Path) -> Option<&str> {
        self.files.get(&normalize(path)).map(String::as_str)
    }
}

impl SourceProvider for StyleSources {
    type Error = io::Error;

    fn read<'a>(&'a self, file: &Path) -> std::result::Result<&'a str, Self::Error> {
        self.get(file).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("stylesheet {} not found", file.display()),
            )
        })
    }

    fn resolve(
        &self,
        specifier: &str,
        originating_file: &Path,
    ) -> std::result::Result<ResolveResult, Self::Error> {
        Ok(normalize(&originating_file.with_file_name(specifier)).into())
    }
}

/// Resolve `.` and `..` without touching the disk.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

pub async fn run(ctx: &BuildContext) -> Result<TaskReport> {
    let cfg = &ctx.config;
    let src_dir = existing_src_dir(ctx)?;
    let dst_dir = cfg.category_dst(&cfg.css.paths);
    let mut report = TaskReport::default();

    let mut entries = Vec::new();
    for pattern in cfg.css.paths.src.iter() {
        entries.push(resolve_entry(ctx, &src_dir, &dst_dir, pattern)?);
    }

    let fs = Arc::clone(&ctx.fs);
    let root = src_dir.clone();
    let sources = tokio::task::spawn_blocking(move || StyleSources::load(fs.as_ref(), &root))
        .await
        .context("styles worker panicked")??;
    let sources = Arc::new(sources);

    for entry in entries {
        let sources = Arc::clone(&sources);
        let browsers = cfg.css.browsers.clone();
        let env = ctx.env;
        let files = entry.files.clone();
        let name = output_name(&entry.pattern).to_string();

        let compiled =
            tokio::task::spawn_blocking(move || compile(&sources, &files, &name, &browsers, env))
                .await
                .context("styles worker panicked")?;

        match compiled {
            Ok(css) => {
                ctx.fs.write(&entry.output, css.as_bytes())?;
                debug!(entry = %entry.pattern, path = %entry.output.display(), "stylesheet written");
                report.written += 1;
            }
            Err(err) => {
                ctx.report_error(TaskKind::Styles, format!("{}: {err:#}", entry.pattern));
                report.errors += 1;
            }
        }
    }

    info!(?report, env = %ctx.env, "styles compiled");
    Ok(report)
}

fn resolve_entry(
    ctx: &BuildContext,
    src_dir: &Path,
    dst_dir: &Path,
    pattern: &str,
) -> Result<StyleEntry> {
    let set = PatternSet::new(&[pattern])?;
    let files = collect_matching_files(ctx.fs.as_ref(), src_dir, &set)?;
    if files.is_empty() {
        return Err(AssetpipeError::MissingSource(src_dir.join(pattern)).into());
    }
    Ok(StyleEntry {
        pattern: pattern.to_string(),
        files,
        output: dst_dir.join(output_name(pattern)),
    })
}

/// Last path segment of an entry pattern (`css/style.css` → `style.css`).
pub fn output_name(pattern: &str) -> &str {
    pattern.rsplit('/').next().unwrap_or(pattern)
}

fn targets_for(query: &str) -> Result<Targets> {
    let browsers = Browsers::from_browserslist([query])
        .map_err(|e| anyhow!("invalid browsers query '{query}': {e}"))?;
    Ok(Targets {
        browsers,
        ..Targets::default()
    })
}

/// Bundle, concatenate and transform `files` into one stylesheet.
pub fn compile(
    sources: &StyleSources,
    files: &[PathBuf],
    name: &str,
    browsers: &str,
    env: Env,
) -> Result<String> {
    let Some(first_file) = files.first() else {
        return Err(anyhow!("no stylesheet files to compile for {name}"));
    };
    let mut parts = Vec::with_capacity(files.len());
    for file in files {
        parts.push(bundle_file(sources, file)?);
    }
    let joined = parts.join("\n");

    let mut sheet = StyleSheet::parse(
        &joined,
        ParserOptions {
            filename: name.to_string(),
            ..ParserOptions::default()
        },
    )
    .map_err(|e| anyhow!("{e}"))?;

    sheet
        .minify(MinifyOptions {
            targets: targets_for(browsers)?,
            ..MinifyOptions::default()
        })
        .map_err(|e| anyhow!("{e}"))?;

    match env {
        Env::Dev => {
            let mut map = SourceMap::new("/");
            map.add_source(name);
            map.set_source_content(0, &joined)
                .map_err(|e| anyhow!("source map: {e:?}"))?;

            let css = sheet
                .to_css(PrinterOptions {
                    minify: false,
                    source_map: Some(&mut map),
                    targets: targets_for(browsers)?,
                    ..PrinterOptions::default()
                })
                .map_err(|e| anyhow!("{e}"))?;

            let json = map
                .to_json(None)
                .map_err(|e| anyhow!("source map: {e:?}"))?;
            let encoded = base64::engine::general_purpose::STANDARD.encode(json);
            Ok(format!(
                "{}\n/*# sourceMappingURL=data:application/json;base64,{} */\n",
                css.code.trim_end(),
                encoded
            ))
        }
        Env::Prod => {
            // Only the first comment block of the first file survives.
            sheet.license_comments.clear();
            let css = sheet
                .to_css(PrinterOptions {
                    minify: true,
                    targets: targets_for(browsers)?,
                    ..PrinterOptions::default()
                })
                .map_err(|e| anyhow!("{e}"))?;

            let first = sources
                .get(first_file)
                .with_context(|| format!("{} was not loaded", first_file.display()))?;
            Ok(keep_first_comment(first, css.code))
        }
    }
}

fn bundle_file(sources: &StyleSources, file: &Path) -> Result<String> {
    let mut bundler = Bundler::new(sources, None, ParserOptions::default());
    let sheet = bundler
        .bundle(file)
        .map_err(|e| anyhow!("{}: {e}", file.display()))?;
    let css = sheet
        .to_css(PrinterOptions::default())
        .map_err(|e| anyhow!("{}: {e}", file.display()))?;
    Ok(css.code)
}

/// Prepend the leading comment block of `source` (e.g. a license header)
/// unless the minified output already carries it.
pub fn keep_first_comment(source: &str, minified: String) -> String {
    match LEADING_COMMENT.captures(source) {
        Some(caps) if !minified.contains(&caps[1]) => format!("{}\n{}", &caps[1], minified),
        _ => minified,
    }
}
