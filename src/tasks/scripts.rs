// src/tasks/scripts.rs

//! Script bundling through an external bundler (esbuild by default).
//!
//! Every `js.src` entry is bundled by its own bundler process; all entries
//! run concurrently and the task finishes once every process has exited.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::Command;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::config::ScriptsConfig;
use crate::errors::AssetpipeError;
use crate::tasks::{existing_src_dir, BuildContext, TaskKind, TaskReport};
use crate::types::Env;

/// Full command line for bundling one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleCommand {
    pub program: String,
    pub args: Vec<String>,
    pub entry: PathBuf,
}

/// Result of one bundler process that could be started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleOutcome {
    Written(PathBuf),
    /// Non-zero exit; carries the bundler's diagnostics.
    Failed { entry: PathBuf, message: String },
}

impl BundleCommand {
    pub fn new(js: &ScriptsConfig, env: Env, entry: &Path, outfile: &Path) -> Self {
        let mut args = js.args.clone();
        args.extend(match env {
            Env::Dev => js.dev_args.iter().cloned(),
            Env::Prod => js.prod_args.iter().cloned(),
        });
        args.push(entry.to_string_lossy().into_owned());
        args.push(format!("{}={}", js.outfile_flag, outfile.display()));
        Self {
            program: js.bundler.clone(),
            args,
            entry: entry.to_path_buf(),
        }
    }

    pub async fn run(self, outfile: PathBuf) -> Result<BundleOutcome> {
        debug!(program = %self.program, args = ?self.args, "starting bundler");
        let output = match Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
        {
            Ok(output) => output,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(AssetpipeError::MissingTool(self.program).into());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("running bundler {}", self.program));
            }
        };

        if output.status.success() {
            return Ok(BundleOutcome::Written(outfile));
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let message = if stderr.is_empty() {
            format!("{} exited with {}", self.program, output.status)
        } else {
            stderr
        };
        Ok(BundleOutcome::Failed {
            entry: self.entry,
            message,
        })
    }
}

pub async fn run(ctx: &BuildContext) -> Result<TaskReport> {
    let cfg = &ctx.config;
    let src_dir = existing_src_dir(ctx)?;
    let out_dir = cfg.category_dst(&cfg.js.paths);

    let mut jobs = JoinSet::new();
    for entry in cfg.js.paths.src.iter() {
        let source = src_dir.join(entry);
        if !ctx.fs.is_file(&source) {
            return Err(AssetpipeError::MissingSource(source).into());
        }
        let name = source
            .file_name()
            .with_context(|| format!("script entry {entry} has no file name"))?;
        let outfile = out_dir.join(name);
        let command = BundleCommand::new(&cfg.js, ctx.env, &source, &outfile);
        jobs.spawn(command.run(outfile));
    }

    let mut report = TaskReport::default();
    while let Some(joined) = jobs.join_next().await {
        match joined.context("bundler job panicked")?? {
            BundleOutcome::Written(path) => {
                debug!(path = %path.display(), "bundle written");
                report.written += 1;
            }
            BundleOutcome::Failed { entry, message } => {
                ctx.report_error(TaskKind::Scripts, format!("{}: {message}", entry.display()));
                report.errors += 1;
            }
        }
    }

    info!(?report, env = %ctx.env, "scripts bundled");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RawConfigFile;

    #[test]
    fn dev_command_line_uses_dev_args_and_outfile_flag() {
        let js = RawConfigFile::default().js;
        let cmd = BundleCommand::new(
            &js,
            Env::Dev,
            Path::new("/p/src/js/scripts.js"),
            Path::new("/p/dist/js/scripts.js"),
        );
        assert_eq!(cmd.program, "esbuild");
        assert_eq!(
            cmd.args,
            vec![
                "--bundle",
                "--target=es2015",
                "--loader:.js=jsx",
                "--sourcemap=inline",
                "/p/src/js/scripts.js",
                "--outfile=/p/dist/js/scripts.js",
            ]
        );
    }

    #[test]
    fn prod_command_line_minifies() {
        let js = RawConfigFile::default().js;
        let cmd = BundleCommand::new(&js, Env::Prod, Path::new("a.js"), Path::new("out/a.js"));
        assert!(cmd.args.contains(&"--minify".to_string()));
        assert!(!cmd.args.contains(&"--sourcemap=inline".to_string()));
    }

    #[tokio::test]
    async fn missing_program_is_a_missing_tool() {
        let cmd = BundleCommand {
            program: "assetpipe-no-such-bundler".into(),
            args: Vec::new(),
            entry: PathBuf::from("a.js"),
        };
        let err = cmd.run(PathBuf::from("out.js")).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AssetpipeError>(),
            Some(AssetpipeError::MissingTool(_))
        ));
    }
}
