// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `assetpipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetpipe",
    version,
    about = "Build scripts, styles, templates, images and SVG sprites from src into dist.",
    long_about = None
)]
pub struct CliArgs {
    /// Task to run. Defaults to `default` (build once, then watch + serve).
    #[arg(value_enum, default_value_t = TaskArg::Default)]
    pub task: TaskArg,

    /// Path to the config file (TOML).
    ///
    /// When the default file does not exist, built-in defaults are used.
    #[arg(long, value_name = "PATH", default_value = "Assetpipe.toml")]
    pub config: String,

    /// Run single asset tasks in production mode. `build` always does.
    #[arg(long)]
    pub prod: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the pipeline, but don't run any task.
    #[arg(long)]
    pub dry_run: bool,
}

/// Task names accepted on the command line.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum TaskArg {
    Default,
    Build,
    Clean,
    Watch,
    Serve,
    Scripts,
    Styles,
    Templates,
    Images,
    Sprites,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
