// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssetpipeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Cycle detected in pipeline: {0}")]
    DagCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// A configured source path or pattern resolved to nothing.
    #[error("Missing source: {0:?}")]
    MissingSource(PathBuf),

    /// An external program a task depends on could not be started.
    #[error("Missing tool '{0}' (is it installed and on PATH?)")]
    MissingTool(String),

    /// A task failed fatally and the whole pipeline was aborted.
    #[error("Task '{task}' failed: {reason}")]
    TaskFailed { task: String, reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AssetpipeError>;
