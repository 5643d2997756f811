// src/config/mod.rs

//! Configuration loading and validation for assetpipe.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate paths and patterns (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_or_default};
pub use model::{
    CategoryConfig, ConfigFile, ImagesConfig, NotifySection, Patterns, RawConfigFile,
    RuntimeSection, ScriptsConfig, ServeSection, SpritesConfig, StylesConfig,
};
pub use validate::validate_config;
