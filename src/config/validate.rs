// src/config/validate.rs

use std::path::{Component, Path};

use globset::Glob;

use crate::config::model::{trim_slashes, CategoryConfig, ConfigFile, RawConfigFile};
use crate::errors::{AssetpipeError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = AssetpipeError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

/// Run every semantic check on a raw config.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    validate_roots(cfg)?;
    for (name, category) in categories(cfg) {
        validate_category(name, category)?;
    }
    validate_runtime(cfg)?;
    Ok(())
}

fn categories(cfg: &RawConfigFile) -> [(&'static str, &CategoryConfig); 6] {
    [
        ("images", &cfg.images.paths),
        ("files", &cfg.files),
        ("templates", &cfg.templates),
        ("js", &cfg.js.paths),
        ("css", &cfg.css.paths),
        ("sprites", &cfg.sprites.paths),
    ]
}

fn validate_roots(cfg: &RawConfigFile) -> Result<()> {
    let src = trim_slashes(&cfg.src);
    let dst = trim_slashes(&cfg.dst);

    if dst.is_empty() {
        return Err(AssetpipeError::ConfigError(
            "`dst` must name a directory below `root`".to_string(),
        ));
    }
    // `clean` wipes dst recursively; never let it point at the sources.
    if src == dst || Path::new(src).starts_with(dst) {
        return Err(AssetpipeError::ConfigError(format!(
            "`dst` ({dst}) must not contain `src` ({src})"
        )));
    }
    if escapes(dst) {
        return Err(AssetpipeError::ConfigError(format!(
            "`dst` ({dst}) must stay inside `root`"
        )));
    }
    Ok(())
}

fn validate_category(name: &str, category: &CategoryConfig) -> Result<()> {
    if escapes(trim_slashes(&category.dst)) {
        return Err(AssetpipeError::ConfigError(format!(
            "[{name}].dst ({}) must be a subpath of the global dst",
            category.dst
        )));
    }
    if let Some(base) = &category.base {
        if escapes(trim_slashes(base)) {
            return Err(AssetpipeError::ConfigError(format!(
                "[{name}].base ({base}) must stay inside src"
            )));
        }
    }

    let watch = category.watch_patterns();
    for pattern in category.src.iter().chain(watch.iter().map(String::as_str)) {
        Glob::new(pattern).map_err(|e| {
            AssetpipeError::ConfigError(format!("[{name}] invalid glob pattern '{pattern}': {e}"))
        })?;
    }
    Ok(())
}

fn validate_runtime(cfg: &RawConfigFile) -> Result<()> {
    if cfg.runtime.queue_length == 0 {
        return Err(AssetpipeError::ConfigError(
            "[runtime].queue_length must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

/// True when a relative path is absolute or climbs out via `..`.
fn escapes(rel: &str) -> bool {
    Path::new(rel)
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
}
