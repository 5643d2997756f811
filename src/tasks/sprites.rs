// src/tasks/sprites.rs

//! SVG sprite generation.
//!
//! Each matched icon is cleaned and turned into a `<symbol>`; unchanged
//! icons (same blake3 hash) are reused from the [`SpriteCache`]. The sprite
//! is always rendered from every remembered icon, not only the ones matched
//! in this run.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, info};

use crate::tasks::sprite_cache::{SpriteCache, SpriteEntry};
use crate::tasks::{matching_sources, svg, BuildContext, TaskKind, TaskReport};

pub async fn run(ctx: &BuildContext) -> Result<TaskReport> {
    let cfg = &ctx.config;
    let category = &cfg.sprites.paths;
    let src_dir = cfg.src_dir();
    let base = cfg.category_base(category);
    let files = matching_sources(ctx, category)?;
    let out = cfg.category_dst(category).join(&cfg.sprites.sprite);

    let mut report = TaskReport::default();
    let document = {
        let mut cache = ctx
            .sprite_cache
            .lock()
            .map_err(|_| anyhow!("sprite cache mutex poisoned"))?;

        for file in &files {
            let key = file
                .strip_prefix(&src_dir)
                .with_context(|| format!("{} is outside {}", file.display(), src_dir.display()))?;
            let bytes = ctx.fs.read(file)?;
            let hash = blake3::hash(&bytes).to_hex().to_string();

            if cache.get(key).is_some_and(|entry| entry.hash == hash) {
                debug!(path = %key.display(), "sprite source unchanged");
                report.skipped += 1;
                continue;
            }

            let id = symbol_id(file, &base)?;
            match build_symbol(&bytes, &id) {
                Ok(symbol) => cache.put(key, SpriteEntry { hash, symbol }),
                Err(err) => {
                    cache.evict(key);
                    ctx.report_error(TaskKind::Sprites, format!("{}: {err:#}", file.display()));
                    report.errors += 1;
                }
            }
        }

        // An empty cache still overwrites a sprite written earlier, so the
        // last deleted icon disappears too.
        if cache.is_empty() && !ctx.fs.exists(&out) {
            debug!("no sprite sources remembered; nothing to write");
            return Ok(report);
        }
        render_sprite(&cache)
    };

    ctx.fs.write(&out, document.as_bytes())?;
    report.written += 1;
    info!(path = %out.display(), ?report, "sprite written");
    Ok(report)
}

/// `<base>/social/twitter.svg` becomes `social--twitter`.
pub fn symbol_id(file: &Path, base: &Path) -> Result<String> {
    let rel = file
        .strip_prefix(base)
        .with_context(|| format!("{} is not below sprite base {}", file.display(), base.display()))?;
    let rel = rel.with_extension("");
    Ok(rel.to_string_lossy().replace('\\', "/").replace('/', "--"))
}

fn build_symbol(bytes: &[u8], id: &str) -> Result<String> {
    let text = std::str::from_utf8(bytes).context("SVG is not valid UTF-8")?;
    let cleaned = svg::cleanup_for_sprite(text)?;
    svg::to_symbol(&cleaned, id)
}

/// Render every remembered symbol, in path order, into one document.
pub fn render_sprite(cache: &SpriteCache) -> String {
    let mut out = String::from(r#"<svg xmlns="http://www.w3.org/2000/svg">"#);
    for (_, entry) in cache.entries() {
        out.push_str(&entry.symbol);
    }
    out.push_str("</svg>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn nested_icons_get_double_dash_ids() {
        let base = PathBuf::from("/p/src/sprites");
        assert_eq!(
            symbol_id(&base.join("social/twitter.svg"), &base).unwrap(),
            "social--twitter"
        );
        assert_eq!(symbol_id(&base.join("a.svg"), &base).unwrap(), "a");
        assert!(symbol_id(Path::new("/elsewhere/a.svg"), &base).is_err());
    }

    #[test]
    fn empty_cache_renders_an_empty_document() {
        assert_eq!(
            render_sprite(&SpriteCache::new()),
            r#"<svg xmlns="http://www.w3.org/2000/svg"></svg>"#
        );
    }

    #[test]
    fn sprite_contains_symbols_in_path_order() {
        let mut cache = SpriteCache::new();
        cache.put(
            "sprites/b.svg",
            SpriteEntry {
                hash: "2".into(),
                symbol: r#"<symbol id="b"></symbol>"#.into(),
            },
        );
        cache.put(
            "sprites/a.svg",
            SpriteEntry {
                hash: "1".into(),
                symbol: r#"<symbol id="a"></symbol>"#.into(),
            },
        );
        assert_eq!(
            render_sprite(&cache),
            r#"<svg xmlns="http://www.w3.org/2000/svg"><symbol id="a"></symbol><symbol id="b"></symbol></svg>"#
        );
    }
}
