// src/tasks/sprite_cache.rs

//! Remembered sprite sources.
//!
//! The sprite task stores one entry per source file; the sprite document is
//! always generated from every remembered entry. The watcher evicts entries
//! of deleted files so their symbols disappear on the next run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Handle shared by the sprite task and the watcher.
pub type SharedSpriteCache = Arc<Mutex<SpriteCache>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteEntry {
    /// blake3 hex digest of the source bytes.
    pub hash: String,
    /// Cleaned `<symbol>` markup.
    pub symbol: String,
}

/// Entries keyed by source path relative to the `src` directory
/// (e.g. `sprites/arrow.svg`), iterated in path order.
#[derive(Debug, Default)]
pub struct SpriteCache {
    entries: BTreeMap<PathBuf, SpriteEntry>,
}

impl SpriteCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedSpriteCache {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn get(&self, path: &Path) -> Option<&SpriteEntry> {
        self.entries.get(path)
    }

    pub fn put(&mut self, path: impl Into<PathBuf>, entry: SpriteEntry) {
        self.entries.insert(path.into(), entry);
    }

    pub fn evict(&mut self, path: &Path) -> Option<SpriteEntry> {
        self.entries.remove(path)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&Path, &SpriteEntry)> {
        self.entries.iter().map(|(p, e)| (p.as_path(), e))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(symbol: &str) -> SpriteEntry {
        SpriteEntry {
            hash: blake3::hash(symbol.as_bytes()).to_hex().to_string(),
            symbol: symbol.to_string(),
        }
    }

    #[test]
    fn entries_iterate_in_path_order() {
        let mut cache = SpriteCache::new();
        cache.put("sprites/b.svg", entry("b"));
        cache.put("sprites/a.svg", entry("a"));
        let order: Vec<_> = cache.entries().map(|(p, _)| p.to_path_buf()).collect();
        assert_eq!(
            order,
            vec![PathBuf::from("sprites/a.svg"), PathBuf::from("sprites/b.svg")]
        );
    }

    #[test]
    fn evict_forgets_entry() {
        let mut cache = SpriteCache::new();
        cache.put("sprites/a.svg", entry("a"));
        assert!(cache.evict(Path::new("sprites/a.svg")).is_some());
        assert!(cache.get(Path::new("sprites/a.svg")).is_none());
        assert!(cache.evict(Path::new("sprites/a.svg")).is_none());
        assert!(cache.is_empty());
    }
}
