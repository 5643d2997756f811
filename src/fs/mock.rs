// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone)]
pub enum MockEntry {
    /// File contents plus the logical tick of its last write.
    File(Vec<u8>, u64),
    /// Names of the direct children.
    Dir(Vec<String>),
}

#[derive(Debug, Default)]
struct MockState {
    entries: HashMap<PathBuf, MockEntry>,
    clock: u64,
    writes: usize,
}

/// In-memory filesystem for tests.
///
/// Every write advances a logical clock, so a file written later always has a
/// strictly newer `modified()` time than one written before it.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let fs = Self::default();
        fs.lock()
            .entries
            .insert(PathBuf::from("."), MockEntry::Dir(Vec::new()));
        fs
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref().to_path_buf();
        let mut state = self.lock();
        state.clock += 1;
        let tick = state.clock;
        state.entries.insert(path.clone(), MockEntry::File(content.into(), tick));
        Self::link_into_parent(&mut state.entries, &path);
    }

    /// Bump a file's modification time without changing its contents.
    pub fn touch(&self, path: impl AsRef<Path>) {
        let mut state = self.lock();
        state.clock += 1;
        let tick = state.clock;
        if let Some(MockEntry::File(_, mtime)) = state.entries.get_mut(path.as_ref()) {
            *mtime = tick;
        }
    }

    /// Remove a single file.
    pub fn remove_file(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut state = self.lock();
        state.entries.remove(path);
        Self::unlink_from_parent(&mut state.entries, path);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        // Tolerate poisoning from a panicked test thread.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of `write` calls made through the [`FileSystem`] trait.
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    fn link_into_parent(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        if let Some(parent) = path.parent() {
            let parent = if parent.as_os_str().is_empty() {
                Path::new(".")
            } else {
                parent
            };

            if parent == path {
                return;
            }

            if !matches!(entries.get(parent), Some(MockEntry::Dir(_))) {
                entries.insert(parent.to_path_buf(), MockEntry::Dir(Vec::new()));
                Self::link_into_parent(entries, parent);
            }

            if let Some(MockEntry::Dir(children)) = entries.get_mut(parent) {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    if !children.iter().any(|c| c == name) {
                        children.push(name.to_string());
                    }
                }
            }
        }
    }

    fn unlink_from_parent(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        let (Some(parent), Some(name)) = (path.parent(), path.file_name().and_then(|n| n.to_str()))
        else {
            return;
        };
        let parent = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };
        if let Some(MockEntry::Dir(children)) = entries.get_mut(parent) {
            children.retain(|c| c != name);
        }
    }

    fn file_bytes(&self, path: &Path) -> Result<Vec<u8>> {
        let state = self.lock();
        match state.entries.get(path) {
            Some(MockEntry::File(content, _)) => Ok(content.clone()),
            Some(MockEntry::Dir(_)) => Err(anyhow!("{} is a directory", path.display())),
            None => Err(anyhow!("{} does not exist", path.display())),
        }
    }
}

impl FileSystem for MockFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.file_bytes(path)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        let bytes = self.file_bytes(path)?;
        String::from_utf8(bytes).map_err(|e| anyhow!("not UTF-8: {e}"))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        self.lock().writes += 1;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let state = self.lock();
        state.entries.contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        let state = self.lock();
        matches!(state.entries.get(path), Some(MockEntry::File(..)))
    }

    fn is_dir(&self, path: &Path) -> bool {
        let state = self.lock();
        matches!(state.entries.get(path), Some(MockEntry::Dir(_)))
    }

    fn modified(&self, path: &Path) -> Result<SystemTime> {
        let state = self.lock();
        match state.entries.get(path) {
            Some(MockEntry::File(_, tick)) => {
                Ok(SystemTime::UNIX_EPOCH + Duration::from_secs(*tick))
            }
            Some(MockEntry::Dir(_)) => Ok(SystemTime::UNIX_EPOCH),
            None => Err(anyhow!("{} does not exist", path.display())),
        }
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        let mut state = self.lock();
        state.entries.retain(|p, _| !p.starts_with(path));
        Self::unlink_from_parent(&mut state.entries, path);
        Ok(())
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let state = self.lock();
        match state.entries.get(path) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(anyhow!("{} is not a directory", path.display())),
        }
    }
}
