// src/watch/path_utils.rs

//! Utility functions for path handling in the watcher.

use std::path::Path;

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// - First we try a direct `strip_prefix(root)`.
/// - If that fails (e.g. symlinked temp dirs on macOS), we canonicalize both
///   paths and try again. A deleted file cannot be canonicalized, so for those
///   only the parent directory is resolved.
///
/// Returns `None` if the path cannot be related to `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(to_forward_slashes(rel));
    }

    let root_canon = root.canonicalize().ok()?;
    let path_canon = path.canonicalize().ok().or_else(|| {
        let parent = path.parent()?.canonicalize().ok()?;
        Some(parent.join(path.file_name()?))
    })?;

    path_canon
        .strip_prefix(&root_canon)
        .ok()
        .map(to_forward_slashes)
}

fn to_forward_slashes(rel: &Path) -> String {
    rel.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_root_prefix() {
        assert_eq!(
            relative_str(Path::new("/p/src"), Path::new("/p/src/sprites/a.svg")).as_deref(),
            Some("sprites/a.svg")
        );
    }

    #[test]
    fn unrelated_path_is_none() {
        assert_eq!(
            relative_str(Path::new("/definitely/not/here"), Path::new("/elsewhere/a.svg")),
            None
        );
    }
}
