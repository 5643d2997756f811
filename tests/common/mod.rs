// tests/common/mod.rs
#![allow(dead_code)]

use std::fs;
use std::path::Path;

pub use assetpipe_test_utils::{
    init_tracing, test_context, with_timeout, ConfigFileBuilder, FakeExecutor, RecordingNotifier,
};

/// Write `files` (relative path, contents) below `root`.
pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (rel, contents) in files {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }
}
