// tests/scripts_bundler.rs
#![cfg(unix)]

mod common;
use crate::common::{init_tracing, test_context, write_tree, ConfigFileBuilder};

use std::fs;
use std::sync::Arc;

use assetpipe::errors::AssetpipeError;
use assetpipe::fs::RealFileSystem;
use assetpipe::tasks::{run_task, TaskKind};
use assetpipe::types::Env;

/// Stand-in bundler: copies the entry to the outfile, fails on a marker.
const FAKE_BUNDLER: &str = r#"entry="$1"; out="${2#--outfile=}"
if grep -q "SYNTAX ERROR" "$entry"; then echo "$entry: unexpected token" >&2; exit 1; fi
mkdir -p "$(dirname "$out")" && cp "$entry" "$out""#;

#[tokio::test]
async fn failing_entry_is_notified_and_siblings_are_written() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    write_tree(
        dir.path(),
        &[
            ("src/js/good.js", "export const a = 1;\n"),
            ("src/js/bad.js", "SYNTAX ERROR\n"),
        ],
    );
    let cfg = ConfigFileBuilder::new(dir.path())
        .js_src(&["js/good.js", "js/bad.js"])
        .bundler("sh", &["-c", FAKE_BUNDLER, "bundler"])
        .build();
    let (ctx, notifier) = test_context(cfg, Env::Dev, Arc::new(RealFileSystem));

    let report = run_task(TaskKind::Scripts, &ctx).await.unwrap();
    assert_eq!(report.written, 1);
    assert_eq!(report.errors, 1);
    assert!(dir.path().join("dist/js/good.js").exists());
    assert!(!dir.path().join("dist/js/bad.js").exists());

    let notes = notifier.notifications();
    assert_eq!(notes.len(), 1);
    assert!(notes[0].1.contains("unexpected token"));
}

#[tokio::test]
async fn rebundling_unchanged_entry_gives_identical_output() {
    let dir = tempfile::tempdir().unwrap();
    write_tree(dir.path(), &[("src/js/scripts.js", "console.log(1);\n")]);
    let cfg = ConfigFileBuilder::new(dir.path())
        .bundler("sh", &["-c", FAKE_BUNDLER, "bundler"])
        .build();
    let (ctx, _) = test_context(cfg, Env::Prod, Arc::new(RealFileSystem));

    run_task(TaskKind::Scripts, &ctx).await.unwrap();
    let first = fs::read(dir.path().join("dist/js/scripts.js")).unwrap();
    run_task(TaskKind::Scripts, &ctx).await.unwrap();
    let second = fs::read(dir.path().join("dist/js/scripts.js")).unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn missing_entry_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write_tree(dir.path(), &[("src/js/other.js", "")]);
    let cfg = ConfigFileBuilder::new(dir.path())
        .bundler("sh", &["-c", FAKE_BUNDLER, "bundler"])
        .build();
    let (ctx, _) = test_context(cfg, Env::Dev, Arc::new(RealFileSystem));

    let err = run_task(TaskKind::Scripts, &ctx).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AssetpipeError>(),
        Some(AssetpipeError::MissingSource(_))
    ));
}

#[tokio::test]
async fn missing_bundler_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write_tree(dir.path(), &[("src/js/scripts.js", "")]);
    let cfg = ConfigFileBuilder::new(dir.path())
        .bundler("assetpipe-test-no-such-bundler", &[])
        .build();
    let (ctx, _) = test_context(cfg, Env::Dev, Arc::new(RealFileSystem));

    let err = run_task(TaskKind::Scripts, &ctx).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AssetpipeError>(),
        Some(AssetpipeError::MissingTool(_))
    ));
}
