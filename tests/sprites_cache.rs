// tests/sprites_cache.rs

mod common;
use crate::common::{init_tracing, test_context, ConfigFileBuilder};

use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;

use assetpipe::engine::{RuntimeEvent, TriggerReason};
use assetpipe::fs::mock::MockFileSystem;
use assetpipe::fs::FileSystem;
use assetpipe::tasks::{run_task, TaskKind};
use assetpipe::types::Env;
use assetpipe::watch::build_profiles_from_config;
use assetpipe::watch::event_handler::process_file_change;

const ICON_A: &str = r#"<svg viewBox="0 0 10 10"><path d="M0 0h10v10z"/></svg>"#;
const ICON_B: &str = r#"<svg viewBox="0 0 20 20"><circle cx="10" cy="10" r="5"/></svg>"#;
const SPRITE: &str = "/proj/dist/images/icons.svg";

fn sprite(fs: &MockFileSystem) -> String {
    fs.read_to_string(Path::new(SPRITE)).unwrap()
}

#[tokio::test]
async fn deleted_icon_disappears_only_after_watcher_eviction() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("/proj/src/sprites/a.svg", ICON_A);
    fs.add_file("/proj/src/sprites/b.svg", ICON_B);

    let cfg = ConfigFileBuilder::new("/proj").build();
    let profiles = build_profiles_from_config(&cfg, Env::Dev).unwrap();
    let (ctx, notifier) = test_context(cfg, Env::Dev, Arc::new(fs.clone()));

    run_task(TaskKind::Sprites, &ctx).await.unwrap();
    let first = sprite(&fs);
    assert!(first.contains(r#"id="a""#));
    assert!(first.contains(r#"id="b""#));

    // Without eviction the cache still remembers b.
    fs.remove_file("/proj/src/sprites/b.svg");
    run_task(TaskKind::Sprites, &ctx).await.unwrap();
    assert!(sprite(&fs).contains(r#"id="b""#));

    let (tx, mut rx) = mpsc::channel(8);
    let open = process_file_change(
        Path::new("/proj/src"),
        Path::new("/proj/src/sprites/b.svg"),
        true,
        &profiles,
        &ctx.sprite_cache,
        &tx,
    )
    .await;
    assert!(open);
    match rx.recv().await {
        Some(RuntimeEvent::TaskTriggered { task, reason }) => {
            assert_eq!(task, "sprites");
            assert_eq!(reason, TriggerReason::FileWatch);
        }
        other => panic!("expected sprites trigger, got {other:?}"),
    }

    run_task(TaskKind::Sprites, &ctx).await.unwrap();
    let after = sprite(&fs);
    assert!(after.contains(r#"id="a""#));
    assert!(!after.contains(r#"id="b""#));
    assert!(notifier.notifications().is_empty());
}

#[tokio::test]
async fn unchanged_icons_are_served_from_the_cache() {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/src/sprites/a.svg", ICON_A);
    fs.add_file("/proj/src/sprites/social/twitter.svg", ICON_B);

    let cfg = ConfigFileBuilder::new("/proj").build();
    let (ctx, _) = test_context(cfg, Env::Dev, Arc::new(fs.clone()));

    let first = run_task(TaskKind::Sprites, &ctx).await.unwrap();
    assert_eq!(first.skipped, 0);
    assert!(sprite(&fs).contains(r#"id="social--twitter""#));

    let second = run_task(TaskKind::Sprites, &ctx).await.unwrap();
    assert_eq!(second.skipped, 2);
    assert_eq!(ctx.sprite_cache.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn invalid_icon_is_notified_and_others_still_render() {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/src/sprites/a.svg", ICON_A);
    fs.add_file("/proj/src/sprites/broken.svg", "<div>not svg</div>");

    let cfg = ConfigFileBuilder::new("/proj").build();
    let (ctx, notifier) = test_context(cfg, Env::Dev, Arc::new(fs.clone()));

    let report = run_task(TaskKind::Sprites, &ctx).await.unwrap();
    assert_eq!(report.errors, 1);
    assert_eq!(notifier.titles(), vec![TaskKind::Sprites.title().to_string()]);
    assert!(sprite(&fs).contains(r#"id="a""#));
}

#[tokio::test]
async fn deleting_the_last_icon_empties_the_sprite() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("/proj/src/sprites/a.svg", ICON_A);

    let cfg = ConfigFileBuilder::new("/proj").build();
    let profiles = build_profiles_from_config(&cfg, Env::Dev).unwrap();
    let (ctx, _) = test_context(cfg, Env::Dev, Arc::new(fs.clone()));

    run_task(TaskKind::Sprites, &ctx).await.unwrap();
    assert!(sprite(&fs).contains(r#"id="a""#));

    fs.remove_file("/proj/src/sprites/a.svg");
    let (tx, _rx) = mpsc::channel(8);
    process_file_change(
        Path::new("/proj/src"),
        Path::new("/proj/src/sprites/a.svg"),
        true,
        &profiles,
        &ctx.sprite_cache,
        &tx,
    )
    .await;

    let report = run_task(TaskKind::Sprites, &ctx).await.unwrap();
    assert_eq!(report.written, 1);
    let after = sprite(&fs);
    assert!(!after.contains("<symbol"));
    assert!(after.starts_with("<svg"));
}

#[tokio::test]
async fn no_sprite_is_written_before_any_icon_exists() {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/src/css/style.css", ".a{}");

    let cfg = ConfigFileBuilder::new("/proj").build();
    let (ctx, _) = test_context(cfg, Env::Dev, Arc::new(fs.clone()));

    let report = run_task(TaskKind::Sprites, &ctx).await.unwrap();
    assert_eq!(report.written, 0);
    assert!(!fs.exists(Path::new(SPRITE)));
}
