// tests/copy_tasks.rs

mod common;
use crate::common::{init_tracing, test_context, ConfigFileBuilder};

use std::path::Path;
use std::sync::Arc;

use assetpipe::fs::mock::MockFileSystem;
use assetpipe::fs::FileSystem;
use assetpipe::tasks::{run_task, TaskKind};
use assetpipe::types::Env;

fn seeded_fs() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/src/index.html", "<html></html>");
    fs.add_file("/proj/src/partials/header.php", "<?php ?>");
    fs.add_file("/proj/src/.htaccess", "Options -Indexes");
    fs.add_file("/proj/src/css/style.css", "body{}");
    fs.add_file("/proj/src/images/photos/cat.jpg", "jpeg bytes");
    fs.add_file("/proj/src/images/anim.gif", "gif bytes");
    fs.add_file("/proj/src/files/docs/manual.pdf", "pdf bytes");
    fs
}

#[tokio::test]
async fn templates_preserve_structure_and_skip_on_second_run() {
    init_tracing();
    let fs = seeded_fs();
    let cfg = ConfigFileBuilder::new("/proj").build();
    let (ctx, notifier) = test_context(cfg, Env::Dev, Arc::new(fs.clone()));

    let first = run_task(TaskKind::Templates, &ctx).await.unwrap();
    assert_eq!(first.written, 3);
    assert!(fs.exists(Path::new("/proj/dist/index.html")));
    assert!(fs.exists(Path::new("/proj/dist/partials/header.php")));
    assert!(fs.exists(Path::new("/proj/dist/.htaccess")));
    assert!(!fs.exists(Path::new("/proj/dist/css/style.css")));

    let writes = fs.write_count();
    let second = run_task(TaskKind::Templates, &ctx).await.unwrap();
    assert_eq!(second.written, 0);
    assert_eq!(second.skipped, 3);
    assert_eq!(fs.write_count(), writes);
    assert!(notifier.notifications().is_empty());
}

#[tokio::test]
async fn modified_template_is_copied_again() {
    let fs = seeded_fs();
    let cfg = ConfigFileBuilder::new("/proj").build();
    let (ctx, _) = test_context(cfg, Env::Dev, Arc::new(fs.clone()));

    run_task(TaskKind::Templates, &ctx).await.unwrap();
    fs.add_file("/proj/src/index.html", "<html>changed</html>");

    let report = run_task(TaskKind::Templates, &ctx).await.unwrap();
    assert_eq!(report.written, 1);
    assert_eq!(
        fs.read_to_string(Path::new("/proj/dist/index.html")).unwrap(),
        "<html>changed</html>"
    );
}

#[tokio::test]
async fn images_and_files_copy_below_their_bases_and_are_idempotent() {
    let fs = seeded_fs();
    let cfg = ConfigFileBuilder::new("/proj").build();
    let (ctx, notifier) = test_context(cfg, Env::Dev, Arc::new(fs.clone()));

    let first = run_task(TaskKind::Images, &ctx).await.unwrap();
    assert_eq!(first.written, 3);
    assert_eq!(
        fs.read(Path::new("/proj/dist/images/photos/cat.jpg")).unwrap(),
        b"jpeg bytes"
    );
    assert!(fs.exists(Path::new("/proj/dist/images/anim.gif")));
    assert_eq!(
        fs.read(Path::new("/proj/dist/files/docs/manual.pdf")).unwrap(),
        b"pdf bytes"
    );

    let second = run_task(TaskKind::Images, &ctx).await.unwrap();
    assert_eq!(second.written, 0);
    assert!(notifier.notifications().is_empty());
}

#[tokio::test]
async fn undecodable_png_is_reported_and_copied_unchanged() {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/src/images/broken.png", "not a png");
    let cfg = ConfigFileBuilder::new("/proj").build();
    let (ctx, notifier) = test_context(cfg, Env::Dev, Arc::new(fs.clone()));

    let report = run_task(TaskKind::Images, &ctx).await.unwrap();
    assert_eq!(report.errors, 1);
    assert_eq!(
        fs.read(Path::new("/proj/dist/images/broken.png")).unwrap(),
        b"not a png"
    );
    assert_eq!(notifier.titles(), vec![TaskKind::Images.title().to_string()]);
}

#[tokio::test]
async fn missing_source_root_is_fatal() {
    let fs = MockFileSystem::new();
    let cfg = ConfigFileBuilder::new("/proj").build();
    let (ctx, _) = test_context(cfg, Env::Dev, Arc::new(fs));

    assert!(run_task(TaskKind::Templates, &ctx).await.is_err());
}

#[tokio::test]
async fn clean_removes_only_the_destination_tree() {
    let fs = seeded_fs();
    fs.add_file("/proj/dist/stale.html", "old");
    let cfg = ConfigFileBuilder::new("/proj").build();
    let (ctx, _) = test_context(cfg, Env::Prod, Arc::new(fs.clone()));

    run_task(TaskKind::Clean, &ctx).await.unwrap();
    assert!(!fs.exists(Path::new("/proj/dist/stale.html")));
    assert!(fs.exists(Path::new("/proj/src/index.html")));
}
