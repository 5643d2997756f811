// src/watch/watcher.rs

use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::tasks::sprite_cache::SharedSpriteCache;
use crate::watch::event_handler::process_file_change;
use crate::watch::patterns::TaskWatchProfile;

/// Keeps the source-tree watcher alive. Watching stops when it is dropped.
pub struct WatcherHandle {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

/// Watch `root` recursively and turn every change below it into
/// `TaskTriggered` events for the profiles whose globs match.
///
/// Removed sprite sources are evicted from `sprite_cache` before the
/// `sprites` trigger goes out.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    profiles: Vec<TaskWatchProfile>,
    sprite_cache: SharedSpriteCache,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    let root: PathBuf = root.into();
    let root = root.canonicalize().unwrap_or(root);

    // notify calls back on its own thread; hop onto tokio through a channel.
    let (raw_tx, raw_rx) = mpsc::unbounded_channel::<Event>();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            let _ = raw_tx.send(event);
        }
        Err(err) => warn!("file watch error: {err}"),
    })
    .context("creating file watcher")?;

    watcher
        .watch(&root, RecursiveMode::Recursive)
        .with_context(|| format!("watching source tree {}", root.display()))?;
    info!(root = %root.display(), "watching sources");

    tokio::spawn(pump_events(
        root.clone(),
        raw_rx,
        profiles,
        sprite_cache,
        runtime_tx,
    ));

    Ok(WatcherHandle {
        _watcher: watcher,
        root,
    })
}

async fn pump_events(
    root: PathBuf,
    mut raw_rx: mpsc::UnboundedReceiver<Event>,
    profiles: Vec<TaskWatchProfile>,
    sprite_cache: SharedSpriteCache,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) {
    while let Some(event) = raw_rx.recv().await {
        if event.kind.is_access() {
            continue;
        }
        debug!(kind = ?event.kind, paths = ?event.paths, "source change");

        for path in &event.paths {
            // A rename reports the old path as modified; gone means removed.
            let removed = event.kind.is_remove() || !path.exists();
            let runtime_open =
                process_file_change(&root, path, removed, &profiles, &sprite_cache, &runtime_tx)
                    .await;
            if !runtime_open {
                debug!("runtime gone; source watcher stopping");
                return;
            }
        }
    }
}
