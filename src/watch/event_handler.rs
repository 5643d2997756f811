// src/watch/event_handler.rs

//! Event processing logic for source-tree changes.

use std::path::Path;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::{RuntimeEvent, TriggerReason};
use crate::tasks::sprite_cache::SharedSpriteCache;
use crate::tasks::TaskKind;
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::TaskWatchProfile;

/// Process a single file event and trigger the matching asset tasks.
///
/// 1. Relativize the path against the source root.
/// 2. Find every profile whose patterns match.
/// 3. For a removed sprite source, evict it from the sprite cache *before*
///    the trigger is sent, so the regenerated sprite cannot include it.
/// 4. Send a trigger for each matching task.
///
/// Returns `false` once the runtime channel is closed.
pub async fn process_file_change(
    root: &Path,
    path: &Path,
    removed: bool,
    profiles: &[TaskWatchProfile],
    sprite_cache: &SharedSpriteCache,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) -> bool {
    let rel_str = match relative_str(root, path) {
        Some(s) => s,
        None => {
            warn!(
                "could not relativize path {:?} against root {:?}",
                path, root
            );
            return true;
        }
    };

    debug!(?path, rel = %rel_str, removed, "normalized event path");

    for profile in profiles.iter().filter(|p| p.matches(&rel_str)) {
        if removed && profile.kind() == TaskKind::Sprites {
            evict_sprite(sprite_cache, &rel_str);
        }

        debug!(task = %profile.name(), path = %rel_str, "watch match -> triggering task");
        if let Err(err) = runtime_tx
            .send(RuntimeEvent::TaskTriggered {
                task: profile.name().to_string(),
                reason: TriggerReason::FileWatch,
            })
            .await
        {
            warn!("failed to send RuntimeEvent::TaskTriggered: {err}");
            return false;
        }
    }

    true
}

fn evict_sprite(sprite_cache: &SharedSpriteCache, rel_str: &str) {
    match sprite_cache.lock() {
        Ok(mut cache) => {
            if cache.evict(Path::new(rel_str)).is_some() {
                info!(path = %rel_str, "sprite source removed; evicted from sprite cache");
            }
        }
        Err(_) => warn!(path = %rel_str, "sprite cache mutex poisoned; cannot evict"),
    }
}
