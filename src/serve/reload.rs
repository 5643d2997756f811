// src/serve/reload.rs

//! Live-reload plumbing: the websocket endpoint, the client snippet and the
//! destination-tree watcher that fires reloads.

use std::path::PathBuf;

use anyhow::{Context, Result};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::watch::path_utils::relative_str;
use crate::watch::patterns::PatternSet;

/// Websocket path browsers connect to.
pub const RELOAD_PATH: &str = "/__assetpipe/livereload";

const RELOAD_SNIPPET: &str = concat!(
    "<script>(function(){var p=location.protocol==='https:'?'wss://':'ws://';",
    "var s=new WebSocket(p+location.host+'/__assetpipe/livereload');",
    "s.onmessage=function(e){if(e.data==='reload'){location.reload();}};})();</script>"
);

/// Insert the reload client before the last `</body>`, or append it when the
/// document has no body end tag.
pub fn inject_reload_snippet(html: &str) -> String {
    let lower = html.to_ascii_lowercase();
    match lower.rfind("</body>") {
        Some(idx) => {
            let mut out = String::with_capacity(html.len() + RELOAD_SNIPPET.len());
            out.push_str(&html[..idx]);
            out.push_str(RELOAD_SNIPPET);
            out.push_str(&html[idx..]);
            out
        }
        None => format!("{html}{RELOAD_SNIPPET}"),
    }
}

pub(crate) async fn livereload_handler(
    ws: WebSocketUpgrade,
    State(reload_tx): State<broadcast::Sender<()>>,
) -> Response {
    let rx = reload_tx.subscribe();
    ws.on_upgrade(move |socket| forward_reloads(socket, rx))
}

async fn forward_reloads(mut socket: WebSocket, mut rx: broadcast::Receiver<()>) {
    debug!("live-reload client connected");
    loop {
        match rx.recv().await {
            Ok(()) => {
                if socket.send(Message::Text("reload".into())).await.is_err() {
                    break;
                }
            }
            // Several changes collapsed into one; a single reload covers them.
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    debug!("live-reload client disconnected");
}

/// Keeps the destination watcher alive.
pub struct ReloadWatcher {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for ReloadWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadWatcher").finish()
    }
}

/// Watch `dst` and broadcast a reload for every change to a file that is
/// not a source map.
pub fn spawn_reload_watcher(
    dst: impl Into<PathBuf>,
    reload_tx: broadcast::Sender<()>,
) -> Result<ReloadWatcher> {
    let dst = dst.into();
    std::fs::create_dir_all(&dst)
        .with_context(|| format!("creating destination directory {:?}", dst))?;
    let dst = dst.canonicalize().unwrap_or(dst);

    let filter = PatternSet::new(&["**"])?.with_exclude(&["**/*.map"])?;
    let root = dst.clone();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        let event = match res {
            Ok(event) if !event.kind.is_access() => event,
            Ok(_) => return,
            Err(err) => {
                warn!("destination watch error: {err}");
                return;
            }
        };
        let built_file_changed = event
            .paths
            .iter()
            .filter_map(|p| relative_str(&root, p))
            .any(|rel| filter.matches(&rel));
        if built_file_changed {
            // No receivers just means no browser is connected.
            let _ = reload_tx.send(());
        }
    })
    .context("creating destination watcher")?;

    watcher
        .watch(&dst, RecursiveMode::Recursive)
        .with_context(|| format!("watching destination tree {}", dst.display()))?;

    info!(dst = %dst.display(), "live reload watching build output");
    Ok(ReloadWatcher { _inner: watcher })
}
