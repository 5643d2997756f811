// src/serve/mod.rs

//! Development server: reverse proxy with live reload.
//!
//! Every request except the live-reload websocket is forwarded to
//! `[serve].proxy`. HTML responses get a small client injected that opens
//! the websocket; a watcher on the destination tree broadcasts `reload`
//! whenever a built file (other than a source map) changes.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::extract::FromRef;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::info;

use crate::tasks::BuildContext;

pub mod proxy;
pub mod reload;

pub use proxy::ProxyState;
pub use reload::{inject_reload_snippet, RELOAD_PATH};

#[derive(Debug, Clone)]
pub struct ServeState {
    pub proxy: ProxyState,
    pub reload_tx: broadcast::Sender<()>,
}

impl FromRef<ServeState> for ProxyState {
    fn from_ref(state: &ServeState) -> Self {
        state.proxy.clone()
    }
}

impl FromRef<ServeState> for broadcast::Sender<()> {
    fn from_ref(state: &ServeState) -> Self {
        state.reload_tx.clone()
    }
}

pub fn router(state: ServeState) -> Router {
    Router::new()
        .route(RELOAD_PATH, get(reload::livereload_handler))
        .fallback(proxy::proxy_handler)
        .with_state(state)
}

/// A bound, not yet serving, development server.
#[derive(Debug)]
pub struct DevServer {
    listener: TcpListener,
    state: ServeState,
    _watcher: reload::ReloadWatcher,
}

impl DevServer {
    /// Bind `127.0.0.1:<serve.port>` and start watching the destination tree.
    pub async fn bind(ctx: &BuildContext) -> Result<Self> {
        let serve = &ctx.config.serve;
        if serve.open {
            info!("browser auto-open is not supported; ignoring [serve].open");
        }

        let (reload_tx, _) = broadcast::channel(16);
        let watcher = reload::spawn_reload_watcher(ctx.config.dst_dir(), reload_tx.clone())?;

        let addr = SocketAddr::from(([127, 0, 0, 1], serve.port));
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding dev server to {addr}"))?;

        Ok(Self {
            listener,
            state: ServeState {
                proxy: ProxyState::new(serve.proxy.clone()),
                reload_tx,
            },
            _watcher: watcher,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Sender that triggers a browser reload when sent to.
    pub fn reload_sender(&self) -> broadcast::Sender<()> {
        self.state.reload_tx.clone()
    }

    /// Serve until the process stops.
    pub async fn run(self) -> Result<()> {
        let addr = self.local_addr()?;
        info!(
            address = %addr,
            upstream = %self.state.proxy.upstream(),
            "dev server listening"
        );
        let app = router(self.state);
        // The watcher lives as long as this future.
        let _watcher = self._watcher;
        axum::serve(self.listener, app)
            .await
            .context("dev server stopped")?;
        Ok(())
    }
}
