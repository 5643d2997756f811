// src/serve/proxy.rs

//! Reverse proxy to the configured development host.

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tracing::{debug, error};

use crate::serve::reload::inject_reload_snippet;

/// Largest upstream HTML page we buffer for snippet injection.
const MAX_HTML_BYTES: usize = 16 * 1024 * 1024;

#[derive(Clone)]
pub struct ProxyState {
    upstream: String,
    client: Client<HttpConnector, Body>,
}

impl std::fmt::Debug for ProxyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyState")
            .field("upstream", &self.upstream)
            .finish_non_exhaustive()
    }
}

impl ProxyState {
    /// `upstream` is a host with optional port, e.g. `gulp.dev` or `localhost:8080`.
    pub fn new(upstream: impl Into<String>) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            upstream: upstream.into(),
            client,
        }
    }

    pub fn upstream(&self) -> &str {
        &self.upstream
    }
}

/// Upstream URI for an incoming request URI.
pub fn upstream_uri(upstream: &str, incoming: &Uri) -> Result<Uri, axum::http::Error> {
    let path = incoming
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    Ok(format!("http://{upstream}{path}").parse::<Uri>()?)
}

pub(crate) async fn proxy_handler(State(state): State<ProxyState>, request: Request) -> Response {
    let (mut parts, body) = request.into_parts();

    let uri = match upstream_uri(&state.upstream, &parts.uri) {
        Ok(uri) => uri,
        Err(e) => {
            error!(error = %e, "invalid upstream uri");
            return (StatusCode::BAD_GATEWAY, "Invalid upstream address").into_response();
        }
    };
    debug!(method = %parts.method, %uri, "proxying request");

    parts.uri = uri;
    if let Ok(host) = HeaderValue::from_str(&state.upstream) {
        parts.headers.insert(header::HOST, host);
    }
    // Upstream HTML must arrive uncompressed for snippet injection.
    parts.headers.remove(header::ACCEPT_ENCODING);

    let response = match state
        .client
        .request(Request::from_parts(parts, body))
        .await
    {
        Ok(response) => response,
        Err(e) => {
            error!(upstream = %state.upstream, error = %e, "upstream request failed");
            return (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response();
        }
    };

    let (mut parts, body) = response.into_parts();
    if !is_html(&parts.headers) {
        return Response::from_parts(parts, Body::new(body));
    }

    let bytes = match axum::body::to_bytes(Body::new(body), MAX_HTML_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(error = %e, "reading upstream html failed");
            return (StatusCode::BAD_GATEWAY, "Upstream body failed").into_response();
        }
    };

    let html = String::from_utf8_lossy(&bytes);
    let injected = inject_reload_snippet(&html);
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(injected))
}

fn is_html(headers: &axum::http::HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("text/html"))
}
