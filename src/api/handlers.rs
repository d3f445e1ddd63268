//! API Handlers
//!
//! HTTP request handlers for the proxy surface and the control endpoints.

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{OriginalUri, Path, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::debug;

use crate::error::{CacheError, Result};
use crate::models::{
    ControlRequest, Destination, EnqueueActionRequest, HealthResponse, InterceptedRequest,
    QueuedResponse, StatsSnapshot, SyncRegisteredResponse,
};
use crate::sync::{generate_action_id, ActionQueue, QueuedAction, SyncTag};
use crate::worker::{CacheWorker, WorkerEvents};

/// Prefix stripped from proxied paths before they are joined to the upstream.
pub const PROXY_PREFIX: &str = "/proxy";

/// Header naming where a proxied body came from.
pub const CACHE_SOURCE_HEADER: &str = "x-cache-source";

/// Headers that describe one hop and are never forwarded.
const HOP_HEADERS: [&str; 5] = [
    "host",
    "connection",
    "content-length",
    "transfer-encoding",
    "keep-alive",
];

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub worker: Arc<CacheWorker>,
}

impl AppState {
    pub fn new(worker: CacheWorker) -> Self {
        Self {
            worker: Arc::new(worker),
        }
    }
}

/// Handler for ANY /proxy/*path
///
/// Rewrites the request onto the upstream origin and runs it through the
/// worker. The reply carries an `x-cache-source` header.
pub async fn proxy_handler(
    State(state): State<AppState>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let path = uri.path().strip_prefix(PROXY_PREFIX).unwrap_or(uri.path());
    let mut url = state.worker.upstream().clone();
    url.set_path(if path.is_empty() { "/" } else { path });
    url.set_query(uri.query());

    let mut request = InterceptedRequest::new(method.as_str(), url);
    for (name, value) in &headers {
        if HOP_HEADERS.contains(&name.as_str()) {
            continue;
        }
        if let Ok(value) = value.to_str() {
            request = request.with_header(name.as_str(), value);
        }
    }
    if let Some(dest) = request.header("sec-fetch-dest") {
        let destination = Destination::from_header(dest);
        request = request.with_destination(destination);
    }
    if !body.is_empty() {
        request = request.with_body(body);
    }

    let intercepted = state.worker.intercept(request).await?;
    debug!(
        "Proxied {} {} from {}",
        method,
        uri,
        intercepted.source.as_str()
    );

    let response = intercepted.response;
    let status = StatusCode::from_u16(response.status)
        .map_err(|_| CacheError::Network(format!("Upstream sent status {}", response.status)))?;

    let mut builder = Response::builder().status(status);
    for (name, value) in &response.headers {
        if HOP_HEADERS.contains(&name.to_ascii_lowercase().as_str()) {
            continue;
        }
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
        .header(CACHE_SOURCE_HEADER, intercepted.source.as_str())
        .body(Body::from(response.body))
        .map_err(|e| CacheError::Network(format!("Upstream sent an unusable response: {}", e)))
}

/// Handler for POST /control
///
/// Replies with JSON, or 204 when the message kind has no reply.
pub async fn control_handler(
    State(state): State<AppState>,
    Json(req): Json<ControlRequest>,
) -> Response {
    match state.worker.on_message(req.into()).await {
        Some(reply) => Json(reply).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsSnapshot> {
    Json(state.worker.control().stats_snapshot().await)
}

/// Handler for POST /sync/:tag
///
/// Registers one run of the named sync and returns before it starts.
pub async fn sync_handler(
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> Result<(StatusCode, Json<SyncRegisteredResponse>)> {
    let tag: SyncTag = tag.parse()?;
    state.worker.sync().register(tag);

    Ok((
        StatusCode::ACCEPTED,
        Json(SyncRegisteredResponse {
            registered: tag.to_string(),
        }),
    ))
}

/// Handler for POST /actions
///
/// Queues a user action for replay by the next `user-action-sync` run.
pub async fn enqueue_action_handler(
    State(state): State<AppState>,
    Json(req): Json<EnqueueActionRequest>,
) -> Result<(StatusCode, Json<QueuedResponse>)> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let id = req.id.unwrap_or_else(generate_action_id);
    let action = QueuedAction::new(id.clone(), &req.method, req.url)
        .with_headers(req.headers)
        .with_body(req.body);
    state.worker.sync().queue().enqueue(action).await?;

    Ok((StatusCode::ACCEPTED, Json(QueuedResponse { queued: id })))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(
        state.worker.lifecycle_state().to_string(),
    ))
}
