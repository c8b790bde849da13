//! Stateless HTTP call/response transport.
//!
//! `POST /mcp` takes one JSON-RPC message as the request body and answers
//! with one JSON-RPC envelope. `GET /healthz` reports liveness. Every `/mcp`
//! response carries the caller's rate-limit state in `X-RateLimit-*`
//! headers; callers over their limit get HTTP 429 with error -32029.
//!
//! The dispatcher and the limiter sit behind one async mutex, so calls are
//! handled one at a time, each to completion. Corpus refreshes take the
//! same lock, so a call never sees a half-swapped snapshot.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use crate::error::ServerError;
use crate::mcp::protocol::{peek_id, peek_version_field, JsonRpcError, OutgoingMessage};
use crate::mcp::server::{refresh_interval, Dispatcher};
use crate::mcp::transport::encode_line;
use crate::rate_limit::{client_identifier, RateLimitDecision, RateLimiter};

/// Path that accepts JSON-RPC calls.
pub const MCP_PATH: &str = "/mcp";

/// Liveness probe path.
pub const HEALTH_PATH: &str = "/healthz";

struct Inner {
    dispatcher: Dispatcher,
    limiter: RateLimiter,
}

/// Shared state of the HTTP transport.
pub struct HttpState {
    inner: Mutex<Inner>,
}

impl HttpState {
    /// Wraps a dispatcher and a limiter for sharing across connections.
    #[must_use]
    pub fn new(dispatcher: Dispatcher, limiter: RateLimiter) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner {
                dispatcher,
                limiter,
            }),
        })
    }

    /// Forgets every rate-limit window.
    pub async fn reset_rate_limits(&self) {
        self.inner.lock().await.limiter.reset();
    }

    /// Reloads the corpus between calls. See [`Dispatcher::refresh_corpus`].
    pub async fn refresh_corpus(&self) -> bool {
        self.inner.lock().await.dispatcher.refresh_corpus()
    }
}

/// Builds the HTTP router.
pub fn router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route(MCP_PATH, post(handle_mcp))
        .route(HEALTH_PATH, get(handle_health))
        .with_state(state)
}

/// Serves the HTTP transport on `addr` until SIGINT/SIGTERM, reloading the
/// corpus every `refresh` if set.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn serve(
    addr: SocketAddr,
    state: Arc<HttpState>,
    refresh: Option<Duration>,
) -> Result<(), ServerError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;

    tracing::info!(%addr, "HTTP transport listening");

    if let Some(period) = refresh.filter(|p| !p.is_zero()) {
        tokio::spawn(refresh_loop(Arc::clone(&state), period));
    }

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("HTTP transport stopped");
    Ok(())
}

async fn refresh_loop(state: Arc<HttpState>, period: Duration) {
    let mut interval = refresh_interval(period);
    loop {
        interval.tick().await;
        state.refresh_corpus().await;
    }
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let (Ok(mut sigint), Ok(mut sigterm)) = (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
    ) else {
        tracing::warn!("Failed to install signal handlers; HTTP shutdown needs a kill");
        std::future::pending::<()>().await;
        return;
    };

    tokio::select! {
        _ = sigint.recv() => tracing::info!("Received SIGINT, initiating graceful shutdown"),
        _ = sigterm.recv() => tracing::info!("Received SIGTERM, initiating graceful shutdown"),
    }
}

#[cfg(windows)]
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("Received Ctrl+C, initiating graceful shutdown");
    } else {
        std::future::pending::<()>().await;
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

async fn handle_mcp(
    State(state): State<Arc<HttpState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let identifier = client_identifier(
        header_str(&headers, "x-forwarded-for"),
        header_str(&headers, "x-real-ip"),
    );
    let text = std::str::from_utf8(&body).ok();

    let mut inner = state.inner.lock().await;
    let decision = inner.limiter.check(&identifier);
    if !decision.allowed {
        drop(inner);
        tracing::info!(client = %identifier, "Rejected rate-limited call");
        let raw = text.unwrap_or_default();
        let error: OutgoingMessage = JsonRpcError::rate_limited(peek_id(raw), decision.reset_in_secs)
            .with_version_field(peek_version_field(raw))
            .into();
        return envelope_response(StatusCode::TOO_MANY_REQUESTS, &error, decision);
    }

    let reply = match text {
        Some(text) => inner.dispatcher.handle_line(text),
        None => Some(JsonRpcError::parse_error().into()),
    };
    drop(inner);

    match reply {
        Some(message) => envelope_response(StatusCode::OK, &message, decision),
        None => (StatusCode::ACCEPTED, rate_limit_headers(decision)).into_response(),
    }
}

async fn handle_health(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let inner = state.inner.lock().await;
    let context = inner.dispatcher.context();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "documents": context.corpus().documents().len(),
        "tools": inner.dispatcher.registry().len(),
    }))
}

fn rate_limit_headers(decision: RateLimitDecision) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static("x-ratelimit-limit"),
        HeaderValue::from(decision.limit),
    );
    headers.insert(
        HeaderName::from_static("x-ratelimit-remaining"),
        HeaderValue::from(decision.remaining),
    );
    headers.insert(
        HeaderName::from_static("x-ratelimit-reset"),
        HeaderValue::from(decision.reset_in_secs),
    );
    headers
}

fn envelope_response(
    status: StatusCode,
    message: &OutgoingMessage,
    decision: RateLimitDecision,
) -> Response {
    let mut headers = rate_limit_headers(decision);
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );

    match encode_line(message) {
        Ok(body) => (status, headers, body).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialise HTTP response");
            (StatusCode::INTERNAL_SERVER_ERROR, headers).into_response()
        }
    }
}
