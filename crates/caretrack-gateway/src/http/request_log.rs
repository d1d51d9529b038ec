//! Per-request audit record: emitted as a tracing event and, when
//! `logging.persist_requests` is on, written through the request log store.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{ConnectInfo, OriginalUri, Request, State};
use axum::http::header::USER_AGENT;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use caretrack_core::types::RequestLog;
use tracing::{info, warn};

use crate::app::AppState;

pub async fn record(State(state): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = req.method().to_string();
    let uri = req
        .extensions()
        .get::<OriginalUri>()
        .map(|OriginalUri(uri)| uri.clone())
        .unwrap_or_else(|| req.uri().clone());
    let path = uri.path().to_string();
    let query = uri.query().unwrap_or_default().to_string();
    let ip = client_ip(
        req.headers(),
        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr),
    );
    let user_agent = req
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let response = next.run(req).await;

    let entry = RequestLog {
        method,
        path,
        query,
        status: response.status().as_u16(),
        latency_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        ip,
        user_agent,
    };
    info!(
        method = %entry.method,
        path = %entry.path,
        query = %entry.query,
        status = entry.status,
        latency_ms = entry.latency_ms,
        ip = %entry.ip,
        user_agent = %entry.user_agent,
        "request completed"
    );

    if state.config.logging.persist_requests {
        if let Err(e) = state.request_logs.record(&entry, state.clock.now()).await {
            warn!(error = %e, "failed to persist request log");
        }
    }

    response
}

/// First `X-Forwarded-For` hop, then `X-Real-IP`, then the socket peer.
fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    header("x-forwarded-for")
        .or_else(|| header("x-real-ip"))
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_default()
}
