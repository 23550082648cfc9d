//! Metrics HTTP server: serves the registry for a pull-based scraper.
//!
//! Handlers only read the registry. A scrape never blocks on, or triggers,
//! a scan.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use fim_core::{FimError, Result};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::metrics::SharedMetrics;

/// Exposition content type understood by Prometheus.
const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Build the router: `GET /metrics` and a small index at `/`.
pub fn router(metrics: SharedMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route(
            "/",
            get(|| async { "fim-agent metrics server\n\nGET /metrics - Prometheus metrics endpoint\n" }),
        )
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<SharedMetrics>) -> Response {
    match metrics.encode_text() {
        Ok(body) => (StatusCode::OK, [(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            error!(error = %e, "failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to encode metrics: {e}"),
            )
                .into_response()
        }
    }
}

/// Bind `addr` and serve until `cancel` fires.
pub async fn serve(metrics: SharedMetrics, addr: SocketAddr, cancel: CancellationToken) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| FimError::Server(format!("bind {addr}: {e}")))?;
    serve_listener(metrics, listener, cancel).await
}

/// Serve on an already-bound listener until `cancel` fires.
pub async fn serve_listener(
    metrics: SharedMetrics,
    listener: TcpListener,
    cancel: CancellationToken,
) -> Result<()> {
    let addr = listener
        .local_addr()
        .map_err(|e| FimError::Server(e.to_string()))?;
    info!(addr = %addr, "metrics server listening");

    axum::serve(listener, router(metrics))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| FimError::Server(e.to_string()))?;

    info!(addr = %addr, "metrics server stopped");
    Ok(())
}
