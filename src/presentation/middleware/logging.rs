//! Request Tracing
//!
//! Spans carry the path only. The query string is left out because the chat
//! upgrade carries the bearer token there.

use std::time::Duration;

use axum::http::{Request, Response};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::{Level, Span};

use crate::startup::AppState;

/// Wrap the router in an HTTP trace layer (request span + status and latency)
pub fn add_tracing(router: Router<AppState>) -> Router<AppState> {
    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(|req: &Request<_>| {
                let method = req.method().clone();
                let path = req.uri().path().to_string();
                tracing::span!(Level::INFO, "http", %method, %path)
            })
            .on_response(|res: &Response<_>, latency: Duration, _span: &Span| {
                tracing::debug!(
                    status = %res.status(),
                    elapsed_ms = latency.as_millis() as u64,
                    "response"
                );
            }),
    )
}
