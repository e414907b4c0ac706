//! HTTP adapters - the axum surface of the billing core.
//!
//! - `webhooks` - signed inbound events from the panel and the subscription platform
//! - `broadcasts` - operator trigger for broadcast delivery
//! - `GET /health` - liveness probe

pub mod broadcasts;
mod state;
pub mod webhooks;

pub use state::AppState;

use std::time::Duration;

use axum::{routing::get, Router};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

async fn health() -> &'static str {
    "ok"
}

/// Builds the complete application router.
///
/// Every request gets an `x-request-id`, a tracing span and a hard
/// timeout.
pub fn app_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/webhooks", webhooks::webhook_routes())
        .nest("/broadcasts", broadcasts::broadcast_routes())
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
