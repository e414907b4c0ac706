//! HTTP adapter for starting broadcasts.
//!
//! - `POST /broadcasts/:id/start` - spawn the delivery task for a stored broadcast

pub mod handlers;

use axum::{routing::post, Router};

use super::state::AppState;

pub fn broadcast_routes() -> Router<AppState> {
    Router::new().route("/:id/start", post(handlers::start_broadcast))
}
