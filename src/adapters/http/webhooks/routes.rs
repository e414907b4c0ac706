//! Axum router for the webhook endpoints.

use axum::{routing::post, Router};

use super::super::state::AppState;
use super::handlers::{handle_panel_webhook, handle_subscription_webhook};

/// Create the webhook router.
///
/// # Routes
/// - `POST /panel` - VPN panel user events
/// - `POST /subscription` - subscription platform events
///
/// No authentication middleware: each source is verified by its HMAC
/// signature header.
pub fn webhook_routes() -> Router<AppState> {
    Router::new()
        .route("/panel", post(handle_panel_webhook))
        .route("/subscription", post(handle_subscription_webhook))
}
