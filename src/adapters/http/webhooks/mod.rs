//! HTTP adapter for inbound webhooks.
//!
//! - `POST /webhooks/panel` - signed by `X-Remnawave-Signature`
//! - `POST /webhooks/subscription` - signed by `trbt-signature`
//!
//! Soft failures (unknown customer, ignored event) answer 200 so the
//! source stops redelivering; internal failures answer 500 so it retries.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::{BroadcastStartResponse, ErrorResponse, WebhookAck};
pub use handlers::{PANEL_SIGNATURE_HEADER, SUBSCRIPTION_SIGNATURE_HEADER};
pub use routes::webhook_routes;
