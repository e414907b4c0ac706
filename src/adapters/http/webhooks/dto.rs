//! Response bodies for the webhook and broadcast endpoints.

use serde::Serialize;

/// Error body returned alongside any non-2xx status.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Acknowledgement sent to a webhook source.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    pub status: &'static str,
    /// Short machine-readable description of what the event caused.
    pub outcome: String,
}

impl WebhookAck {
    pub fn ok(outcome: impl Into<String>) -> Self {
        Self {
            status: "ok",
            outcome: outcome.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BroadcastStartResponse {
    pub broadcast_id: i64,
    pub status: String,
}
