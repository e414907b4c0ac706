//! HTTP handlers for the inbound webhook endpoints.
//!
//! The raw body is handed to the application layer untouched because
//! the signature covers the exact bytes.

use axum::body::Bytes;
use axum::extract::{Json, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;

use crate::application::handlers::{
    HandlePanelWebhookCommand, HandleSubscriptionWebhookCommand, PanelWebhookResult,
    RecurringOutcome, SubscriptionWebhookResult, WinbackIssue,
};
use crate::domain::webhook::WebhookError;

use super::super::state::AppState;
use super::dto::{ErrorResponse, WebhookAck};

pub const PANEL_SIGNATURE_HEADER: &str = "X-Remnawave-Signature";
pub const SUBSCRIPTION_SIGNATURE_HEADER: &str = "trbt-signature";

fn signature(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// POST /webhooks/panel
pub async fn handle_panel_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    let handler = state.panel_webhook_handler();
    let cmd = HandlePanelWebhookCommand {
        payload: body.to_vec(),
        signature: signature(&headers, PANEL_SIGNATURE_HEADER),
    };

    let result = handler.handle(cmd).await?;
    let outcome = panel_outcome(&result);
    tracing::debug!(outcome = %outcome, "Panel webhook processed");

    Ok(Json(WebhookAck::ok(outcome)))
}

/// POST /webhooks/subscription
pub async fn handle_subscription_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    let handler = state.subscription_webhook_handler();
    let cmd = HandleSubscriptionWebhookCommand {
        payload: body.to_vec(),
        signature: signature(&headers, SUBSCRIPTION_SIGNATURE_HEADER),
    };

    let result = handler.handle(cmd).await?;
    let outcome = subscription_outcome(&result);
    tracing::debug!(outcome = %outcome, "Subscription webhook processed");

    Ok(Json(WebhookAck::ok(outcome)))
}

fn panel_outcome(result: &PanelWebhookResult) -> String {
    match result {
        PanelWebhookResult::NeverConnected => "never_connected".to_string(),
        PanelWebhookResult::Ignored => "ignored".to_string(),
        PanelWebhookResult::Notified(key) => format!("notified:{}", key),
        PanelWebhookResult::NoticeThrottled => "notice_throttled".to_string(),
        PanelWebhookResult::Recurring(outcome) => match outcome {
            RecurringOutcome::NotEligible => "recurring:not_eligible",
            RecurringOutcome::SkippedRecentPayment => "recurring:skipped_recent_payment",
            RecurringOutcome::Charged { .. } => "recurring:charged",
            RecurringOutcome::AwaitingSettlement => "recurring:awaiting_settlement",
            RecurringOutcome::PermissionRevoked => "recurring:permission_revoked",
            RecurringOutcome::Failed => "recurring:failed",
        }
        .to_string(),
        PanelWebhookResult::Winback(issue) => match issue {
            WinbackIssue::Issued(_) => "winback:issued",
            WinbackIssue::Disabled => "winback:disabled",
            WinbackIssue::HasPaid => "winback:has_paid",
            WinbackIssue::AlreadyActive => "winback:already_active",
        }
        .to_string(),
    }
}

fn subscription_outcome(result: &SubscriptionWebhookResult) -> String {
    match result {
        SubscriptionWebhookResult::Extended { .. } => "extended",
        SubscriptionWebhookResult::Duplicate => "duplicate",
        SubscriptionWebhookResult::CancellationNoted => "cancellation_noted",
        SubscriptionWebhookResult::Ignored => "ignored",
    }
    .to_string()
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// Converts webhook errors into the status the source acts on.
pub struct WebhookApiError(WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.0.status_code();
        let code = match &self.0 {
            WebhookError::MissingSignature => "MISSING_SIGNATURE",
            WebhookError::InvalidSignature => "INVALID_SIGNATURE",
            WebhookError::ParseError(_) => "INVALID_PAYLOAD",
            WebhookError::MissingField(_) => "MISSING_FIELD",
            WebhookError::CustomerNotFound => "CUSTOMER_NOT_FOUND",
            WebhookError::Ignored(_) => "IGNORED",
            WebhookError::Database(_) => "DATABASE_ERROR",
            WebhookError::Upstream(_) => "UPSTREAM_ERROR",
        };

        if self.0.is_retryable() {
            tracing::error!(error = %self.0, "Webhook processing failed; source will retry");
        } else if status == StatusCode::OK {
            tracing::info!(reason = %self.0, "Webhook acknowledged without action");
        } else {
            tracing::warn!(error = %self.0, status = status.as_u16(), "Webhook rejected");
        }

        (status, Json(ErrorResponse::new(code, self.0.to_string()))).into_response()
    }
}
