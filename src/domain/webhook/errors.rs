//! Webhook error types.
//!
//! Every error maps to the HTTP status the source sees, which decides
//! whether it redelivers.

use http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode};

#[derive(Debug, Error)]
pub enum WebhookError {
    /// Signature header absent while a secret is configured.
    #[error("Missing signature")]
    MissingSignature,

    /// Signature does not match the body.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Body is not the expected JSON shape.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A field the event needs is absent.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// The event names a customer this system does not know.
    #[error("Customer not found")]
    CustomerNotFound,

    /// Event acknowledged without action.
    #[error("Event ignored: {0}")]
    Ignored(String),

    /// Ledger or customer store failed.
    #[error("Database error: {0}")]
    Database(String),

    /// Panel or payment provider failed while processing.
    #[error("Upstream error: {0}")]
    Upstream(String),
}

impl WebhookError {
    /// True if the source should redeliver.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WebhookError::Database(_) | WebhookError::Upstream(_))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::MissingSignature | WebhookError::InvalidSignature => {
                StatusCode::UNAUTHORIZED
            }

            WebhookError::ParseError(_) | WebhookError::MissingField(_) => StatusCode::BAD_REQUEST,

            // soft failures are acknowledged so the source stops retrying
            WebhookError::CustomerNotFound | WebhookError::Ignored(_) => StatusCode::OK,

            WebhookError::Database(_) | WebhookError::Upstream(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::CustomerNotFound => WebhookError::CustomerNotFound,
            ErrorCode::DatabaseError => WebhookError::Database(err.message),
            _ => WebhookError::Upstream(err.to_string()),
        }
    }
}
