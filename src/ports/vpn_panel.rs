//! VPN panel port.
//!
//! The panel is the source of truth for an account's expiry and device
//! limit; the customer store only mirrors the expiry.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, ExternalId, Timestamp};

/// An account as the panel reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelUser {
    pub uuid: String,
    pub username: String,
    pub external_id: Option<ExternalId>,
    pub expire_at: Timestamp,
    /// `None` when device limiting is disabled for this account
    pub device_limit: Option<u32>,
    pub traffic_limit_bytes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePanelUser {
    pub external_id: ExternalId,
    pub username: String,
    pub expire_at: Timestamp,
    pub traffic_limit_bytes: i64,
    pub device_limit: Option<u32>,
    pub is_trial: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePanelUser {
    pub uuid: String,
    pub expire_at: Timestamp,
    pub traffic_limit_bytes: i64,
    /// `None` leaves the panel's current setting untouched
    pub device_limit: Option<u32>,
}

#[async_trait]
pub trait VpnPanel: Send + Sync {
    async fn find_user(&self, external_id: ExternalId) -> Result<Option<PanelUser>, PanelError>;

    async fn create_user(&self, request: CreatePanelUser) -> Result<PanelUser, PanelError>;

    /// Also re-activates a disabled or expired account.
    async fn update_user(&self, request: UpdatePanelUser) -> Result<PanelUser, PanelError>;
}

#[derive(Debug, Clone, Error)]
pub enum PanelError {
    #[error("Panel request failed: {0}")]
    Network(String),

    #[error("Panel returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected panel response: {0}")]
    Decode(String),
}

impl PanelError {
    pub fn is_retryable(&self) -> bool {
        match self {
            PanelError::Network(_) => true,
            PanelError::Api { status, .. } => *status == 429 || *status >= 500,
            PanelError::Decode(_) => false,
        }
    }
}

impl From<PanelError> for DomainError {
    fn from(err: PanelError) -> Self {
        DomainError::new(ErrorCode::PanelError, err.to_string())
    }
}
