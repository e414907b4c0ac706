//! Notification delivery port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ExternalId};
use crate::domain::notification::Notification;

/// Who a notification goes to and in which language it is rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub external_id: ExternalId,
    pub language: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        recipient: &Recipient,
        notification: &Notification,
    ) -> Result<(), DomainError>;
}
