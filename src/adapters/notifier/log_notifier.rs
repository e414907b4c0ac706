//! Notifier used when no presentation service is configured.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ExternalId};
use crate::domain::notification::Notification;
use crate::ports::{MessageSender, Notifier, Recipient};

#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(
        &self,
        recipient: &Recipient,
        notification: &Notification,
    ) -> Result<(), DomainError> {
        tracing::info!(
            external_id = %recipient.external_id,
            language = %recipient.language,
            key = notification.i18n_key(),
            notification = ?notification,
            "Notification (no delivery endpoint configured)"
        );
        Ok(())
    }
}

#[async_trait]
impl MessageSender for LogNotifier {
    async fn send(&self, recipient: ExternalId, message: &str) -> Result<(), DomainError> {
        tracing::info!(
            external_id = %recipient,
            length = message.len(),
            "Broadcast message (no delivery endpoint configured)"
        );
        Ok(())
    }
}
