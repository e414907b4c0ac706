//! Presentation service client.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::domain::foundation::{DomainError, ErrorCode, ExternalId};
use crate::domain::notification::Notification;
use crate::ports::{MessageSender, Notifier, Recipient};

#[derive(Clone)]
pub struct HttpNotifierConfig {
    base_url: String,
    token: Option<SecretString>,
    timeout: Duration,
}

impl HttpNotifierConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(SecretString::new(token.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Serialize)]
struct NotificationBody<'a> {
    external_id: ExternalId,
    language: &'a str,
    key: &'static str,
    notification: &'a Notification,
}

#[derive(Debug, Serialize)]
struct MessageBody<'a> {
    external_id: ExternalId,
    text: &'a str,
}

pub struct HttpNotifier {
    config: HttpNotifierConfig,
    http_client: reqwest::Client,
}

impl HttpNotifier {
    pub fn new(config: HttpNotifierConfig) -> Result<Self, DomainError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DomainError::new(ErrorCode::NotifierError, e.to_string()))?;
        Ok(Self {
            config,
            http_client,
        })
    }

    async fn post<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<(), DomainError> {
        let url = format!("{}{}", self.config.base_url, path);
        let mut request = self.http_client.post(&url).json(body);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await.map_err(|e| {
            DomainError::new(
                ErrorCode::NotifierError,
                format!("Notifier request failed: {}", e),
            )
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            return Err(DomainError::new(
                ErrorCode::NotifierError,
                format!("Notifier returned {}: {}", status, error_text),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn notify(
        &self,
        recipient: &Recipient,
        notification: &Notification,
    ) -> Result<(), DomainError> {
        let body = NotificationBody {
            external_id: recipient.external_id,
            language: &recipient.language,
            key: notification.i18n_key(),
            notification,
        };
        self.post("/notifications", &body).await
    }
}

#[async_trait]
impl MessageSender for HttpNotifier {
    async fn send(&self, recipient: ExternalId, message: &str) -> Result<(), DomainError> {
        let body = MessageBody {
            external_id: recipient,
            text: message,
        };
        self.post("/messages", &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_body_carries_key_and_tagged_payload() {
        let notification = Notification::RecurringChargeFailed;
        let body = NotificationBody {
            external_id: ExternalId::new(42),
            language: "ru",
            key: notification.i18n_key(),
            notification: &notification,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["external_id"], 42);
        assert_eq!(json["key"], notification.i18n_key());
        assert_eq!(json["notification"]["type"], "recurring_charge_failed");
    }

    #[tokio::test]
    async fn unreachable_service_reports_notification_error() {
        let notifier = HttpNotifier::new(
            HttpNotifierConfig::new("http://127.0.0.1:1").with_timeout(Duration::from_secs(1)),
        )
        .unwrap();
        let err = notifier
            .send(ExternalId::new(42), "hello")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotifierError);
    }
}
