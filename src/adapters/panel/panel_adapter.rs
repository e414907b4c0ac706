//! HTTP adapter for the VPN panel API.
//!
//! Implements the `VpnPanel` port. Accounts are looked up by the
//! customer's chat-platform id and addressed by the panel's uuid.
//!
//! # Configuration
//!
//! ```ignore
//! let config = PanelApiConfig::new(base_url, token).with_squads(squads);
//! let adapter = PanelApiAdapter::new(config)?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use crate::config::PanelConfig;
use crate::domain::foundation::ExternalId;
use crate::ports::{CreatePanelUser, PanelError, PanelUser, UpdatePanelUser, VpnPanel};

use super::wire_types::{
    CreateUserBody, Envelope, RemoteUser, TrafficLimitStrategy, UpdateUserBody,
};

/// Panel API configuration.
#[derive(Clone)]
pub struct PanelApiConfig {
    base_url: String,
    token: SecretString,
    squads: Vec<String>,
    timeout: Duration,
}

impl PanelApiConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: SecretString::new(token.into()),
            squads: Vec::new(),
            timeout: Duration::from_secs(5),
        }
    }

    /// Internal squads new accounts are attached to.
    pub fn with_squads(mut self, squads: Vec<String>) -> Self {
        self.squads = squads;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl From<&PanelConfig> for PanelApiConfig {
    fn from(config: &PanelConfig) -> Self {
        PanelApiConfig::new(config.base_url.clone(), config.token.clone())
            .with_squads(config.squad_list())
            .with_timeout(config.timeout())
    }
}

pub struct PanelApiAdapter {
    config: PanelApiConfig,
    http_client: reqwest::Client,
}

impl PanelApiAdapter {
    pub fn new(config: PanelApiConfig) -> Result<Self, PanelError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PanelError::Network(e.to_string()))?;
        Ok(Self {
            config,
            http_client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    /// Sends the request and unwraps the response envelope.
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        operation: &'static str,
    ) -> Result<T, PanelError> {
        let response = request
            .bearer_auth(self.config.token.expose_secret())
            .send()
            .await
            .map_err(|e| PanelError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(
                operation,
                status = status.as_u16(),
                error = %error_text,
                "Panel request failed"
            );
            return Err(PanelError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| PanelError::Decode(format!("{}: {}", operation, e)))?;
        Ok(envelope.response)
    }
}

#[async_trait]
impl VpnPanel for PanelApiAdapter {
    async fn find_user(&self, external_id: ExternalId) -> Result<Option<PanelUser>, PanelError> {
        let url = self.url(&format!("/users/by-telegram-id/{}", external_id));
        let request = self.http_client.get(&url);

        // The panel answers 404 rather than an empty list for unknown ids.
        let users: Vec<RemoteUser> = match self.send(request, "find_user").await {
            Ok(users) => users,
            Err(PanelError::Api { status: 404, .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        Ok(users.into_iter().next().map(PanelUser::from))
    }

    async fn create_user(&self, request: CreatePanelUser) -> Result<PanelUser, PanelError> {
        let strategy = if request.is_trial {
            TrafficLimitStrategy::NoReset
        } else {
            TrafficLimitStrategy::Month
        };
        let body = CreateUserBody {
            username: request.username,
            telegram_id: request.external_id.as_i64(),
            expire_at: *request.expire_at.as_datetime(),
            traffic_limit_bytes: request.traffic_limit_bytes,
            traffic_limit_strategy: strategy,
            active_internal_squads: self.config.squads.clone(),
            hwid_device_limit: request.device_limit,
        };

        let user: RemoteUser = self
            .send(self.http_client.post(self.url("/users")).json(&body), "create_user")
            .await?;

        tracing::info!(
            external_id = %request.external_id,
            uuid = %user.uuid,
            is_trial = request.is_trial,
            "Panel user created"
        );
        Ok(user.into())
    }

    async fn update_user(&self, request: UpdatePanelUser) -> Result<PanelUser, PanelError> {
        let body = UpdateUserBody {
            uuid: request.uuid,
            expire_at: *request.expire_at.as_datetime(),
            traffic_limit_bytes: request.traffic_limit_bytes,
            status: "ACTIVE",
            hwid_device_limit: request.device_limit,
        };

        let user: RemoteUser = self
            .send(self.http_client.patch(self.url("/users")).json(&body), "update_user")
            .await?;
        Ok(user.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_trims_trailing_slash() {
        let config = PanelApiConfig::new("https://panel.example.com/api/", "token");
        assert_eq!(config.base_url, "https://panel.example.com/api");
    }

    #[test]
    fn config_from_app_config_carries_squads_and_timeout() {
        let app = PanelConfig {
            base_url: "https://panel.example.com/api".to_string(),
            token: "token".to_string(),
            traffic_limit_bytes: 0,
            squads: Some("a, b,".to_string()),
            timeout_secs: 3,
        };
        let config = PanelApiConfig::from(&app);
        assert_eq!(config.squads, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(config.timeout, Duration::from_secs(3));
    }

    #[test]
    fn adapter_builds_urls_from_base() {
        let adapter =
            PanelApiAdapter::new(PanelApiConfig::new("http://localhost:3000/api", "t")).unwrap();
        assert_eq!(
            adapter.url("/users/by-telegram-id/42"),
            "http://localhost:3000/api/users/by-telegram-id/42"
        );
    }

    #[tokio::test]
    async fn unreachable_panel_is_a_retryable_network_error() {
        let adapter = PanelApiAdapter::new(
            PanelApiConfig::new("http://127.0.0.1:1", "t").with_timeout(Duration::from_secs(1)),
        )
        .unwrap();
        let err = adapter.find_user(ExternalId::new(42)).await.unwrap_err();
        assert!(matches!(err, PanelError::Network(_)));
        assert!(err.is_retryable());
    }
}
