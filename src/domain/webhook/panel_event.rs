//! VPN panel webhook payload.
//!
//! Envelope: `{"event": "...", "data": {...user...}, "timestamp": "..."}`.

use serde::Deserialize;

use crate::domain::foundation::{ExternalId, Timestamp};

use super::WebhookError;

/// Panel events this core reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelEvent {
    ExpiresIn24Hours,
    Expired,
    Expired24HoursAgo,
    Other(String),
}

impl PanelEvent {
    pub fn parse(name: &str) -> Self {
        match name {
            "user.expires_in_24_hours" => PanelEvent::ExpiresIn24Hours,
            "user.expired" => PanelEvent::Expired,
            "user.expired_24_hours_ago" => PanelEvent::Expired24HoursAgo,
            other => PanelEvent::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PanelWebhook {
    pub event: String,
    pub data: PanelUserData,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelUserData {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub telegram_id: Option<i64>,
    #[serde(default)]
    pub expire_at: Option<Timestamp>,
    #[serde(default)]
    pub first_connected_at: Option<Timestamp>,
    /// Newer panel versions nest connection stats here.
    #[serde(default)]
    pub user_traffic: Option<PanelUserTraffic>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelUserTraffic {
    #[serde(default)]
    pub first_connected_at: Option<Timestamp>,
}

impl PanelWebhook {
    pub fn parse(payload: &[u8]) -> Result<Self, WebhookError> {
        serde_json::from_slice(payload).map_err(|e| WebhookError::ParseError(e.to_string()))
    }

    pub fn kind(&self) -> PanelEvent {
        PanelEvent::parse(&self.event)
    }
}

impl PanelUserData {
    /// First connection time from either payload layout.
    pub fn first_connected_at(&self) -> Option<Timestamp> {
        self.first_connected_at.or_else(|| {
            self.user_traffic
                .as_ref()
                .and_then(|t| t.first_connected_at)
        })
    }

    pub fn external_id(&self) -> Result<ExternalId, WebhookError> {
        self.telegram_id
            .map(ExternalId::new)
            .ok_or(WebhookError::MissingField("data.telegramId"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flat_layout() {
        let body = br#"{
            "event": "user.expired",
            "data": {
                "uuid": "0b6c",
                "username": "tg_42",
                "telegramId": 42,
                "expireAt": "2024-06-01T00:00:00Z",
                "firstConnectedAt": "2024-05-01T00:00:00Z"
            },
            "timestamp": "2024-06-01T00:00:01Z"
        }"#;
        let hook = PanelWebhook::parse(body).unwrap();
        assert_eq!(hook.kind(), PanelEvent::Expired);
        assert_eq!(hook.data.external_id().unwrap(), ExternalId::new(42));
        assert!(hook.data.first_connected_at().is_some());
    }

    #[test]
    fn parses_nested_traffic_layout() {
        let body = br#"{
            "event": "user.expires_in_24_hours",
            "data": {
                "telegramId": 7,
                "userTraffic": { "firstConnectedAt": "2024-05-01T00:00:00Z" }
            }
        }"#;
        let hook = PanelWebhook::parse(body).unwrap();
        assert_eq!(hook.kind(), PanelEvent::ExpiresIn24Hours);
        assert!(hook.data.first_connected_at().is_some());
    }

    #[test]
    fn missing_first_connection_is_none() {
        let body = br#"{"event":"user.expired_24_hours_ago","data":{"telegramId":7,"firstConnectedAt":null}}"#;
        let hook = PanelWebhook::parse(body).unwrap();
        assert_eq!(hook.kind(), PanelEvent::Expired24HoursAgo);
        assert!(hook.data.first_connected_at().is_none());
    }

    #[test]
    fn unknown_event_is_other() {
        assert_eq!(
            PanelEvent::parse("user.modified"),
            PanelEvent::Other("user.modified".to_string())
        );
    }

    #[test]
    fn missing_telegram_id_is_missing_field() {
        let data = PanelUserData::default();
        assert!(matches!(
            data.external_id(),
            Err(WebhookError::MissingField(_))
        ));
    }

    #[test]
    fn invalid_json_is_parse_error() {
        assert!(matches!(
            PanelWebhook::parse(b"{not json"),
            Err(WebhookError::ParseError(_))
        ));
    }
}
