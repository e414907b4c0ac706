//! Panel API objects as they appear on the wire.
//!
//! Every response is wrapped in a `{"response": ...}` envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ExternalId, Timestamp};
use crate::ports::PanelUser;

#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub response: T,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteUser {
    pub uuid: String,
    pub username: String,
    #[serde(default)]
    pub telegram_id: Option<i64>,
    pub expire_at: DateTime<Utc>,
    #[serde(default)]
    pub hwid_device_limit: Option<u32>,
    #[serde(default)]
    pub traffic_limit_bytes: i64,
}

impl From<RemoteUser> for PanelUser {
    fn from(user: RemoteUser) -> Self {
        PanelUser {
            uuid: user.uuid,
            username: user.username,
            external_id: user.telegram_id.map(ExternalId::new),
            expire_at: Timestamp::from_datetime(user.expire_at),
            device_limit: user.hwid_device_limit,
            traffic_limit_bytes: user.traffic_limit_bytes,
        }
    }
}

/// Traffic resets monthly for paid accounts; trials never reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrafficLimitStrategy {
    NoReset,
    Month,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserBody {
    pub username: String,
    pub telegram_id: i64,
    pub expire_at: DateTime<Utc>,
    pub traffic_limit_bytes: i64,
    pub traffic_limit_strategy: TrafficLimitStrategy,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub active_internal_squads: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hwid_device_limit: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserBody {
    pub uuid: String,
    pub expire_at: DateTime<Utc>,
    pub traffic_limit_bytes: i64,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hwid_device_limit: Option<u32>,
}
