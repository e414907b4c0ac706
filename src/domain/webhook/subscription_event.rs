//! Subscription platform webhook payload.
//!
//! Envelope: `{"name": "...", "created_at": "...", "sent_at": "...", "payload": {...}}`.
//! Amounts arrive in minor units.

use serde::Deserialize;

use crate::domain::foundation::{Currency, ExternalId, Timestamp};

use super::WebhookError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionEvent {
    NewSubscription,
    CancelledSubscription,
    Other(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionWebhook {
    pub name: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub sent_at: Option<String>,
    pub payload: SubscriptionPayload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionPayload {
    pub subscription_id: i64,
    #[serde(default)]
    pub subscription_name: Option<String>,
    #[serde(default)]
    pub period: Option<String>,
    /// Charged amount in minor units
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    pub telegram_user_id: i64,
    #[serde(default)]
    pub expires_at: Option<Timestamp>,
    #[serde(default)]
    pub cancel_reason: Option<String>,
}

impl SubscriptionWebhook {
    pub fn parse(payload: &[u8]) -> Result<Self, WebhookError> {
        serde_json::from_slice(payload).map_err(|e| WebhookError::ParseError(e.to_string()))
    }

    pub fn kind(&self) -> SubscriptionEvent {
        match self.name.as_str() {
            "new_subscription" => SubscriptionEvent::NewSubscription,
            "cancelled_subscription" => SubscriptionEvent::CancelledSubscription,
            other => SubscriptionEvent::Other(other.to_string()),
        }
    }
}

impl SubscriptionPayload {
    pub fn external_id(&self) -> ExternalId {
        ExternalId::new(self.telegram_user_id)
    }

    /// Months covered by one billing period.
    pub fn months(&self) -> Result<u32, WebhookError> {
        let period = self
            .period
            .as_deref()
            .ok_or(WebhookError::MissingField("payload.period"))?;
        period_months(period).ok_or_else(|| {
            WebhookError::ParseError(format!("unknown subscription period '{}'", period))
        })
    }

    /// Amount in whole units of the currency.
    pub fn major_amount(&self) -> Result<i64, WebhookError> {
        self.amount
            .map(|minor| minor / 100)
            .ok_or(WebhookError::MissingField("payload.amount"))
    }

    pub fn currency(&self) -> Result<Currency, WebhookError> {
        self.currency
            .as_deref()
            .ok_or(WebhookError::MissingField("payload.currency"))?
            .parse()
            .map_err(|e: crate::domain::foundation::ValidationError| {
                WebhookError::ParseError(e.to_string())
            })
    }

    /// Correlation id unique per subscription per paid period, so a
    /// redelivered event maps onto the same purchase.
    pub fn correlation_id(&self) -> String {
        match self.expires_at {
            Some(expires_at) => format!("{}:{}", self.subscription_id, expires_at.to_rfc3339()),
            None => self.subscription_id.to_string(),
        }
    }
}

fn period_months(period: &str) -> Option<u32> {
    match period {
        "monthly" => Some(1),
        "quarterly" => Some(3),
        "halfyearly" => Some(6),
        "yearly" => Some(12),
        _ => None,
    }
}
