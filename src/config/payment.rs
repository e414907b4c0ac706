//! Payment provider configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Payment configuration for the card processor and the crypto processor.
///
/// A provider is enabled when its credentials are present; disabled
/// providers get neither a checkout path nor a reconciliation loop.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Card processor shop id
    #[serde(default)]
    pub card_shop_id: String,

    /// Card processor secret key
    #[serde(default)]
    pub card_secret_key: String,

    /// Card processor API base URL
    #[serde(default = "default_card_base_url")]
    pub card_base_url: String,

    /// URL the customer is sent back to after card confirmation
    #[serde(default)]
    pub card_return_url: String,

    /// Customer email put on fiscal receipts
    #[serde(default = "default_receipt_email")]
    pub card_receipt_email: String,

    /// Delay between per-purchase card status queries, in milliseconds
    #[serde(default = "default_card_request_delay")]
    pub card_request_delay_ms: u64,

    /// Crypto processor API token
    #[serde(default)]
    pub crypto_token: String,

    /// Crypto processor API base URL
    #[serde(default = "default_crypto_base_url")]
    pub crypto_base_url: String,

    /// Outbound request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Attempts made on rate-limit / 5xx responses before giving up for a tick
    #[serde(default = "default_backoff_attempts")]
    pub backoff_attempts: u32,

    /// First backoff delay in milliseconds; doubles on each attempt
    #[serde(default = "default_backoff_base")]
    pub backoff_base_ms: u64,
}

impl PaymentConfig {
    pub fn is_card_enabled(&self) -> bool {
        !self.card_shop_id.is_empty() && !self.card_secret_key.is_empty()
    }

    pub fn is_crypto_enabled(&self) -> bool {
        !self.crypto_token.is_empty()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn card_request_delay(&self) -> Duration {
        Duration::from_millis(self.card_request_delay_ms)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.card_shop_id.is_empty() != self.card_secret_key.is_empty() {
            return Err(ValidationError::MissingRequired(
                "PAYMENT__CARD_SHOP_ID and PAYMENT__CARD_SECRET_KEY",
            ));
        }
        if self.is_card_enabled() {
            if !is_http_url(&self.card_base_url) {
                return Err(ValidationError::InvalidUrl("payment.card_base_url"));
            }
            if !is_http_url(&self.card_return_url) {
                return Err(ValidationError::InvalidUrl("payment.card_return_url"));
            }
        }
        if self.is_crypto_enabled() && !is_http_url(&self.crypto_base_url) {
            return Err(ValidationError::InvalidUrl("payment.crypto_base_url"));
        }
        if self.timeout_secs == 0 || self.timeout_secs > 9 {
            return Err(ValidationError::InvalidTimeout);
        }
        if self.backoff_attempts == 0 || self.backoff_attempts > 10 {
            return Err(ValidationError::InvalidBackoff);
        }
        Ok(())
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            card_shop_id: String::new(),
            card_secret_key: String::new(),
            card_base_url: default_card_base_url(),
            card_return_url: String::new(),
            card_receipt_email: default_receipt_email(),
            card_request_delay_ms: default_card_request_delay(),
            crypto_token: String::new(),
            crypto_base_url: default_crypto_base_url(),
            timeout_secs: default_timeout(),
            backoff_attempts: default_backoff_attempts(),
            backoff_base_ms: default_backoff_base(),
        }
    }
}

fn default_card_base_url() -> String {
    "https://api.yookassa.ru/v3".to_string()
}

fn default_crypto_base_url() -> String {
    "https://pay.crypt.bot/api".to_string()
}

fn default_receipt_email() -> String {
    "receipts@example.com".to_string()
}

fn default_card_request_delay() -> u64 {
    300
}

fn default_timeout() -> u64 {
    5
}

fn default_backoff_attempts() -> u32 {
    5
}

fn default_backoff_base() -> u64 {
    1000
}
