//! Billing configuration: tariffs, feature toggles and timers

use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

use super::error::ValidationError;

/// Billing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Days granted per purchased month
    #[serde(default = "default_days_per_month")]
    pub days_per_month: i64,

    /// Card processor reconciliation interval in seconds
    #[serde(default = "default_card_interval")]
    pub card_reconcile_interval_secs: u64,

    /// Crypto processor reconciliation interval in seconds
    #[serde(default = "default_crypto_interval")]
    pub crypto_reconcile_interval_secs: u64,

    /// Whether autonomous recurring charges are enabled
    #[serde(default)]
    pub recurring_enabled: bool,

    /// A paid purchase younger than this blocks a recurring charge
    #[serde(default = "default_recurring_guard")]
    pub recurring_guard_minutes: i64,

    /// Trial settings
    #[serde(default)]
    pub trial: TrialConfig,

    /// Winback offer settings
    #[serde(default)]
    pub winback: WinbackConfig,

    /// Tariff table
    #[serde(default = "default_tariffs")]
    pub tariffs: Vec<TariffConfig>,
}

/// Trial settings
#[derive(Debug, Clone, Deserialize)]
pub struct TrialConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_trial_days")]
    pub days: i64,

    /// Trial traffic limit in bytes; 0 means unlimited
    #[serde(default = "default_trial_traffic")]
    pub traffic_limit_bytes: i64,

    #[serde(default = "default_trial_devices")]
    pub device_limit: u32,
}

/// Winback offer settings
#[derive(Debug, Clone, Deserialize)]
pub struct WinbackConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_winback_price")]
    pub price: i64,

    #[serde(default = "default_winback_devices")]
    pub devices: u32,

    #[serde(default = "default_winback_months")]
    pub months: u32,

    /// Offer lifetime after issuance
    #[serde(default = "default_winback_valid_hours")]
    pub valid_hours: i64,
}

/// One row of the tariff table
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TariffConfig {
    pub name: String,
    /// Price in roubles for the whole period
    pub price: i64,
    /// Price in chat-native stars; chat-native checkout is unavailable when unset
    pub stars_price: Option<i64>,
    pub devices: u32,
    pub months: u32,
}

impl BillingConfig {
    pub fn card_reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.card_reconcile_interval_secs)
    }

    pub fn crypto_reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.crypto_reconcile_interval_secs)
    }

    /// Validate billing configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(1..=31).contains(&self.days_per_month) {
            return Err(ValidationError::InvalidDaysPerMonth);
        }
        if self.card_reconcile_interval_secs == 0 {
            return Err(ValidationError::InvalidInterval("billing.card_reconcile_interval_secs"));
        }
        if self.crypto_reconcile_interval_secs == 0 {
            return Err(ValidationError::InvalidInterval(
                "billing.crypto_reconcile_interval_secs",
            ));
        }
        if self.recurring_guard_minutes < 0 {
            return Err(ValidationError::InvalidInterval("billing.recurring_guard_minutes"));
        }
        if self.tariffs.is_empty() {
            return Err(ValidationError::NoTariffs);
        }

        let mut seen = HashSet::new();
        for tariff in &self.tariffs {
            if tariff.name.trim().is_empty()
                || tariff.price <= 0
                || tariff.devices == 0
                || tariff.months == 0
                || tariff.stars_price.map_or(false, |p| p <= 0)
            {
                return Err(ValidationError::InvalidTariff(tariff.name.clone()));
            }
            if !seen.insert(tariff.name.as_str()) {
                return Err(ValidationError::DuplicateTariff(tariff.name.clone()));
            }
        }

        if self.winback.enabled
            && (self.winback.price <= 0
                || self.winback.devices == 0
                || self.winback.months == 0
                || self.winback.valid_hours <= 0)
        {
            return Err(ValidationError::InvalidWinback);
        }

        if self.trial.enabled && (self.trial.days <= 0 || self.trial.traffic_limit_bytes < 0) {
            return Err(ValidationError::InvalidTrial);
        }

        Ok(())
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            days_per_month: default_days_per_month(),
            card_reconcile_interval_secs: default_card_interval(),
            crypto_reconcile_interval_secs: default_crypto_interval(),
            recurring_enabled: false,
            recurring_guard_minutes: default_recurring_guard(),
            trial: TrialConfig::default(),
            winback: WinbackConfig::default(),
            tariffs: default_tariffs(),
        }
    }
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            days: default_trial_days(),
            traffic_limit_bytes: default_trial_traffic(),
            device_limit: default_trial_devices(),
        }
    }
}

impl Default for WinbackConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            price: default_winback_price(),
            devices: default_winback_devices(),
            months: default_winback_months(),
            valid_hours: default_winback_valid_hours(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_days_per_month() -> i64 {
    30
}

fn default_card_interval() -> u64 {
    30
}

fn default_crypto_interval() -> u64 {
    15
}

fn default_recurring_guard() -> i64 {
    1
}

fn default_trial_days() -> i64 {
    3
}

fn default_trial_traffic() -> i64 {
    10 * 1024 * 1024 * 1024
}

fn default_trial_devices() -> u32 {
    1
}

fn default_winback_price() -> i64 {
    100
}

fn default_winback_devices() -> u32 {
    1
}

fn default_winback_months() -> u32 {
    1
}

fn default_winback_valid_hours() -> i64 {
    48
}

fn default_tariffs() -> Vec<TariffConfig> {
    vec![
        TariffConfig {
            name: "basic".to_string(),
            price: 150,
            stars_price: Some(100),
            devices: 3,
            months: 1,
        },
        TariffConfig {
            name: "basic_quarter".to_string(),
            price: 400,
            stars_price: Some(270),
            devices: 3,
            months: 3,
        },
    ]
}
