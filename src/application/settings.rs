//! Immutable billing settings handed to every handler at construction.
//!
//! Built once from the validated [`AppConfig`]; handlers never read the
//! configuration or the environment on their own.

use std::time::Duration;

use crate::config::{AppConfig, BillingConfig, PaymentConfig};
use crate::domain::tariff::{Tariff, TariffCatalog};

/// Minimum gap between two "you will be charged" notices.
const RECURRING_NOTICE_GAP_HOURS: i64 = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialSettings {
    pub enabled: bool,
    pub days: i64,
    pub traffic_limit_bytes: i64,
    pub device_limit: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinbackSettings {
    pub enabled: bool,
    pub price: i64,
    pub devices: u32,
    pub months: u32,
    pub valid_hours: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingSettings {
    pub days_per_month: i64,
    /// Traffic limit applied to paid accounts; 0 means unlimited.
    pub traffic_limit_bytes: i64,
    pub recurring_enabled: bool,
    pub recurring_guard_minutes: i64,
    pub recurring_notice_gap_hours: i64,
    pub trial: TrialSettings,
    pub winback: WinbackSettings,
    pub tariffs: TariffCatalog,
}

impl BillingSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self::from_parts(&config.billing, config.panel.traffic_limit_bytes)
    }

    pub fn from_parts(billing: &BillingConfig, traffic_limit_bytes: i64) -> Self {
        let tariffs = billing
            .tariffs
            .iter()
            .map(|t| Tariff {
                name: t.name.clone(),
                price: t.price,
                stars_price: t.stars_price,
                devices: t.devices,
                months: t.months,
            })
            .collect();

        Self {
            days_per_month: billing.days_per_month,
            traffic_limit_bytes,
            recurring_enabled: billing.recurring_enabled,
            recurring_guard_minutes: billing.recurring_guard_minutes,
            recurring_notice_gap_hours: RECURRING_NOTICE_GAP_HOURS,
            trial: TrialSettings {
                enabled: billing.trial.enabled,
                days: billing.trial.days,
                traffic_limit_bytes: billing.trial.traffic_limit_bytes,
                device_limit: billing.trial.device_limit,
            },
            winback: WinbackSettings {
                enabled: billing.winback.enabled,
                price: billing.winback.price,
                devices: billing.winback.devices,
                months: billing.winback.months,
                valid_hours: billing.winback.valid_hours,
            },
            tariffs: TariffCatalog::new(tariffs),
        }
    }
}

impl Default for BillingSettings {
    fn default() -> Self {
        Self::from_parts(&BillingConfig::default(), 0)
    }
}

/// Pacing for the card reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileSettings {
    /// Pause between two card lookups.
    pub request_delay: Duration,
    /// Attempts per lookup, the first included.
    pub backoff_attempts: u32,
    /// Wait before the first retry; doubles for every later one.
    pub backoff_base: Duration,
}

impl ReconcileSettings {
    pub fn from_config(payment: &PaymentConfig) -> Self {
        Self {
            request_delay: payment.card_request_delay(),
            backoff_attempts: payment.backoff_attempts,
            backoff_base: payment.backoff_base(),
        }
    }

    /// No waiting at all; tests use this.
    pub fn immediate() -> Self {
        Self {
            request_delay: Duration::ZERO,
            backoff_attempts: 5,
            backoff_base: Duration::ZERO,
        }
    }
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self::from_config(&PaymentConfig::default())
    }
}
