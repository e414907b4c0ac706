//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid listen address '{0}': expected host:port with a non-zero port")]
    InvalidListenAddr(String),

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool max_size must be positive and at least min_idle")]
    InvalidPoolSize,

    #[error("Pool max_size exceeds {0}")]
    PoolSizeTooLarge(u32),

    #[error("Invalid URL for {0}: must start with http:// or https://")]
    InvalidUrl(&'static str),

    #[error("Invalid interval for {0}: must be greater than zero")]
    InvalidInterval(&'static str),

    #[error("Backoff attempts must be between 1 and 10")]
    InvalidBackoff,

    #[error("days_per_month must be between 1 and 31")]
    InvalidDaysPerMonth,

    #[error("Tariff table is empty")]
    NoTariffs,

    #[error("Invalid tariff '{0}': price, devices and months must be positive")]
    InvalidTariff(String),

    #[error("Duplicate tariff name '{0}'")]
    DuplicateTariff(String),

    #[error("Invalid winback offer settings")]
    InvalidWinback,

    #[error("Invalid trial settings")]
    InvalidTrial,
}
