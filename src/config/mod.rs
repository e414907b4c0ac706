//! Application configuration module
//!
//! Configuration is layered: an optional file (path from `VPN_BILLING_CONFIG`,
//! default `config/default`, any format the `config` crate understands)
//! overridden by environment variables with the `VPN_BILLING` prefix.
//! Nested values use double underscores as separators. The tariff table is
//! a list and is normally supplied by the file.
//!
//! # Example
//!
//! ```no_run
//! use vpn_billing::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod billing;
mod database;
mod error;
mod notifier;
mod panel;
mod payment;
mod server;
mod webhooks;

pub use billing::{BillingConfig, TariffConfig, TrialConfig, WinbackConfig};
pub use database::{DatabaseConfig, PoolConfig};
pub use error::{ConfigError, ValidationError};
pub use notifier::NotifierConfig;
pub use panel::PanelConfig;
pub use payment::PaymentConfig;
pub use server::{LogFormat, ServerConfig};
pub use webhooks::WebhookConfig;

use serde::Deserialize;

const CONFIG_PATH_VAR: &str = "VPN_BILLING_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/default";

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Webhook listener and log output
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// VPN panel API
    pub panel: PanelConfig,

    /// Card and crypto processors
    #[serde(default)]
    pub payment: PaymentConfig,

    /// Inbound webhook secrets
    #[serde(default)]
    pub webhooks: WebhookConfig,

    /// Tariffs, feature toggles and timers
    #[serde(default)]
    pub billing: BillingConfig,

    /// Presentation service for customer notifications
    #[serde(default)]
    pub notifier: NotifierConfig,
}

impl AppConfig {
    /// Load configuration from the optional file and the environment
    ///
    /// # Environment Variable Format
    ///
    /// - `VPN_BILLING__SERVER__LISTEN_ADDR=0.0.0.0:8080` -> `server.listen_addr`
    /// - `VPN_BILLING__DATABASE__POOL__MAX_SIZE=16` -> `database.pool.max_size = 16`
    /// - `VPN_BILLING__PANEL__TOKEN=...` -> `panel.token = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required values are missing or cannot be
    /// parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let path =
            std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name(&path).required(false))
            .add_source(
                config::Environment::default()
                    .prefix("VPN_BILLING")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration sections
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.panel.validate()?;
        self.payment.validate()?;
        self.billing.validate()?;
        self.notifier.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn set_minimal_env() {
        env::set_var(CONFIG_PATH_VAR, "does/not/exist");
        env::set_var("VPN_BILLING__DATABASE__URL", "postgresql://test@localhost/test");
        env::set_var("VPN_BILLING__PANEL__BASE_URL", "https://panel.example.com/api");
        env::set_var("VPN_BILLING__PANEL__TOKEN", "panel-token");
    }

    fn clear_env() {
        env::remove_var(CONFIG_PATH_VAR);
        env::remove_var("VPN_BILLING__DATABASE__URL");
        env::remove_var("VPN_BILLING__PANEL__BASE_URL");
        env::remove_var("VPN_BILLING__PANEL__TOKEN");
        env::remove_var("VPN_BILLING__SERVER__LISTEN_ADDR");
        env::remove_var("VPN_BILLING__DATABASE__POOL__MAX_SIZE");
        env::remove_var("VPN_BILLING__BILLING__RECURRING_ENABLED");
        env::remove_var("VPN_BILLING__WEBHOOKS__PANEL_SECRET");
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.database.url, "postgresql://test@localhost/test");
        assert_eq!(config.panel.token, "panel-token");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_fill_optional_sections() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.database.pool, PoolConfig::default());
        assert!(config.database.migrate_on_start);
        assert_eq!(config.billing.days_per_month, 30);
        assert!(!config.billing.recurring_enabled);
        assert!(config.webhooks.panel_secret().is_none());
        assert!(!config.billing.tariffs.is_empty());
    }

    #[test]
    fn test_nested_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("VPN_BILLING__SERVER__LISTEN_ADDR", "127.0.0.1:3000");
        env::set_var("VPN_BILLING__DATABASE__POOL__MAX_SIZE", "16");
        env::set_var("VPN_BILLING__BILLING__RECURRING_ENABLED", "true");
        env::set_var("VPN_BILLING__WEBHOOKS__PANEL_SECRET", "s3cret");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.listen_addr().unwrap().port(), 3000);
        assert_eq!(config.database.pool.max_size, 16);
        assert!(config.billing.recurring_enabled);
        assert_eq!(config.webhooks.panel_secret(), Some("s3cret"));
    }

    #[test]
    fn test_missing_panel_section_fails_to_load() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var(CONFIG_PATH_VAR, "does/not/exist");
        env::set_var("VPN_BILLING__DATABASE__URL", "postgresql://test@localhost/test");
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_err());
    }
}
