//! VPN panel configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// VPN panel API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PanelConfig {
    /// Panel API base URL (e.g. `https://panel.example.com/api`)
    pub base_url: String,

    /// Bearer token for the panel API
    pub token: String,

    /// Traffic limit in bytes for paid accounts; 0 means unlimited
    #[serde(default)]
    pub traffic_limit_bytes: i64,

    /// Internal squad UUIDs new accounts are attached to (comma-separated)
    pub squads: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl PanelConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Squad UUIDs as a list
    pub fn squad_list(&self) -> Vec<String> {
        self.squads
            .as_ref()
            .map(|s| {
                s.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Validate panel configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.base_url.is_empty() {
            return Err(ValidationError::MissingRequired("PANEL__BASE_URL"));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ValidationError::InvalidUrl("panel.base_url"));
        }
        if self.token.is_empty() {
            return Err(ValidationError::MissingRequired("PANEL__TOKEN"));
        }
        if self.timeout_secs == 0 || self.timeout_secs > 9 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            token: String::new(),
            traffic_limit_bytes: 0,
            squads: None,
            timeout_secs: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    5
}
