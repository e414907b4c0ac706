//! HTTP listener and log output.

use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// `host:port` the webhook listener binds to
    pub listen_addr: String,

    /// `tracing` filter used when `RUST_LOG` is unset
    pub log_filter: String,

    pub log_format: LogFormat,

    /// Upper bound on a single webhook request; the panel redelivers on timeout
    pub webhook_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            log_filter: "info,vpn_billing=debug,sqlx=warn".to_string(),
            log_format: LogFormat::Json,
            webhook_timeout_secs: 10,
        }
    }
}

impl ServerConfig {
    pub fn listen_addr(&self) -> Result<SocketAddr, ValidationError> {
        self.listen_addr
            .parse()
            .map_err(|_| ValidationError::InvalidListenAddr(self.listen_addr.clone()))
    }

    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_secs(self.webhook_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let addr = self.listen_addr()?;
        if addr.port() == 0 {
            return Err(ValidationError::InvalidListenAddr(self.listen_addr.clone()));
        }
        if !(1..=60).contains(&self.webhook_timeout_secs) {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}
