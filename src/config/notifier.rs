//! Notifier configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Where customer notifications are delivered.
///
/// The presentation service owns rendering; this core only posts a
/// typed notification (i18n key plus arguments) to it.
#[derive(Debug, Clone, Deserialize)]
pub struct NotifierConfig {
    /// Presentation service endpoint; notifications are only logged when unset
    pub url: Option<String>,

    /// Optional bearer token for the presentation service
    pub token: Option<String>,

    /// Pause between two broadcast messages, in milliseconds
    #[serde(default = "default_broadcast_delay")]
    pub broadcast_delay_ms: u64,
}

impl NotifierConfig {
    pub fn broadcast_delay(&self) -> Duration {
        Duration::from_millis(self.broadcast_delay_ms)
    }

    /// Validate notifier configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(url) = &self.url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ValidationError::InvalidUrl("notifier.url"));
            }
        }
        Ok(())
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            url: None,
            token: None,
            broadcast_delay_ms: default_broadcast_delay(),
        }
    }
}

fn default_broadcast_delay() -> u64 {
    40
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_url_is_valid() {
        assert!(NotifierConfig::default().validate().is_ok());
    }

    #[test]
    fn test_bad_url_is_rejected() {
        let config = NotifierConfig {
            url: Some("localhost:9000".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidUrl("notifier.url"))
        );
    }

    #[test]
    fn test_default_broadcast_delay() {
        assert_eq!(
            NotifierConfig::default().broadcast_delay(),
            Duration::from_millis(40)
        );
    }
}
