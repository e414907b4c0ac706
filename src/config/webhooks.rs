//! Webhook signing configuration

use serde::Deserialize;

/// Shared secrets for inbound webhooks.
///
/// An empty secret switches the matching endpoint into insecure mode:
/// signatures are not checked and every request logs a warning.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookConfig {
    /// Secret the VPN panel signs its webhooks with
    #[serde(default)]
    pub panel_secret: String,

    /// Secret the subscription platform signs its webhooks with
    #[serde(default)]
    pub subscription_secret: String,
}

impl WebhookConfig {
    pub fn panel_secret(&self) -> Option<&str> {
        non_empty(&self.panel_secret)
    }

    pub fn subscription_secret(&self) -> Option<&str> {
        non_empty(&self.subscription_secret)
    }
}

fn non_empty(s: &str) -> Option<&str> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
