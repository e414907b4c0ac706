//! Inbound webhook handlers, one per source.

mod panel_webhook;
mod subscription_webhook;

pub use panel_webhook::{HandlePanelWebhookCommand, PanelWebhookHandler, PanelWebhookResult};
pub use subscription_webhook::{
    HandleSubscriptionWebhookCommand, SubscriptionWebhookHandler, SubscriptionWebhookResult,
};
