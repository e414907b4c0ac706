//! Shared state for every HTTP endpoint.

use crate::application::handlers::{
    BroadcastSupervisor, PanelWebhookHandler, SubscriptionWebhookHandler,
};
use crate::application::BillingContext;
use crate::domain::webhook::SignatureVerifier;

/// Cloned for each request; everything inside is `Arc`-backed.
#[derive(Clone)]
pub struct AppState {
    pub context: BillingContext,
    pub panel_verifier: SignatureVerifier,
    pub subscription_verifier: SignatureVerifier,
    pub broadcasts: BroadcastSupervisor,
}

impl AppState {
    pub fn panel_webhook_handler(&self) -> PanelWebhookHandler {
        self.context
            .panel_webhook_handler(self.panel_verifier.clone())
    }

    pub fn subscription_webhook_handler(&self) -> SubscriptionWebhookHandler {
        self.context
            .subscription_webhook_handler(self.subscription_verifier.clone())
    }
}
