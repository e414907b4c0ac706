//! Inbound webhook domain: signature verification, typed payloads
//! and the error-to-status mapping.

mod errors;
mod panel_event;
mod subscription_event;
mod verifier;

pub use errors::WebhookError;
pub use panel_event::{PanelEvent, PanelUserData, PanelUserTraffic, PanelWebhook};
pub use subscription_event::{SubscriptionEvent, SubscriptionPayload, SubscriptionWebhook};
pub use verifier::{sign_payload, SignatureVerifier, Verification};
