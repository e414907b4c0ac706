//! Application handlers.
//!
//! Command handlers that orchestrate billing operations across ports.

pub mod activate_trial;
pub mod broadcast_supervisor;
pub mod create_checkout;
pub mod entitlement;
pub(crate) mod notify;
pub mod offers;
pub mod process_purchase;
pub mod reconcile;
pub mod recurring_biller;
pub mod set_recurring;
pub mod webhooks;

pub use activate_trial::{ActivateTrialHandler, ActivateTrialResult};
pub use broadcast_supervisor::{BroadcastSupervisor, StartBroadcast};
pub use create_checkout::{
    CheckoutItem, CreateCheckoutCommand, CreateCheckoutHandler, CreateCheckoutResult,
};
pub use entitlement::{EntitlementApplier, EntitlementGrant};
pub use offers::{
    ActivateTariffPromoCommand, ActivateTariffPromoHandler, ActivateWinbackCommand,
    ActivateWinbackHandler, ApplyPromoCodeCommand, ApplyPromoCodeHandler, IssueWinbackHandler,
    OfferOutcome, PromoApplied, WinbackIssue,
};
pub use process_purchase::{ProcessPurchaseCommand, ProcessPurchaseHandler, ProcessPurchaseResult};
pub use reconcile::{ReconcileCardHandler, ReconcileCryptoHandler, ReconcileReport};
pub use recurring_biller::{RecurringBiller, RecurringOutcome};
pub use set_recurring::{SetRecurringCommand, SetRecurringHandler, SetRecurringResult};
pub use webhooks::{
    HandlePanelWebhookCommand, HandleSubscriptionWebhookCommand, PanelWebhookHandler,
    PanelWebhookResult, SubscriptionWebhookHandler, SubscriptionWebhookResult,
};
