//! Shared wiring for the billing handlers.

use std::sync::Arc;

use crate::application::handlers::{
    ActivateTariffPromoHandler, ActivateTrialHandler, ActivateWinbackHandler,
    ApplyPromoCodeHandler, CreateCheckoutHandler, EntitlementApplier, IssueWinbackHandler,
    PanelWebhookHandler, ProcessPurchaseHandler, ReconcileCardHandler, ReconcileCryptoHandler,
    RecurringBiller, SetRecurringHandler, SubscriptionWebhookHandler,
};
use crate::application::settings::{BillingSettings, ReconcileSettings};
use crate::domain::webhook::SignatureVerifier;
use crate::ports::{
    CardPaymentProvider, Clock, CryptoPaymentProvider, CustomerRepository, Notifier,
    PromoCodeRepository, PromoTariffCodeRepository, PurchaseRepository, VpnPanel,
};

/// Ports and settings every handler is built from.
#[derive(Clone)]
pub struct BillingContext {
    pub customers: Arc<dyn CustomerRepository>,
    pub purchases: Arc<dyn PurchaseRepository>,
    pub promo_codes: Arc<dyn PromoCodeRepository>,
    pub tariff_codes: Arc<dyn PromoTariffCodeRepository>,
    pub panel: Arc<dyn VpnPanel>,
    pub card: Arc<dyn CardPaymentProvider>,
    pub crypto: Arc<dyn CryptoPaymentProvider>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
    pub settings: Arc<BillingSettings>,
    pub reconcile: ReconcileSettings,
}

impl BillingContext {
    /// Create handlers on demand from the shared state.
    pub fn entitlement_applier(&self) -> Arc<EntitlementApplier> {
        Arc::new(EntitlementApplier::new(
            self.panel.clone(),
            self.customers.clone(),
            self.clock.clone(),
        ))
    }

    pub fn process_purchase_handler(&self) -> Arc<ProcessPurchaseHandler> {
        Arc::new(ProcessPurchaseHandler::new(
            self.purchases.clone(),
            self.customers.clone(),
            self.entitlement_applier(),
            self.notifier.clone(),
            self.clock.clone(),
            self.settings.clone(),
        ))
    }

    pub fn checkout_handler(&self) -> CreateCheckoutHandler {
        CreateCheckoutHandler::new(
            self.customers.clone(),
            self.purchases.clone(),
            self.card.clone(),
            self.crypto.clone(),
            self.clock.clone(),
            self.settings.clone(),
        )
    }

    pub fn apply_promo_code_handler(&self) -> ApplyPromoCodeHandler {
        ApplyPromoCodeHandler::new(
            self.promo_codes.clone(),
            self.customers.clone(),
            self.entitlement_applier(),
            self.notifier.clone(),
            self.clock.clone(),
            self.settings.clone(),
        )
    }

    pub fn activate_tariff_promo_handler(&self) -> ActivateTariffPromoHandler {
        ActivateTariffPromoHandler::new(
            self.tariff_codes.clone(),
            self.customers.clone(),
            self.clock.clone(),
        )
    }

    pub fn issue_winback_handler(&self) -> IssueWinbackHandler {
        IssueWinbackHandler::new(
            self.customers.clone(),
            self.purchases.clone(),
            self.notifier.clone(),
            self.clock.clone(),
            self.settings.clone(),
        )
    }

    pub fn activate_winback_handler(&self) -> ActivateWinbackHandler {
        ActivateWinbackHandler::new(self.checkout_handler())
    }

    pub fn activate_trial_handler(&self) -> ActivateTrialHandler {
        ActivateTrialHandler::new(
            self.customers.clone(),
            self.purchases.clone(),
            self.entitlement_applier(),
            self.notifier.clone(),
            self.settings.clone(),
        )
    }

    pub fn recurring_biller(&self) -> RecurringBiller {
        RecurringBiller::new(
            self.customers.clone(),
            self.purchases.clone(),
            self.card.clone(),
            self.entitlement_applier(),
            self.notifier.clone(),
            self.clock.clone(),
            self.settings.clone(),
        )
    }

    pub fn set_recurring_handler(&self) -> SetRecurringHandler {
        SetRecurringHandler::new(self.customers.clone())
    }

    pub fn panel_webhook_handler(&self, verifier: SignatureVerifier) -> PanelWebhookHandler {
        PanelWebhookHandler::new(
            verifier,
            self.customers.clone(),
            Arc::new(self.recurring_biller()),
            Arc::new(self.issue_winback_handler()),
            self.notifier.clone(),
            self.clock.clone(),
            self.settings.clone(),
        )
    }

    pub fn subscription_webhook_handler(
        &self,
        verifier: SignatureVerifier,
    ) -> SubscriptionWebhookHandler {
        SubscriptionWebhookHandler::new(
            verifier,
            self.customers.clone(),
            self.purchases.clone(),
            self.process_purchase_handler(),
            self.notifier.clone(),
        )
    }

    pub fn reconcile_card_handler(&self) -> ReconcileCardHandler {
        ReconcileCardHandler::new(
            self.purchases.clone(),
            self.card.clone(),
            self.process_purchase_handler(),
            self.reconcile,
        )
    }

    pub fn reconcile_crypto_handler(&self) -> ReconcileCryptoHandler {
        ReconcileCryptoHandler::new(
            self.purchases.clone(),
            self.crypto.clone(),
            self.process_purchase_handler(),
        )
    }
}
