//! In-memory wiring shared by handler tests.

use std::sync::Arc;

use crate::adapters::memory::{
    FixedClock, InMemoryCustomerRepository, InMemoryPromoCodeRepository,
    InMemoryPromoTariffCodeRepository, InMemoryPurchaseRepository, InMemoryVpnPanel,
    RecordingNotifier, ScriptedCardProvider, ScriptedCryptoProvider,
};
use crate::application::context::BillingContext;
use crate::application::handlers::ProcessPurchaseHandler;
use crate::application::settings::{BillingSettings, ReconcileSettings};
use crate::domain::customer::Customer;
use crate::domain::foundation::{Currency, ExternalId, Timestamp};
use crate::domain::purchase::{InvoiceType, NewPurchase, Purchase};
use crate::ports::{CustomerRepository, PurchaseRepository};

pub(crate) struct Harness {
    pub clock: FixedClock,
    pub customers: InMemoryCustomerRepository,
    pub purchases: InMemoryPurchaseRepository,
    pub promo_codes: InMemoryPromoCodeRepository,
    pub tariff_codes: InMemoryPromoTariffCodeRepository,
    pub panel: InMemoryVpnPanel,
    pub card: ScriptedCardProvider,
    pub crypto: ScriptedCryptoProvider,
    pub notifier: RecordingNotifier,
    pub settings: Arc<BillingSettings>,
    pub ctx: BillingContext,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(BillingSettings::default())
    }

    pub fn with_settings(settings: BillingSettings) -> Self {
        let now = Timestamp::parse_rfc3339("2024-06-01T12:00:00Z").unwrap();
        let clock = FixedClock::new(now);
        let customers = InMemoryCustomerRepository::new();
        let purchases = InMemoryPurchaseRepository::new();
        let promo_codes = InMemoryPromoCodeRepository::new();
        let tariff_codes = InMemoryPromoTariffCodeRepository::new();
        let panel = InMemoryVpnPanel::new();
        let card = ScriptedCardProvider::new();
        let crypto = ScriptedCryptoProvider::new();
        let notifier = RecordingNotifier::new();
        let settings = Arc::new(settings);

        let ctx = BillingContext {
            customers: Arc::new(customers.clone()),
            purchases: Arc::new(purchases.clone()),
            promo_codes: Arc::new(promo_codes.clone()),
            tariff_codes: Arc::new(tariff_codes.clone()),
            panel: Arc::new(panel.clone()),
            card: Arc::new(card.clone()),
            crypto: Arc::new(crypto.clone()),
            notifier: Arc::new(notifier.clone()),
            clock: Arc::new(clock.clone()),
            settings: settings.clone(),
            reconcile: ReconcileSettings::immediate(),
        };

        Self {
            clock,
            customers,
            purchases,
            promo_codes,
            tariff_codes,
            panel,
            card,
            crypto,
            notifier,
            settings,
            ctx,
        }
    }

    pub async fn customer(&self, external_id: i64) -> Customer {
        self.customers
            .find_or_create(ExternalId::new(external_id), "en")
            .await
            .unwrap()
    }

    /// A pending purchase for a catalog tariff, correlated as a provider would.
    pub async fn tariff_purchase(
        &self,
        customer: &Customer,
        invoice_type: InvoiceType,
        tariff: &str,
    ) -> Purchase {
        let tariff = self.settings.tariffs.find(tariff).unwrap().clone();
        let created = self
            .purchases
            .create(NewPurchase::from_tariff(
                customer.id,
                &tariff,
                invoice_type,
                Currency::Rub,
                tariff.price,
            ))
            .await
            .unwrap();
        let correlation = format!("{}-{}", invoice_type, created.id);
        self.purchases
            .mark_as_pending(created.id, Some(&correlation))
            .await
            .unwrap();
        self.purchases.find_by_id(created.id).await.unwrap().unwrap()
    }

    pub fn process_purchase(&self) -> Arc<ProcessPurchaseHandler> {
        self.ctx.process_purchase_handler()
    }
}
