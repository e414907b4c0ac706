//! End-to-end billing flows over the in-memory adapters.
//!
//! Each test wires a full `BillingContext` the way the binary does, only
//! with memory-backed ports, and drives it through the public handlers.

use std::sync::Arc;

use vpn_billing::adapters::memory::{
    FixedClock, InMemoryCustomerRepository, InMemoryPromoCodeRepository,
    InMemoryPromoTariffCodeRepository, InMemoryPurchaseRepository, InMemoryVpnPanel,
    RecordingNotifier, ScriptedCardProvider, ScriptedCryptoProvider,
};
use vpn_billing::application::handlers::{
    ActivateWinbackCommand, ApplyPromoCodeCommand, CheckoutItem, CreateCheckoutCommand,
    CreateCheckoutResult, OfferOutcome, ProcessPurchaseCommand, ProcessPurchaseResult,
    RecurringOutcome, WinbackIssue,
};
use vpn_billing::application::{BillingContext, BillingSettings, ReconcileSettings};
use vpn_billing::domain::customer::Customer;
use vpn_billing::domain::foundation::{CodeId, ExternalId, Timestamp};
use vpn_billing::domain::offer::{CodeValue, OfferKind, OfferRejection, PromoCode};
use vpn_billing::domain::purchase::{InvoiceType, Purchase, PurchaseStatus};
use vpn_billing::ports::{
    CardPayment, CardPaymentStatus, CryptoInvoiceStatus, CustomerRepository, PurchaseRepository,
    SavedPaymentMethod,
};

// =============================================================================
// Test Infrastructure
// =============================================================================

struct World {
    clock: FixedClock,
    customers: InMemoryCustomerRepository,
    purchases: InMemoryPurchaseRepository,
    promo_codes: InMemoryPromoCodeRepository,
    panel: InMemoryVpnPanel,
    card: ScriptedCardProvider,
    crypto: ScriptedCryptoProvider,
    notifier: RecordingNotifier,
    ctx: BillingContext,
}

impl World {
    fn new(settings: BillingSettings) -> Self {
        let clock = FixedClock::new(Timestamp::parse_rfc3339("2024-06-01T12:00:00Z").unwrap());
        let customers = InMemoryCustomerRepository::new();
        let purchases = InMemoryPurchaseRepository::new();
        let promo_codes = InMemoryPromoCodeRepository::new();
        let panel = InMemoryVpnPanel::new();
        let card = ScriptedCardProvider::new();
        let crypto = ScriptedCryptoProvider::new();
        let notifier = RecordingNotifier::new();

        let ctx = BillingContext {
            customers: Arc::new(customers.clone()),
            purchases: Arc::new(purchases.clone()),
            promo_codes: Arc::new(promo_codes.clone()),
            tariff_codes: Arc::new(InMemoryPromoTariffCodeRepository::new()),
            panel: Arc::new(panel.clone()),
            card: Arc::new(card.clone()),
            crypto: Arc::new(crypto.clone()),
            notifier: Arc::new(notifier.clone()),
            clock: Arc::new(clock.clone()),
            settings: Arc::new(settings),
            reconcile: ReconcileSettings::immediate(),
        };

        Self {
            clock,
            customers,
            purchases,
            promo_codes,
            panel,
            card,
            crypto,
            notifier,
            ctx,
        }
    }

    fn now(&self) -> Timestamp {
        use vpn_billing::ports::Clock;
        self.clock.now()
    }

    async fn customer(&self, external_id: i64) -> Customer {
        self.customers
            .find_or_create(ExternalId::new(external_id), "en")
            .await
            .unwrap()
    }

    async fn checkout(
        &self,
        customer: &Customer,
        invoice_type: InvoiceType,
        item: CheckoutItem,
        save_payment_method: bool,
    ) -> Purchase {
        let result = self
            .ctx
            .checkout_handler()
            .handle(CreateCheckoutCommand {
                customer_id: customer.id,
                invoice_type,
                item,
                save_payment_method,
            })
            .await
            .unwrap();
        match result {
            CreateCheckoutResult::Created { purchase, .. } => purchase,
            CreateCheckoutResult::Rejected(rejection) => {
                panic!("checkout rejected: {:?}", rejection)
            }
        }
    }

    async fn purchase(&self, purchase: &Purchase) -> Purchase {
        self.purchases.find_by_id(purchase.id).await.unwrap().unwrap()
    }
}

fn succeeded(payment_id: &str, saved_method: Option<&str>) -> CardPayment {
    CardPayment {
        id: payment_id.to_string(),
        status: CardPaymentStatus::Succeeded,
        paid: true,
        cancellation_reason: None,
        payment_method: saved_method.map(|id| SavedPaymentMethod {
            id: id.to_string(),
            saved: true,
        }),
        confirmation_url: None,
    }
}

fn welcome_code(world: &World, max_activations: i32) -> PromoCode {
    PromoCode {
        id: CodeId::new(1),
        code: CodeValue::try_new("WELCOME30").unwrap(),
        bonus_days: 30,
        max_activations,
        current_activations: 0,
        is_active: true,
        valid_until: None,
        created_at: world.now(),
    }
}

// =============================================================================
// Card checkout through reconciliation
// =============================================================================

#[tokio::test]
async fn card_checkout_settles_on_the_next_reconciliation_pass() {
    let world = World::new(BillingSettings::default());
    let customer = world.customer(42).await;

    let purchase = world
        .checkout(
            &customer,
            InvoiceType::Card,
            CheckoutItem::Tariff("basic".to_string()),
            false,
        )
        .await;
    assert_eq!(purchase.status, PurchaseStatus::Pending);
    let payment_id = purchase.correlation_id.clone().unwrap();

    // still pending at the processor: nothing happens
    let idle = world.ctx.reconcile_card_handler().run_once().await.unwrap();
    assert_eq!(idle.paid, 0);
    assert!(world.panel.user(ExternalId::new(42)).is_none());

    world.card.set_payment(succeeded(&payment_id, None));
    let report = world.ctx.reconcile_card_handler().run_once().await.unwrap();

    assert_eq!(report.paid, 1);
    assert_eq!(world.purchase(&purchase).await.status, PurchaseStatus::Paid);
    let user = world.panel.user(ExternalId::new(42)).unwrap();
    assert_eq!(user.expire_at, world.now().add_days(30));
    assert_eq!(user.device_limit, Some(3));
    let notes = world.notifier.sent_to(ExternalId::new(42));
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].i18n_key(), "payment.succeeded");
}

#[tokio::test]
async fn saved_card_method_enables_recurring_for_the_tariff() {
    let world = World::new(BillingSettings::default());
    let customer = world.customer(42).await;

    let purchase = world
        .checkout(
            &customer,
            InvoiceType::Card,
            CheckoutItem::Tariff("basic_quarter".to_string()),
            true,
        )
        .await;
    world.card.set_payment(succeeded(
        purchase.correlation_id.as_deref().unwrap(),
        Some("pm_saved"),
    ));

    world.ctx.reconcile_card_handler().run_once().await.unwrap();

    let recurring = world.customers.get(customer.id).await.unwrap().recurring;
    assert!(recurring.enabled);
    assert_eq!(recurring.payment_method_id.as_deref(), Some("pm_saved"));
    assert_eq!(recurring.tariff_name.as_deref(), Some("basic_quarter"));
    assert_eq!(recurring.months, Some(3));
    assert_eq!(recurring.amount, Some(400));
}

#[tokio::test]
async fn crypto_invoice_settles_in_one_batched_pass() {
    let world = World::new(BillingSettings::default());
    let first = world.customer(42).await;
    let second = world.customer(43).await;

    let paid = world
        .checkout(
            &first,
            InvoiceType::Crypto,
            CheckoutItem::Tariff("basic".to_string()),
            false,
        )
        .await;
    let expired = world
        .checkout(
            &second,
            InvoiceType::Crypto,
            CheckoutItem::Tariff("basic".to_string()),
            false,
        )
        .await;
    world.crypto.set_status(
        paid.correlation_id.as_deref().unwrap(),
        CryptoInvoiceStatus::Paid,
    );
    world.crypto.set_status(
        expired.correlation_id.as_deref().unwrap(),
        CryptoInvoiceStatus::Expired,
    );

    let report = world.ctx.reconcile_crypto_handler().run_once().await.unwrap();

    assert_eq!(report.paid, 1);
    assert_eq!(report.cancelled, 1);
    assert_eq!(world.crypto.batches().len(), 1);
    assert_eq!(world.purchase(&paid).await.status, PurchaseStatus::Paid);
    assert_eq!(world.purchase(&expired).await.status, PurchaseStatus::Cancel);
    assert!(world.panel.user(ExternalId::new(42)).is_some());
    assert!(world.panel.user(ExternalId::new(43)).is_none());
}

// =============================================================================
// Idempotence
// =============================================================================

#[tokio::test]
async fn a_purchase_is_granted_exactly_once() {
    let world = World::new(BillingSettings::default());
    let customer = world.customer(42).await;
    let purchase = world
        .checkout(
            &customer,
            InvoiceType::Card,
            CheckoutItem::Tariff("basic".to_string()),
            false,
        )
        .await;
    let process = world.ctx.process_purchase_handler();

    let first = process
        .handle(ProcessPurchaseCommand::new(purchase.id))
        .await
        .unwrap();
    let second = process
        .handle(ProcessPurchaseCommand::new(purchase.id))
        .await
        .unwrap();

    assert!(matches!(first, ProcessPurchaseResult::Granted { .. }));
    assert_eq!(second, ProcessPurchaseResult::AlreadyPaid);
    assert_eq!(
        world.panel.user(ExternalId::new(42)).unwrap().expire_at,
        world.now().add_days(30)
    );
    assert_eq!(world.notifier.sent().len(), 1);
}

#[tokio::test]
async fn reconciliation_after_a_direct_grant_does_not_extend_again() {
    let world = World::new(BillingSettings::default());
    let customer = world.customer(42).await;
    let purchase = world
        .checkout(
            &customer,
            InvoiceType::Card,
            CheckoutItem::Tariff("basic".to_string()),
            false,
        )
        .await;
    world
        .card
        .set_payment(succeeded(purchase.correlation_id.as_deref().unwrap(), None));

    world
        .ctx
        .process_purchase_handler()
        .handle(ProcessPurchaseCommand::new(purchase.id))
        .await
        .unwrap();
    let report = world.ctx.reconcile_card_handler().run_once().await.unwrap();

    // the purchase left the pending set, so the pass never saw it
    assert_eq!(report.checked, 0);
    assert_eq!(
        world.panel.user(ExternalId::new(42)).unwrap().expire_at,
        world.now().add_days(30)
    );
}

// =============================================================================
// Promo codes
// =============================================================================

#[tokio::test]
async fn promo_code_is_single_use_per_customer_and_capped_globally() {
    let world = World::new(BillingSettings::default());
    world.promo_codes.insert(welcome_code(&world, 100)).await;
    let c42 = world.customer(42).await;
    let c43 = world.customer(43).await;
    let handler = world.ctx.apply_promo_code_handler();

    let applied = handler
        .handle(ApplyPromoCodeCommand {
            customer_id: c42.id,
            code: "welcome30".to_string(),
        })
        .await
        .unwrap();
    let OfferOutcome::Applied(applied) = applied else {
        panic!("expected the first activation to apply");
    };
    assert_eq!(applied.bonus_days, 30);
    assert_eq!(applied.expire_at, world.now().add_days(30));

    let again = handler
        .handle(ApplyPromoCodeCommand {
            customer_id: c42.id,
            code: "WELCOME30".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(again.rejection(), Some(OfferRejection::AlreadyUsed));

    let mut exhausted = world.promo_codes.get(CodeId::new(1)).await.unwrap();
    exhausted.current_activations = 100;
    world.promo_codes.insert(exhausted).await;

    let capped = handler
        .handle(ApplyPromoCodeCommand {
            customer_id: c43.id,
            code: "WELCOME30".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(capped.rejection(), Some(OfferRejection::LimitReached));
    assert!(world.panel.user(ExternalId::new(43)).is_none());
}

// =============================================================================
// Winback
// =============================================================================

fn winback_settings() -> BillingSettings {
    let mut settings = BillingSettings::default();
    settings.winback.enabled = true;
    settings.winback.price = 100;
    settings.winback.devices = 1;
    settings.winback.months = 1;
    settings.winback.valid_hours = 48;
    settings
}

#[tokio::test]
async fn winback_paid_inside_its_window_grants_the_snapshot_terms() {
    let world = World::new(winback_settings());
    let customer = world.customer(42).await;
    let issued = world
        .ctx
        .issue_winback_handler()
        .handle(&customer)
        .await
        .unwrap();
    assert!(matches!(issued, WinbackIssue::Issued(_)));

    world.clock.advance_hours(1);
    let outcome = world
        .ctx
        .activate_winback_handler()
        .handle(ActivateWinbackCommand {
            customer_id: customer.id,
            invoice_type: InvoiceType::Card,
        })
        .await
        .unwrap();
    let OfferOutcome::Applied((purchase, _)) = outcome else {
        panic!("expected the winback to be accepted");
    };
    assert_eq!(purchase.amount, 100);
    assert_eq!(purchase.device_limit, Some(1));
    assert_eq!(purchase.months, 1);

    world.card.set_payment(succeeded(
        purchase.correlation_id.as_deref().unwrap(),
        None,
    ));
    world.ctx.reconcile_card_handler().run_once().await.unwrap();

    assert_eq!(world.panel.user(ExternalId::new(42)).unwrap().device_limit, Some(1));
    let customer = world.customers.get(customer.id).await.unwrap();
    assert!(customer.offer(OfferKind::Winback).is_none());
}

#[tokio::test]
async fn winback_after_its_window_is_expired() {
    let world = World::new(winback_settings());
    let customer = world.customer(42).await;
    world
        .ctx
        .issue_winback_handler()
        .handle(&customer)
        .await
        .unwrap();

    world.clock.advance_hours(49);
    let outcome = world
        .ctx
        .activate_winback_handler()
        .handle(ActivateWinbackCommand {
            customer_id: customer.id,
            invoice_type: InvoiceType::Card,
        })
        .await
        .unwrap();

    assert_eq!(outcome.rejection(), Some(OfferRejection::Expired));
    assert!(world.purchases.all().await.is_empty());
}

// =============================================================================
// Recurring
// =============================================================================

#[tokio::test]
async fn recurring_charge_is_skipped_right_after_a_payment() {
    let mut settings = BillingSettings::default();
    settings.recurring_enabled = true;
    let world = World::new(settings);
    let customer = world.customer(42).await;

    let purchase = world
        .checkout(
            &customer,
            InvoiceType::Card,
            CheckoutItem::Tariff("basic".to_string()),
            true,
        )
        .await;
    world.card.set_payment(succeeded(
        purchase.correlation_id.as_deref().unwrap(),
        Some("pm_saved"),
    ));
    world.ctx.reconcile_card_handler().run_once().await.unwrap();

    // the panel's "expired" event races the payment that just landed
    let customer = world.customers.get(customer.id).await.unwrap();
    let outcome = world
        .ctx
        .recurring_biller()
        .charge(&customer)
        .await
        .unwrap();

    assert_eq!(outcome, RecurringOutcome::SkippedRecentPayment);
    assert_eq!(world.card.charge_count(), 0);
}
