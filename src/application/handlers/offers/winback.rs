//! Winback offers: issuance to lapsed trial users and redemption.

use std::sync::Arc;

use crate::application::handlers::create_checkout::{
    CheckoutItem, CreateCheckoutCommand, CreateCheckoutHandler, CreateCheckoutResult,
};
use crate::application::handlers::notify::notify;
use crate::application::settings::BillingSettings;
use crate::domain::customer::{Customer, WinbackOffer};
use crate::domain::foundation::{CustomerId, DomainError};
use crate::domain::notification::Notification;
use crate::domain::offer::{Offer, OfferKind};
use crate::domain::purchase::{InvoiceType, Purchase};
use crate::ports::{Clock, CustomerRepository, Notifier, PurchaseRepository};

use super::OfferOutcome;

/// Why issuance did or did not happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WinbackIssue {
    Issued(Offer),
    Disabled,
    /// Customer has paid before; winback is for trial users only.
    HasPaid,
    AlreadyActive,
}

pub struct IssueWinbackHandler {
    customers: Arc<dyn CustomerRepository>,
    purchases: Arc<dyn PurchaseRepository>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    settings: Arc<BillingSettings>,
}

impl IssueWinbackHandler {
    pub fn new(
        customers: Arc<dyn CustomerRepository>,
        purchases: Arc<dyn PurchaseRepository>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        settings: Arc<BillingSettings>,
    ) -> Self {
        Self {
            customers,
            purchases,
            notifier,
            clock,
            settings,
        }
    }

    pub async fn handle(&self, customer: &Customer) -> Result<WinbackIssue, DomainError> {
        let terms = &self.settings.winback;
        if !terms.enabled {
            return Ok(WinbackIssue::Disabled);
        }
        let now = self.clock.now();
        if customer.has_active_winback(now) {
            return Ok(WinbackIssue::AlreadyActive);
        }
        if self.purchases.has_paid_purchases(customer.id).await? {
            return Ok(WinbackIssue::HasPaid);
        }

        let offer = Offer {
            kind: OfferKind::Winback,
            price: terms.price,
            devices: terms.devices,
            months: terms.months,
            expires_at: now.add_hours(terms.valid_hours),
        };
        self.customers
            .set_winback_offer(customer.id, &WinbackOffer { sent_at: now, offer })
            .await?;

        tracing::info!(
            customer_id = %customer.id,
            price = offer.price,
            expires_at = %offer.expires_at,
            "Winback offer issued"
        );

        notify(
            self.notifier.as_ref(),
            customer,
            Notification::WinbackOffer {
                price: offer.price,
                devices: offer.devices,
                months: offer.months,
                expires_at: offer.expires_at,
            },
        )
        .await;

        Ok(WinbackIssue::Issued(offer))
    }
}

#[derive(Debug, Clone)]
pub struct ActivateWinbackCommand {
    pub customer_id: CustomerId,
    pub invoice_type: InvoiceType,
}

/// Redeems the customer's winback snapshot by opening a checkout for it.
pub struct ActivateWinbackHandler {
    checkout: CreateCheckoutHandler,
}

impl ActivateWinbackHandler {
    pub fn new(checkout: CreateCheckoutHandler) -> Self {
        Self { checkout }
    }

    pub async fn handle(
        &self,
        cmd: ActivateWinbackCommand,
    ) -> Result<OfferOutcome<(Purchase, Option<String>)>, DomainError> {
        let result = self
            .checkout
            .handle(CreateCheckoutCommand {
                customer_id: cmd.customer_id,
                invoice_type: cmd.invoice_type,
                item: CheckoutItem::Offer(OfferKind::Winback),
                save_payment_method: false,
            })
            .await?;

        Ok(match result {
            CreateCheckoutResult::Created {
                purchase,
                payment_url,
            } => OfferOutcome::Applied((purchase, payment_url)),
            CreateCheckoutResult::Rejected(rejection) => OfferOutcome::Rejected(rejection),
        })
    }
}
