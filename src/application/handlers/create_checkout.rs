//! CreateCheckoutHandler - writes a purchase and opens the matching
//! provider invoice.
//!
//! Terms come from exactly one place: the tariff table for a plain
//! tariff, or the customer's offer snapshot for an offer purchase. The
//! code row an offer came from is never consulted here.

use std::sync::Arc;

use crate::application::settings::BillingSettings;
use crate::domain::foundation::{Currency, CustomerId, DomainError, ErrorCode};
use crate::domain::offer::{require_valid_offer, OfferKind, OfferRejection};
use crate::domain::purchase::{InvoiceType, NewPurchase, Purchase};
use crate::ports::{
    CardPaymentProvider, Clock, CreateCardPayment, CreateCryptoInvoice, CryptoPaymentProvider,
    CustomerRepository, PurchaseRepository,
};

/// What is being bought.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutItem {
    Tariff(String),
    Offer(OfferKind),
}

#[derive(Debug, Clone)]
pub struct CreateCheckoutCommand {
    pub customer_id: CustomerId,
    pub invoice_type: InvoiceType,
    pub item: CheckoutItem,
    /// Customer opted into recurring charges (card only).
    pub save_payment_method: bool,
}

#[derive(Debug, Clone)]
pub enum CreateCheckoutResult {
    Created {
        purchase: Purchase,
        /// Where the customer completes payment; `None` for chat-native.
        payment_url: Option<String>,
    },
    Rejected(OfferRejection),
}

pub struct CreateCheckoutHandler {
    customers: Arc<dyn CustomerRepository>,
    purchases: Arc<dyn PurchaseRepository>,
    card: Arc<dyn CardPaymentProvider>,
    crypto: Arc<dyn CryptoPaymentProvider>,
    clock: Arc<dyn Clock>,
    settings: Arc<BillingSettings>,
}

impl CreateCheckoutHandler {
    pub fn new(
        customers: Arc<dyn CustomerRepository>,
        purchases: Arc<dyn PurchaseRepository>,
        card: Arc<dyn CardPaymentProvider>,
        crypto: Arc<dyn CryptoPaymentProvider>,
        clock: Arc<dyn Clock>,
        settings: Arc<BillingSettings>,
    ) -> Self {
        Self {
            customers,
            purchases,
            card,
            crypto,
            clock,
            settings,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateCheckoutCommand,
    ) -> Result<CreateCheckoutResult, DomainError> {
        // 1. Load the customer
        let customer = self
            .customers
            .find_by_id(cmd.customer_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::CustomerNotFound,
                    format!("customer {} not found", cmd.customer_id),
                )
            })?;

        // 2. Resolve terms
        let new_purchase = match &cmd.item {
            CheckoutItem::Tariff(name) => {
                let tariff = self.settings.tariffs.find(name).ok_or_else(|| {
                    DomainError::new(ErrorCode::TariffNotFound, format!("tariff '{}' not found", name))
                })?;
                let (currency, amount) = match cmd.invoice_type {
                    InvoiceType::ChatNative => {
                        let stars = tariff.stars_price.ok_or_else(|| {
                            DomainError::validation(
                                "stars_price",
                                format!("tariff '{}' has no chat-native price", name),
                            )
                        })?;
                        (Currency::Xtr, stars)
                    }
                    _ => (Currency::Rub, tariff.price),
                };
                NewPurchase::from_tariff(customer.id, tariff, cmd.invoice_type, currency, amount)
            }
            CheckoutItem::Offer(kind) => {
                if !matches!(cmd.invoice_type, InvoiceType::Card | InvoiceType::Crypto) {
                    return Err(DomainError::validation(
                        "invoice_type",
                        format!("offers cannot be paid with {}", cmd.invoice_type),
                    ));
                }
                let offer = match require_valid_offer(customer.offer(*kind), self.clock.now()) {
                    Ok(offer) => offer,
                    Err(rejection) => return Ok(CreateCheckoutResult::Rejected(rejection)),
                };
                NewPurchase::from_offer(customer.id, &offer, cmd.invoice_type)
            }
        };
        let new_purchase = new_purchase
            .with_payment_method_saving(cmd.save_payment_method && cmd.invoice_type == InvoiceType::Card);

        // 3. Write the ledger row
        let purchase = self.purchases.create(new_purchase).await?;

        // 4. Open the provider invoice
        let opened = match purchase.invoice_type {
            InvoiceType::Card => self
                .card
                .create_payment(CreateCardPayment {
                    purchase_id: purchase.id,
                    external_id: customer.external_id,
                    amount: purchase.amount,
                    currency: purchase.currency,
                    months: purchase.months,
                    save_payment_method: purchase.save_payment_method,
                })
                .await
                .map(|p| (Some(p.id), p.confirmation_url)),
            InvoiceType::Crypto => self
                .crypto
                .create_invoice(CreateCryptoInvoice {
                    purchase_id: purchase.id,
                    amount: purchase.amount,
                    currency: purchase.currency,
                    description: format!("VPN access, {} month(s)", purchase.months),
                })
                .await
                .map(|i| (Some(i.invoice_id), i.pay_url)),
            InvoiceType::ChatNative | InvoiceType::SubscriptionPlatform => Ok((None, None)),
        };

        let (correlation_id, payment_url) = match opened {
            Ok(opened) => opened,
            Err(err) => {
                tracing::warn!(
                    purchase_id = %purchase.id,
                    invoice_type = %purchase.invoice_type,
                    error = %err,
                    "Provider invoice creation failed, cancelling purchase"
                );
                self.purchases.mark_as_cancelled(purchase.id).await?;
                return Err(err.into());
            }
        };

        // 5. new -> pending
        self.purchases
            .mark_as_pending(purchase.id, correlation_id.as_deref())
            .await?;
        let purchase = self.purchases.find_by_id(purchase.id).await?.ok_or_else(|| {
            DomainError::new(ErrorCode::PurchaseNotFound, format!("purchase {} vanished", purchase.id))
        })?;

        tracing::info!(
            purchase_id = %purchase.id,
            customer_id = %customer.id,
            invoice_type = %purchase.invoice_type,
            amount = purchase.amount,
            "Checkout created"
        );

        Ok(CreateCheckoutResult::Created {
            purchase,
            payment_url,
        })
    }
}
