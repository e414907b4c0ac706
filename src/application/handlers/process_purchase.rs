//! ProcessPurchaseHandler - turns a settled purchase into an entitlement.
//!
//! Called from reconciliation, both webhooks and the chat-native payment
//! callback. These entry points can race on the same purchase; the
//! status check before the grant is what keeps the grant to one.
//!
//! Order of effects:
//!
//! 1. skip if the purchase is already `paid`
//! 2. grant the entitlement on the panel
//! 3. conditionally mark `paid`
//! 4. clear the offer snapshot the purchase was created from, unless a
//!    newer one with other terms replaced it
//! 5. store the saved card method for recurring charges, if any
//! 6. notify the customer
//!
//! The ledger write and the panel call are not atomic. A crash between 2
//! and 3 leaves the purchase pending, and the next reconciliation pass
//! finishes it.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, ErrorCode, PurchaseId, Timestamp};
use crate::domain::notification::Notification;
use crate::domain::purchase::{Purchase, PurchaseStatus};
use crate::ports::{Clock, CustomerRepository, Notifier, PurchaseRepository};

use super::entitlement::{EntitlementApplier, EntitlementGrant};
use super::notify::notify;
use crate::application::settings::BillingSettings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessPurchaseCommand {
    pub purchase_id: PurchaseId,
    /// Payment method the card processor saved with this payment.
    pub saved_payment_method_id: Option<String>,
}

impl ProcessPurchaseCommand {
    pub fn new(purchase_id: PurchaseId) -> Self {
        Self {
            purchase_id,
            saved_payment_method_id: None,
        }
    }

    pub fn with_saved_method(mut self, method_id: Option<&str>) -> Self {
        self.saved_payment_method_id = method_id.map(str::to_string);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessPurchaseResult {
    /// Entitlement granted by this call.
    Granted { expire_at: Timestamp },
    /// Another caller got there first; nothing was done.
    AlreadyPaid,
}

pub struct ProcessPurchaseHandler {
    purchases: Arc<dyn PurchaseRepository>,
    customers: Arc<dyn CustomerRepository>,
    applier: Arc<EntitlementApplier>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    settings: Arc<BillingSettings>,
}

impl ProcessPurchaseHandler {
    pub fn new(
        purchases: Arc<dyn PurchaseRepository>,
        customers: Arc<dyn CustomerRepository>,
        applier: Arc<EntitlementApplier>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        settings: Arc<BillingSettings>,
    ) -> Self {
        Self {
            purchases,
            customers,
            applier,
            notifier,
            clock,
            settings,
        }
    }

    pub async fn handle(
        &self,
        cmd: ProcessPurchaseCommand,
    ) -> Result<ProcessPurchaseResult, DomainError> {
        let purchase = self
            .purchases
            .find_by_id(cmd.purchase_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::PurchaseNotFound,
                    format!("purchase {} not found", cmd.purchase_id),
                )
            })?;

        match purchase.status {
            PurchaseStatus::Paid => {
                tracing::debug!(purchase_id = %purchase.id, "Purchase already paid, skipping");
                return Ok(ProcessPurchaseResult::AlreadyPaid);
            }
            PurchaseStatus::Cancel => {
                return Err(DomainError::new(
                    ErrorCode::InvalidStateTransition,
                    format!("purchase {} is cancelled", purchase.id),
                ));
            }
            PurchaseStatus::New | PurchaseStatus::Pending => {}
        }

        let customer = self
            .customers
            .find_by_id(purchase.customer_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::CustomerNotFound,
                    format!("customer {} not found", purchase.customer_id),
                )
            })?;

        let expire_at = self
            .applier
            .create_or_update_user(EntitlementGrant {
                customer_id: customer.id,
                external_id: customer.external_id,
                traffic_limit_bytes: self.settings.traffic_limit_bytes,
                days: purchase.days(self.settings.days_per_month),
                is_trial: false,
                device_limit: purchase.device_limit,
            })
            .await?;

        let now = self.clock.now();
        if !self.purchases.mark_as_paid(purchase.id, now).await? {
            tracing::warn!(
                purchase_id = %purchase.id,
                "Purchase reached a terminal status while it was being processed"
            );
        }

        if let Some(kind) = purchase.offer_kind {
            match customer.offer(kind) {
                Some(snapshot) if purchase.was_made_from(snapshot) => {
                    self.customers.clear_offer(customer.id, kind).await?;
                }
                Some(_) => {
                    tracing::info!(
                        purchase_id = %purchase.id,
                        offer_kind = %kind,
                        "Offer re-issued since checkout, snapshot kept"
                    );
                }
                None => {}
            }
        }

        if let Some(method_id) = cmd.saved_payment_method_id {
            self.store_payment_method(&purchase, customer.recurring.clone(), method_id)
                .await?;
        }

        tracing::info!(
            purchase_id = %purchase.id,
            customer_id = %customer.id,
            invoice_type = %purchase.invoice_type,
            months = purchase.months,
            "Purchase paid"
        );

        notify(
            self.notifier.as_ref(),
            &customer,
            Notification::PaymentSucceeded {
                months: purchase.months,
                expire_at,
            },
        )
        .await;

        Ok(ProcessPurchaseResult::Granted { expire_at })
    }

    async fn store_payment_method(
        &self,
        purchase: &Purchase,
        mut recurring: crate::domain::customer::RecurringBilling,
        method_id: String,
    ) -> Result<(), DomainError> {
        // offer purchases have no tariff to re-resolve at charge time
        let Some(tariff_name) = purchase.tariff_name.clone() else {
            tracing::debug!(purchase_id = %purchase.id, "No tariff on purchase, method not stored");
            return Ok(());
        };
        recurring.store_method(
            method_id,
            tariff_name,
            purchase.months,
            purchase.amount,
            purchase.save_payment_method,
        );
        self.customers
            .update_recurring(purchase.customer_id, &recurring)
            .await
    }
}
