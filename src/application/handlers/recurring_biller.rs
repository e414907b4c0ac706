//! RecurringBiller - charges a stored card when a subscription expires.
//!
//! Only the panel's *expired* event triggers a charge. The guard against
//! a redelivered webhook is a best-effort check for a paid purchase in the
//! last `recurring_guard_minutes`; a duplicate slipping through is
//! preferred over blocking a legitimate charge.
//!
//! A recurring charge lives in the ledger as a purchase flagged
//! `is_recurring`. While it is open (`new` or `pending`) no second one is
//! created for the customer:
//!
//! - `new` means the processor never answered for it; the next trigger
//!   charges it again under the same idempotence key
//! - `pending` means the processor accepted it; card reconciliation
//!   settles it
//!
//! A successful charge is recorded as `pending` before the panel grant,
//! so a panel outage leaves a row reconciliation can finish instead of
//! one the next trigger would charge twice.
//!
//! Every terminal branch sends exactly one notification. A transient
//! processor error is not terminal: it surfaces as an error so the
//! webhook is redelivered.

use std::sync::Arc;

use crate::application::settings::BillingSettings;
use crate::domain::customer::Customer;
use crate::domain::foundation::{Currency, DomainError, Timestamp};
use crate::domain::notification::Notification;
use crate::domain::purchase::{InvoiceType, NewPurchase, PurchaseStatus};
use crate::ports::{
    CancellationReason, CardPaymentProvider, CardPaymentStatus, ChargeSavedMethod, Clock,
    CustomerRepository, Notifier, PurchaseRepository,
};

use super::entitlement::{EntitlementApplier, EntitlementGrant};
use super::notify::notify;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecurringOutcome {
    /// Feature off, recurring disabled, or no stored method.
    NotEligible,
    /// A payment landed moments ago; this trigger is treated as a duplicate.
    SkippedRecentPayment,
    Charged { expire_at: Timestamp },
    /// Processor has not settled yet; reconciliation will finish it.
    AwaitingSettlement,
    PermissionRevoked,
    Failed,
}

impl RecurringOutcome {
    pub fn i18n_key(&self) -> Option<&'static str> {
        match self {
            RecurringOutcome::Charged { .. } => Some("recurring.succeeded"),
            RecurringOutcome::PermissionRevoked => Some("recurring.permission_revoked"),
            RecurringOutcome::Failed => Some("recurring.failed"),
            _ => None,
        }
    }
}

pub struct RecurringBiller {
    customers: Arc<dyn CustomerRepository>,
    purchases: Arc<dyn PurchaseRepository>,
    card: Arc<dyn CardPaymentProvider>,
    applier: Arc<EntitlementApplier>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    settings: Arc<BillingSettings>,
}

impl RecurringBiller {
    pub fn new(
        customers: Arc<dyn CustomerRepository>,
        purchases: Arc<dyn PurchaseRepository>,
        card: Arc<dyn CardPaymentProvider>,
        applier: Arc<EntitlementApplier>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        settings: Arc<BillingSettings>,
    ) -> Self {
        Self {
            customers,
            purchases,
            card,
            applier,
            notifier,
            clock,
            settings,
        }
    }

    /// Whether the expired event should be routed here at all.
    pub fn is_eligible(&self, customer: &Customer) -> bool {
        self.settings.recurring_enabled && customer.recurring.is_chargeable()
    }

    pub async fn charge(&self, customer: &Customer) -> Result<RecurringOutcome, DomainError> {
        if !self.is_eligible(customer) {
            return Ok(RecurringOutcome::NotEligible);
        }

        let plan = customer.recurring.plan().map_err(|err| {
            tracing::error!(customer_id = %customer.id, error = %err, "Recurring fields incomplete");
            err
        })?;
        let tariff = self.settings.tariffs.find(&plan.tariff_name).ok_or_else(|| {
            let err = DomainError::invariant(format!(
                "recurring tariff '{}' no longer exists",
                plan.tariff_name
            ));
            tracing::error!(customer_id = %customer.id, error = %err, "Recurring charge aborted");
            err
        })?;

        // 1. Duplicate-delivery guard
        let now = self.clock.now();
        if self
            .purchases
            .has_recent_paid_purchase(customer.id, self.settings.recurring_guard_minutes, now)
            .await?
        {
            tracing::info!(customer_id = %customer.id, "Recent payment found, recurring charge skipped");
            return Ok(RecurringOutcome::SkippedRecentPayment);
        }

        // 2. Resume an open charge or open a new one
        let purchase = match self.purchases.find_open_recurring_charge(customer.id).await? {
            Some(open) if open.status == PurchaseStatus::Pending => {
                tracing::info!(
                    customer_id = %customer.id,
                    purchase_id = %open.id,
                    "Recurring charge already accepted, left to reconciliation"
                );
                return Ok(RecurringOutcome::AwaitingSettlement);
            }
            Some(open) => {
                tracing::info!(
                    customer_id = %customer.id,
                    purchase_id = %open.id,
                    "Retrying unanswered recurring charge"
                );
                open
            }
            None => {
                let mut new_purchase = NewPurchase::from_tariff(
                    customer.id,
                    tariff,
                    InvoiceType::Card,
                    Currency::Rub,
                    plan.amount,
                )
                .recurring();
                new_purchase.months = plan.months;
                self.purchases.create(new_purchase).await?
            }
        };

        // 3. Charge the stored method
        let charged = self
            .card
            .charge_saved_method(ChargeSavedMethod {
                purchase_id: purchase.id,
                external_id: customer.external_id,
                amount: purchase.amount,
                currency: purchase.currency,
                months: purchase.months,
                payment_method_id: plan.payment_method_id.clone(),
            })
            .await;

        let payment = match charged {
            Ok(payment) => payment,
            Err(err) if err.retryable => {
                tracing::warn!(
                    customer_id = %customer.id,
                    purchase_id = %purchase.id,
                    error = %err,
                    "Recurring charge hit a transient error, left open for retry"
                );
                return Err(err.into());
            }
            Err(err) => {
                tracing::warn!(customer_id = %customer.id, error = %err, "Recurring charge failed");
                self.purchases.mark_as_cancelled(purchase.id).await?;
                notify(self.notifier.as_ref(), customer, Notification::RecurringChargeFailed).await;
                return Ok(RecurringOutcome::Failed);
            }
        };

        // 4. Branch on the processor's answer
        if payment.status != CardPaymentStatus::Canceled {
            self.purchases
                .mark_as_pending(purchase.id, Some(&payment.id))
                .await?;
        }

        if payment.is_succeeded() {
            let granted = self
                .applier
                .create_or_update_user(EntitlementGrant {
                    customer_id: customer.id,
                    external_id: customer.external_id,
                    traffic_limit_bytes: self.settings.traffic_limit_bytes,
                    days: purchase.days(self.settings.days_per_month),
                    is_trial: false,
                    device_limit: purchase.device_limit,
                })
                .await;
            let expire_at = match granted {
                Ok(expire_at) => expire_at,
                Err(err) => {
                    tracing::error!(
                        customer_id = %customer.id,
                        purchase_id = %purchase.id,
                        error = %err,
                        "Recurring charge captured but grant failed, left to reconciliation"
                    );
                    return Ok(RecurringOutcome::AwaitingSettlement);
                }
            };
            self.purchases.mark_as_paid(purchase.id, now).await?;

            tracing::info!(
                customer_id = %customer.id,
                purchase_id = %purchase.id,
                amount = purchase.amount,
                "Recurring charge succeeded"
            );
            notify(
                self.notifier.as_ref(),
                customer,
                Notification::RecurringChargeSucceeded {
                    amount: purchase.amount,
                    months: purchase.months,
                    expire_at,
                },
            )
            .await;
            return Ok(RecurringOutcome::Charged { expire_at });
        }

        if payment.status != CardPaymentStatus::Canceled {
            tracing::info!(
                customer_id = %customer.id,
                purchase_id = %purchase.id,
                "Recurring charge awaiting settlement"
            );
            return Ok(RecurringOutcome::AwaitingSettlement);
        }

        self.purchases.mark_as_cancelled(purchase.id).await?;

        if payment.cancellation_reason == Some(CancellationReason::PermissionRevoked) {
            let mut recurring = customer.recurring.clone();
            recurring.disable();
            self.customers.update_recurring(customer.id, &recurring).await?;
            tracing::info!(customer_id = %customer.id, "Card permission revoked, recurring disabled");
            notify(
                self.notifier.as_ref(),
                customer,
                Notification::RecurringPermissionRevoked,
            )
            .await;
            return Ok(RecurringOutcome::PermissionRevoked);
        }

        tracing::warn!(
            customer_id = %customer.id,
            reason = ?payment.cancellation_reason,
            "Recurring charge declined"
        );
        notify(self.notifier.as_ref(), customer, Notification::RecurringChargeFailed).await;
        Ok(RecurringOutcome::Failed)
    }
}
