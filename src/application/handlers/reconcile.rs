//! Invoice reconciliation: one pass over the pending purchases of one
//! provider.
//!
//! The scheduler calls [`ReconcileCardHandler::run_once`] and
//! [`ReconcileCryptoHandler::run_once`] on independent timers. A pass
//! never fails as a whole: every purchase is handled on its own, errors
//! are logged and left for the next tick.

use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use crate::application::settings::ReconcileSettings;
use crate::domain::foundation::DomainError;
use crate::domain::purchase::{InvoiceType, Purchase, PurchaseStatus};
use crate::ports::{
    CardPayment, CardPaymentProvider, CardPaymentStatus, CryptoInvoiceStatus,
    CryptoPaymentProvider, PaymentError, PurchaseRepository,
};

use super::process_purchase::{ProcessPurchaseCommand, ProcessPurchaseHandler};

/// Totals for one pass, mostly for logs and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub checked: usize,
    pub paid: usize,
    pub cancelled: usize,
    pub failed: usize,
}

/// Outcome of reconciling a single purchase.
enum Settled {
    Paid,
    Cancelled,
    Unchanged,
}

impl ReconcileReport {
    fn record(&mut self, outcome: Result<Settled, DomainError>) {
        self.checked += 1;
        match outcome {
            Ok(Settled::Paid) => self.paid += 1,
            Ok(Settled::Cancelled) => self.cancelled += 1,
            Ok(Settled::Unchanged) => {}
            Err(_) => self.failed += 1,
        }
    }
}

/// Runs one purchase's work, turning a panic into an error so the rest
/// of the batch still runs.
async fn isolated<F>(purchase: &Purchase, work: F) -> Result<Settled, DomainError>
where
    F: Future<Output = Result<Settled, DomainError>>,
{
    let outcome = match AssertUnwindSafe(work).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(_) => Err(DomainError::new(
            crate::domain::foundation::ErrorCode::InternalError,
            "reconciliation task panicked",
        )),
    };
    if let Err(err) = &outcome {
        tracing::warn!(
            purchase_id = %purchase.id,
            invoice_type = %purchase.invoice_type,
            error = %err,
            "Reconciliation failed, will retry next tick"
        );
    }
    outcome
}

async fn settle_cancelled(
    purchases: &dyn PurchaseRepository,
    purchase: &Purchase,
) -> Result<Settled, DomainError> {
    if purchases.mark_as_cancelled(purchase.id).await? {
        tracing::info!(purchase_id = %purchase.id, "Purchase cancelled by provider");
    }
    Ok(Settled::Cancelled)
}

// ════════════════════════════════════════════════════════════════════════════
// Card
// ════════════════════════════════════════════════════════════════════════════

pub struct ReconcileCardHandler {
    purchases: Arc<dyn PurchaseRepository>,
    card: Arc<dyn CardPaymentProvider>,
    process: Arc<ProcessPurchaseHandler>,
    settings: ReconcileSettings,
}

impl ReconcileCardHandler {
    pub fn new(
        purchases: Arc<dyn PurchaseRepository>,
        card: Arc<dyn CardPaymentProvider>,
        process: Arc<ProcessPurchaseHandler>,
        settings: ReconcileSettings,
    ) -> Self {
        Self {
            purchases,
            card,
            process,
            settings,
        }
    }

    pub async fn run_once(&self) -> Result<ReconcileReport, DomainError> {
        let pending = self
            .purchases
            .find_by_invoice_type_and_status(InvoiceType::Card, PurchaseStatus::Pending)
            .await?;

        let mut report = ReconcileReport::default();
        for (index, purchase) in pending.iter().enumerate() {
            if index > 0 && !self.settings.request_delay.is_zero() {
                tokio::time::sleep(self.settings.request_delay).await;
            }
            report.record(isolated(purchase, self.reconcile(purchase)).await);
        }

        tracing::debug!(
            checked = report.checked,
            paid = report.paid,
            cancelled = report.cancelled,
            failed = report.failed,
            "Card reconciliation pass finished"
        );
        Ok(report)
    }

    async fn reconcile(&self, purchase: &Purchase) -> Result<Settled, DomainError> {
        let Some(payment_id) = purchase.correlation_id.as_deref() else {
            tracing::warn!(purchase_id = %purchase.id, "Pending card purchase has no payment id");
            return Ok(Settled::Unchanged);
        };

        let payment = self.fetch_with_backoff(payment_id).await?;

        if payment.is_succeeded() {
            self.process
                .handle(
                    ProcessPurchaseCommand::new(purchase.id)
                        .with_saved_method(payment.saved_method_id()),
                )
                .await?;
            return Ok(Settled::Paid);
        }

        match payment.status {
            CardPaymentStatus::Canceled => settle_cancelled(self.purchases.as_ref(), purchase).await,
            _ => Ok(Settled::Unchanged),
        }
    }

    /// Retries transient failures, doubling the wait each time.
    async fn fetch_with_backoff(&self, payment_id: &str) -> Result<CardPayment, PaymentError> {
        let attempts = self.settings.backoff_attempts.max(1);
        let mut retry_count = 0;
        loop {
            match self.card.get_payment(payment_id).await {
                Ok(payment) => return Ok(payment),
                Err(err) if err.retryable && retry_count + 1 < attempts => {
                    let delay = self.settings.backoff_base * (1u32 << retry_count);
                    tracing::warn!(
                        payment_id,
                        attempt = retry_count + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Card lookup failed, backing off"
                    );
                    if delay > Duration::ZERO {
                        tokio::time::sleep(delay).await;
                    }
                    retry_count += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Crypto
// ════════════════════════════════════════════════════════════════════════════

pub struct ReconcileCryptoHandler {
    purchases: Arc<dyn PurchaseRepository>,
    crypto: Arc<dyn CryptoPaymentProvider>,
    process: Arc<ProcessPurchaseHandler>,
}

impl ReconcileCryptoHandler {
    pub fn new(
        purchases: Arc<dyn PurchaseRepository>,
        crypto: Arc<dyn CryptoPaymentProvider>,
        process: Arc<ProcessPurchaseHandler>,
    ) -> Self {
        Self {
            purchases,
            crypto,
            process,
        }
    }

    pub async fn run_once(&self) -> Result<ReconcileReport, DomainError> {
        let pending = self
            .purchases
            .find_by_invoice_type_and_status(InvoiceType::Crypto, PurchaseStatus::Pending)
            .await?;

        let ids: Vec<String> = pending
            .iter()
            .filter_map(|p| p.correlation_id.clone())
            .collect();
        if ids.is_empty() {
            return Ok(ReconcileReport::default());
        }

        // one batched lookup for the whole tick
        let invoices = self.crypto.get_invoices(&ids).await?;

        let mut report = ReconcileReport::default();
        for invoice in invoices {
            let Some(purchase) = pending
                .iter()
                .find(|p| p.correlation_id.as_deref() == Some(invoice.invoice_id.as_str()))
            else {
                continue;
            };
            let work = async {
                match invoice.status {
                    CryptoInvoiceStatus::Paid => {
                        self.process
                            .handle(ProcessPurchaseCommand::new(purchase.id))
                            .await?;
                        Ok(Settled::Paid)
                    }
                    CryptoInvoiceStatus::Expired => {
                        settle_cancelled(self.purchases.as_ref(), purchase).await
                    }
                    CryptoInvoiceStatus::Active => Ok(Settled::Unchanged),
                }
            };
            report.record(isolated(purchase, work).await);
        }

        tracing::debug!(
            checked = report.checked,
            paid = report.paid,
            cancelled = report.cancelled,
            failed = report.failed,
            "Crypto reconciliation pass finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::Harness;
    use crate::ports::{CancellationReason, SavedPaymentMethod};

    fn card_payment(id: &str, status: CardPaymentStatus) -> CardPayment {
        CardPayment {
            id: id.to_string(),
            status,
            paid: status == CardPaymentStatus::Succeeded,
            cancellation_reason: None,
            payment_method: None,
            confirmation_url: None,
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Card
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn succeeded_payment_is_processed_once() {
        let h = Harness::new();
        let customer = h.customer(42).await;
        let purchase = h.tariff_purchase(&customer, InvoiceType::Card, "basic").await;
        let payment_id = purchase.correlation_id.clone().unwrap();
        h.card
            .set_payment(card_payment(&payment_id, CardPaymentStatus::Succeeded));

        let handler = h.ctx.reconcile_card_handler();
        let first = handler.run_once().await.unwrap();
        let second = handler.run_once().await.unwrap();

        assert_eq!(first.paid, 1);
        assert_eq!(second.checked, 0, "paid purchase is no longer pending");
        assert_eq!(h.panel.write_count(), 1);
    }

    #[tokio::test]
    async fn cancelled_payment_cancels_purchase() {
        let h = Harness::new();
        let customer = h.customer(42).await;
        let purchase = h.tariff_purchase(&customer, InvoiceType::Card, "basic").await;
        let mut payment = card_payment(
            purchase.correlation_id.as_deref().unwrap(),
            CardPaymentStatus::Canceled,
        );
        payment.cancellation_reason = Some(CancellationReason::Other("expired".to_string()));
        h.card.set_payment(payment);

        let report = h.ctx.reconcile_card_handler().run_once().await.unwrap();

        assert_eq!(report.cancelled, 1);
        let stored = h.purchases.find_by_id(purchase.id).await.unwrap().unwrap();
        assert_eq!(stored.status, PurchaseStatus::Cancel);
        assert_eq!(h.panel.write_count(), 0);
    }

    #[tokio::test]
    async fn pending_payment_is_left_alone() {
        let h = Harness::new();
        let customer = h.customer(42).await;
        let purchase = h.tariff_purchase(&customer, InvoiceType::Card, "basic").await;
        h.card.set_payment(card_payment(
            purchase.correlation_id.as_deref().unwrap(),
            CardPaymentStatus::WaitingForCapture,
        ));

        let report = h.ctx.reconcile_card_handler().run_once().await.unwrap();

        assert_eq!(report, ReconcileReport { checked: 1, ..Default::default() });
    }

    #[tokio::test]
    async fn transient_errors_are_retried_within_the_tick() {
        let h = Harness::new();
        let customer = h.customer(42).await;
        let purchase = h.tariff_purchase(&customer, InvoiceType::Card, "basic").await;
        h.card.set_payment(card_payment(
            purchase.correlation_id.as_deref().unwrap(),
            CardPaymentStatus::Succeeded,
        ));
        h.card.push_get_error(PaymentError::from_status(429, "slow down"));
        h.card.push_get_error(PaymentError::from_status(503, "unavailable"));

        let report = h.ctx.reconcile_card_handler().run_once().await.unwrap();

        assert_eq!(report.paid, 1);
        assert_eq!(h.card.get_count(), 3);
    }

    #[tokio::test]
    async fn backoff_gives_up_after_five_attempts() {
        let h = Harness::new();
        let customer = h.customer(42).await;
        h.tariff_purchase(&customer, InvoiceType::Card, "basic").await;
        for _ in 0..6 {
            h.card.push_get_error(PaymentError::from_status(500, "boom"));
        }

        let report = h.ctx.reconcile_card_handler().run_once().await.unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(h.card.get_count(), 5);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let h = Harness::new();
        let customer = h.customer(42).await;
        h.tariff_purchase(&customer, InvoiceType::Card, "basic").await;
        h.card.push_get_error(PaymentError::from_status(404, "gone"));

        let report = h.ctx.reconcile_card_handler().run_once().await.unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(h.card.get_count(), 1);
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_the_batch() {
        let h = Harness::new();
        let first = h.customer(42).await;
        let second = h.customer(43).await;
        let broken = h.tariff_purchase(&first, InvoiceType::Card, "basic").await;
        let healthy = h.tariff_purchase(&second, InvoiceType::Card, "basic").await;
        h.card
            .push_get_error(PaymentError::from_status(400, "bad request"));
        h.card.set_payment(card_payment(
            healthy.correlation_id.as_deref().unwrap(),
            CardPaymentStatus::Succeeded,
        ));

        let report = h.ctx.reconcile_card_handler().run_once().await.unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.paid, 1);
        let stored = h.purchases.find_by_id(broken.id).await.unwrap().unwrap();
        assert_eq!(stored.status, PurchaseStatus::Pending);
    }

    #[tokio::test]
    async fn saved_method_is_forwarded() {
        let h = Harness::new();
        let customer = h.customer(42).await;
        let purchase = h.tariff_purchase(&customer, InvoiceType::Card, "basic").await;
        let mut payment = card_payment(
            purchase.correlation_id.as_deref().unwrap(),
            CardPaymentStatus::Succeeded,
        );
        payment.payment_method = Some(SavedPaymentMethod {
            id: "pm_7".to_string(),
            saved: true,
        });
        h.card.set_payment(payment);

        h.ctx.reconcile_card_handler().run_once().await.unwrap();

        let stored = h.customers.get(customer.id).await.unwrap();
        assert_eq!(stored.recurring.payment_method_id.as_deref(), Some("pm_7"));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Crypto
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn crypto_uses_one_batched_lookup() {
        let h = Harness::new();
        let a = h.customer(42).await;
        let b = h.customer(43).await;
        let paid = h.tariff_purchase(&a, InvoiceType::Crypto, "basic").await;
        let expired = h.tariff_purchase(&b, InvoiceType::Crypto, "basic").await;
        h.crypto
            .set_status(paid.correlation_id.as_deref().unwrap(), CryptoInvoiceStatus::Paid);
        h.crypto.set_status(
            expired.correlation_id.as_deref().unwrap(),
            CryptoInvoiceStatus::Expired,
        );

        let report = h.ctx.reconcile_crypto_handler().run_once().await.unwrap();

        assert_eq!(h.crypto.batches().len(), 1);
        assert_eq!(h.crypto.batches()[0].len(), 2);
        assert_eq!(report.paid, 1);
        assert_eq!(report.cancelled, 1);
    }

    #[tokio::test]
    async fn crypto_provider_failure_is_reported() {
        let h = Harness::new();
        let customer = h.customer(42).await;
        h.tariff_purchase(&customer, InvoiceType::Crypto, "basic").await;
        h.crypto.fail_next(PaymentError::network("timeout"));

        assert!(h.ctx.reconcile_crypto_handler().run_once().await.is_err());
    }

    #[tokio::test]
    async fn nothing_pending_means_no_remote_call() {
        let h = Harness::new();
        let report = h.ctx.reconcile_crypto_handler().run_once().await.unwrap();
        assert_eq!(report, ReconcileReport::default());
        assert!(h.crypto.batches().is_empty());
    }
}
