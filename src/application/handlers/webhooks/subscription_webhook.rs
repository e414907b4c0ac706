//! SubscriptionWebhookHandler - subscription platform payments and cancellations.

use std::sync::Arc;

use crate::application::handlers::notify::notify;
use crate::application::handlers::process_purchase::{
    ProcessPurchaseCommand, ProcessPurchaseHandler, ProcessPurchaseResult,
};
use crate::domain::customer::Customer;
use crate::domain::foundation::Timestamp;
use crate::domain::notification::Notification;
use crate::domain::purchase::{InvoiceType, NewPurchase};
use crate::domain::webhook::{
    SignatureVerifier, SubscriptionEvent, SubscriptionPayload, SubscriptionWebhook, WebhookError,
};
use crate::ports::{CustomerRepository, Notifier, PurchaseRepository};

#[derive(Debug, Clone)]
pub struct HandleSubscriptionWebhookCommand {
    pub payload: Vec<u8>,
    pub signature: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionWebhookResult {
    Extended { expire_at: Timestamp },
    /// Same subscription period delivered again.
    Duplicate,
    CancellationNoted,
    Ignored,
}

pub struct SubscriptionWebhookHandler {
    verifier: SignatureVerifier,
    customers: Arc<dyn CustomerRepository>,
    purchases: Arc<dyn PurchaseRepository>,
    process: Arc<ProcessPurchaseHandler>,
    notifier: Arc<dyn Notifier>,
}

impl SubscriptionWebhookHandler {
    pub fn new(
        verifier: SignatureVerifier,
        customers: Arc<dyn CustomerRepository>,
        purchases: Arc<dyn PurchaseRepository>,
        process: Arc<ProcessPurchaseHandler>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            verifier,
            customers,
            purchases,
            process,
            notifier,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandleSubscriptionWebhookCommand,
    ) -> Result<SubscriptionWebhookResult, WebhookError> {
        // 1. Verify signature and parse
        self.verifier
            .verify(&cmd.payload, cmd.signature.as_deref())?;
        let webhook = SubscriptionWebhook::parse(&cmd.payload)?;

        let kind = webhook.kind();
        if let SubscriptionEvent::Other(name) = &kind {
            tracing::debug!(event = %name, "Subscription event ignored");
            return Ok(SubscriptionWebhookResult::Ignored);
        }

        // 2. Resolve identity
        let payload = &webhook.payload;
        let customer = self
            .customers
            .find_by_external_id(payload.external_id())
            .await?
            .ok_or(WebhookError::CustomerNotFound)?;

        // 3. Dispatch
        match kind {
            SubscriptionEvent::NewSubscription => self.paid(&customer, payload).await,
            SubscriptionEvent::CancelledSubscription => {
                tracing::info!(
                    customer_id = %customer.id,
                    subscription_id = payload.subscription_id,
                    reason = payload.cancel_reason.as_deref().unwrap_or("unspecified"),
                    "Platform subscription cancelled"
                );
                notify(
                    self.notifier.as_ref(),
                    &customer,
                    Notification::SubscriptionCancelled {
                        expire_at: customer.expire_at,
                    },
                )
                .await;
                Ok(SubscriptionWebhookResult::CancellationNoted)
            }
            SubscriptionEvent::Other(_) => Ok(SubscriptionWebhookResult::Ignored),
        }
    }

    async fn paid(
        &self,
        customer: &Customer,
        payload: &SubscriptionPayload,
    ) -> Result<SubscriptionWebhookResult, WebhookError> {
        let correlation_id = payload.correlation_id();

        // A redelivery finds the row from the first attempt. Unless it
        // was paid, processing resumes on that same row.
        let existing = self
            .purchases
            .find_by_correlation_id(InvoiceType::SubscriptionPlatform, &correlation_id)
            .await?;
        let purchase = match existing {
            Some(purchase) if purchase.is_paid() => {
                tracing::info!(correlation_id = %correlation_id, "Subscription period already paid");
                return Ok(SubscriptionWebhookResult::Duplicate);
            }
            Some(purchase) => purchase,
            None => {
                let new_purchase = NewPurchase {
                    customer_id: customer.id,
                    amount: payload.major_amount()?,
                    currency: payload.currency()?,
                    months: payload.months()?,
                    invoice_type: InvoiceType::SubscriptionPlatform,
                    correlation_id: Some(correlation_id.clone()),
                    tariff_name: None,
                    device_limit: None,
                    offer_kind: None,
                    save_payment_method: false,
                    is_recurring: false,
                };
                self.purchases.create(new_purchase).await?
            }
        };

        match self
            .process
            .handle(ProcessPurchaseCommand::new(purchase.id))
            .await?
        {
            ProcessPurchaseResult::Granted { expire_at } => {
                Ok(SubscriptionWebhookResult::Extended { expire_at })
            }
            ProcessPurchaseResult::AlreadyPaid => Ok(SubscriptionWebhookResult::Duplicate),
        }
    }
}
