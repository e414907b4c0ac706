//! PanelWebhookHandler - reacts to VPN panel expiry events.
//!
//! Every event is ignored for accounts that never connected. Past that,
//! the customer is resolved by external id and the event routes to a
//! notice, the recurring biller or winback issuance.

use std::sync::Arc;

use crate::application::handlers::notify::notify;
use crate::application::handlers::offers::{IssueWinbackHandler, WinbackIssue};
use crate::application::handlers::recurring_biller::{RecurringBiller, RecurringOutcome};
use crate::application::settings::BillingSettings;
use crate::domain::customer::Customer;
use crate::domain::notification::Notification;
use crate::domain::webhook::{PanelEvent, PanelWebhook, SignatureVerifier, WebhookError};
use crate::ports::{Clock, CustomerRepository, Notifier};

#[derive(Debug, Clone)]
pub struct HandlePanelWebhookCommand {
    /// Raw body, exactly as signed.
    pub payload: Vec<u8>,
    pub signature: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelWebhookResult {
    /// Account has no first connection recorded.
    NeverConnected,
    /// Event kind this core does not act on.
    Ignored,
    Notified(&'static str),
    /// Charge notice already sent within the throttle window.
    NoticeThrottled,
    Recurring(RecurringOutcome),
    Winback(WinbackIssue),
}

pub struct PanelWebhookHandler {
    verifier: SignatureVerifier,
    customers: Arc<dyn CustomerRepository>,
    biller: Arc<RecurringBiller>,
    winback: Arc<IssueWinbackHandler>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    settings: Arc<BillingSettings>,
}

impl PanelWebhookHandler {
    pub fn new(
        verifier: SignatureVerifier,
        customers: Arc<dyn CustomerRepository>,
        biller: Arc<RecurringBiller>,
        winback: Arc<IssueWinbackHandler>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        settings: Arc<BillingSettings>,
    ) -> Self {
        Self {
            verifier,
            customers,
            biller,
            winback,
            notifier,
            clock,
            settings,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandlePanelWebhookCommand,
    ) -> Result<PanelWebhookResult, WebhookError> {
        // 1. Verify signature
        self.verifier
            .verify(&cmd.payload, cmd.signature.as_deref())?;

        // 2. Parse payload
        let webhook = PanelWebhook::parse(&cmd.payload)?;
        let kind = webhook.kind();
        if let PanelEvent::Other(name) = &kind {
            tracing::debug!(event = %name, "Panel event ignored");
            return Ok(PanelWebhookResult::Ignored);
        }

        // 3. Only accounts that actually connected get expiry traffic
        if webhook.data.first_connected_at().is_none() {
            tracing::debug!(event = %webhook.event, "Account never connected, skipping");
            return Ok(PanelWebhookResult::NeverConnected);
        }

        // 4. Resolve identity
        let external_id = webhook.data.external_id()?;
        let customer = self
            .customers
            .find_by_external_id(external_id)
            .await?
            .ok_or(WebhookError::CustomerNotFound)?;

        tracing::info!(
            event = %webhook.event,
            customer_id = %customer.id,
            external_id = %external_id,
            "Panel event received"
        );

        // 5. Dispatch
        match kind {
            PanelEvent::ExpiresIn24Hours => self.expires_soon(&customer).await,
            PanelEvent::Expired => self.expired(&customer).await,
            PanelEvent::Expired24HoursAgo => Ok(PanelWebhookResult::Winback(
                self.winback.handle(&customer).await?,
            )),
            PanelEvent::Other(_) => Ok(PanelWebhookResult::Ignored),
        }
    }

    async fn expires_soon(&self, customer: &Customer) -> Result<PanelWebhookResult, WebhookError> {
        if !self.biller.is_eligible(customer) {
            let notification = Notification::SubscriptionExpiringSoon {
                expire_at: customer.expire_at,
            };
            let key = notification.i18n_key();
            notify(self.notifier.as_ref(), customer, notification).await;
            return Ok(PanelWebhookResult::Notified(key));
        }

        // incomplete terms fail here the same way the charge itself would
        let plan = customer.recurring.plan().map_err(|err| {
            tracing::error!(customer_id = %customer.id, error = %err, "Recurring fields incomplete");
            err
        })?;

        let now = self.clock.now();
        if !customer
            .recurring
            .should_notify(now, self.settings.recurring_notice_gap_hours)
        {
            return Ok(PanelWebhookResult::NoticeThrottled);
        }

        let mut recurring = customer.recurring.clone();
        recurring.notified_at = Some(now);
        self.customers
            .update_recurring(customer.id, &recurring)
            .await?;

        let notification = Notification::RecurringChargeUpcoming {
            amount: plan.amount,
            expire_at: customer.expire_at,
        };
        let key = notification.i18n_key();
        notify(self.notifier.as_ref(), customer, notification).await;
        Ok(PanelWebhookResult::Notified(key))
    }

    async fn expired(&self, customer: &Customer) -> Result<PanelWebhookResult, WebhookError> {
        if self.biller.is_eligible(customer) {
            return Ok(PanelWebhookResult::Recurring(
                self.biller.charge(customer).await?,
            ));
        }

        let notification = Notification::SubscriptionExpired;
        let key = notification.i18n_key();
        notify(self.notifier.as_ref(), customer, notification).await;
        Ok(PanelWebhookResult::Notified(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::Harness;
    use crate::domain::foundation::ExternalId;
    use crate::domain::webhook::sign_payload;

    const SECRET: &str = "panel-secret";

    fn body(event: &str, telegram_id: i64, connected: bool) -> Vec<u8> {
        let connected = if connected {
            r#""firstConnectedAt": "2024-05-01T00:00:00Z","#
        } else {
            ""
        };
        format!(
            r#"{{"event": "{}", "data": {{ {} "uuid": "u-1", "telegramId": {} }}}}"#,
            event, connected, telegram_id
        )
        .into_bytes()
    }

    fn signed(payload: Vec<u8>) -> HandlePanelWebhookCommand {
        let signature = sign_payload(SECRET, &payload);
        HandlePanelWebhookCommand {
            payload,
            signature: Some(signature),
        }
    }

    async fn recurring_customer(h: &Harness) {
        let c = h.customer(42).await;
        let mut recurring = c.recurring.clone();
        recurring.store_method("pm_1".to_string(), "basic".to_string(), 1, 150, true);
        h.customers.update_recurring(c.id, &recurring).await.unwrap();
        h.panel.seed_user(ExternalId::new(42), h.clock.now(), Some(1));
    }

    fn recurring_harness() -> Harness {
        let mut settings = BillingSettings::default();
        settings.recurring_enabled = true;
        settings.winback.enabled = true;
        Harness::with_settings(settings)
    }

    // ══════════════════════════════════════════════════════════════
    // Verification and gating
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn wrong_signature_is_rejected_before_parsing() {
        let h = Harness::new();
        let handler = h.ctx.panel_webhook_handler(SignatureVerifier::new(Some(SECRET)));

        let err = handler
            .handle(HandlePanelWebhookCommand {
                payload: b"not json".to_vec(),
                signature: Some("deadbeef".to_string()),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, WebhookError::InvalidSignature));
    }

    #[tokio::test]
    async fn insecure_mode_accepts_unsigned_events() {
        let h = Harness::new();
        h.customer(42).await;
        let handler = h.ctx.panel_webhook_handler(SignatureVerifier::new(None));

        let out = handler
            .handle(HandlePanelWebhookCommand {
                payload: body("user.expired", 42, true),
                signature: None,
            })
            .await
            .unwrap();

        assert_eq!(out, PanelWebhookResult::Notified("subscription.expired"));
    }

    #[tokio::test]
    async fn never_connected_accounts_are_skipped() {
        let h = Harness::new();
        h.customer(42).await;
        let handler = h.ctx.panel_webhook_handler(SignatureVerifier::new(Some(SECRET)));

        let out = handler
            .handle(signed(body("user.expired", 42, false)))
            .await
            .unwrap();

        assert_eq!(out, PanelWebhookResult::NeverConnected);
        assert!(h.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn unknown_customer_is_soft_failure() {
        let h = Harness::new();
        let handler = h.ctx.panel_webhook_handler(SignatureVerifier::new(Some(SECRET)));

        let err = handler
            .handle(signed(body("user.expired", 777, true)))
            .await
            .unwrap_err();

        assert!(matches!(err, WebhookError::CustomerNotFound));
        assert_eq!(err.status_code(), http::StatusCode::OK);
    }

    #[tokio::test]
    async fn unrelated_events_are_ignored() {
        let h = Harness::new();
        let handler = h.ctx.panel_webhook_handler(SignatureVerifier::new(Some(SECRET)));
        let out = handler
            .handle(signed(body("user.modified", 42, true)))
            .await
            .unwrap();
        assert_eq!(out, PanelWebhookResult::Ignored);
    }

    // ══════════════════════════════════════════════════════════════
    // Routing
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn expiring_recurring_customer_gets_one_notice_per_window() {
        let h = recurring_harness();
        recurring_customer(&h).await;
        let handler = h.ctx.panel_webhook_handler(SignatureVerifier::new(Some(SECRET)));

        let first = handler
            .handle(signed(body("user.expires_in_24_hours", 42, true)))
            .await
            .unwrap();
        h.clock.advance_hours(2);
        let second = handler
            .handle(signed(body("user.expires_in_24_hours", 42, true)))
            .await
            .unwrap();

        assert_eq!(first, PanelWebhookResult::Notified("recurring.upcoming"));
        assert_eq!(second, PanelWebhookResult::NoticeThrottled);
        assert_eq!(h.notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn expiring_notice_needs_a_stored_amount() {
        let h = recurring_harness();
        recurring_customer(&h).await;
        let c = h
            .customers
            .find_by_external_id(ExternalId::new(42))
            .await
            .unwrap()
            .unwrap();
        let mut broken = c.recurring.clone();
        broken.amount = None;
        h.customers.update_recurring(c.id, &broken).await.unwrap();
        let handler = h.ctx.panel_webhook_handler(SignatureVerifier::new(Some(SECRET)));

        let err = handler
            .handle(signed(body("user.expires_in_24_hours", 42, true)))
            .await
            .unwrap_err();

        assert!(matches!(err, WebhookError::Upstream(_)));
        assert!(h.notifier.sent().is_empty());
        assert!(h.customers.get(c.id).await.unwrap().recurring.notified_at.is_none());
    }

    #[tokio::test]
    async fn transient_charge_error_asks_the_panel_to_redeliver() {
        let h = recurring_harness();
        recurring_customer(&h).await;
        h.card
            .push_charge_result(Err(crate::ports::PaymentError::network("connection reset")));
        let handler = h.ctx.panel_webhook_handler(SignatureVerifier::new(Some(SECRET)));

        let err = handler
            .handle(signed(body("user.expired", 42, true)))
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), http::StatusCode::INTERNAL_SERVER_ERROR);
        assert!(h.notifier.sent().is_empty());

        let out = handler
            .handle(signed(body("user.expired", 42, true)))
            .await
            .unwrap();
        assert!(matches!(
            out,
            PanelWebhookResult::Recurring(RecurringOutcome::Charged { .. })
        ));
        assert_eq!(h.purchases.all().await.len(), 1);
    }

    #[tokio::test]
    async fn expiring_plain_customer_gets_expiring_notice() {
        let h = Harness::new();
        h.customer(42).await;
        let handler = h.ctx.panel_webhook_handler(SignatureVerifier::new(Some(SECRET)));

        let out = handler
            .handle(signed(body("user.expires_in_24_hours", 42, true)))
            .await
            .unwrap();

        assert_eq!(out, PanelWebhookResult::Notified("subscription.expiring_soon"));
    }

    #[tokio::test]
    async fn expired_recurring_customer_is_charged() {
        let h = recurring_harness();
        recurring_customer(&h).await;
        let handler = h.ctx.panel_webhook_handler(SignatureVerifier::new(Some(SECRET)));

        let out = handler
            .handle(signed(body("user.expired", 42, true)))
            .await
            .unwrap();

        assert!(matches!(
            out,
            PanelWebhookResult::Recurring(RecurringOutcome::Charged { .. })
        ));
        assert_eq!(h.card.charge_count(), 1);
    }

    #[tokio::test]
    async fn redelivered_expired_event_charges_once() {
        let h = recurring_harness();
        recurring_customer(&h).await;
        let handler = h.ctx.panel_webhook_handler(SignatureVerifier::new(Some(SECRET)));

        handler
            .handle(signed(body("user.expired", 42, true)))
            .await
            .unwrap();
        let again = handler
            .handle(signed(body("user.expired", 42, true)))
            .await
            .unwrap();

        assert_eq!(
            again,
            PanelWebhookResult::Recurring(RecurringOutcome::SkippedRecentPayment)
        );
        assert_eq!(h.card.charge_count(), 1);
    }

    #[tokio::test]
    async fn expired_day_ago_issues_winback() {
        let h = recurring_harness();
        h.customer(42).await;
        let handler = h.ctx.panel_webhook_handler(SignatureVerifier::new(Some(SECRET)));

        let out = handler
            .handle(signed(body("user.expired_24_hours_ago", 42, true)))
            .await
            .unwrap();

        assert!(matches!(out, PanelWebhookResult::Winback(WinbackIssue::Issued(_))));
        assert_eq!(
            h.notifier.sent_to(ExternalId::new(42))[0].i18n_key(),
            "winback.offer"
        );
    }
}
