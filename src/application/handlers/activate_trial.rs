//! ActivateTrialHandler - one free trial per customer.

use std::sync::Arc;

use crate::application::settings::BillingSettings;
use crate::domain::foundation::{CustomerId, DomainError, ErrorCode, Timestamp};
use crate::domain::notification::Notification;
use crate::ports::{CustomerRepository, Notifier, PurchaseRepository};

use super::entitlement::{EntitlementApplier, EntitlementGrant};
use super::notify::notify;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivateTrialResult {
    Activated { expire_at: Timestamp },
    /// Trials are switched off.
    Disabled,
    /// Customer already had a subscription or a paid purchase.
    AlreadyUsed,
}

pub struct ActivateTrialHandler {
    customers: Arc<dyn CustomerRepository>,
    purchases: Arc<dyn PurchaseRepository>,
    applier: Arc<EntitlementApplier>,
    notifier: Arc<dyn Notifier>,
    settings: Arc<BillingSettings>,
}

impl ActivateTrialHandler {
    pub fn new(
        customers: Arc<dyn CustomerRepository>,
        purchases: Arc<dyn PurchaseRepository>,
        applier: Arc<EntitlementApplier>,
        notifier: Arc<dyn Notifier>,
        settings: Arc<BillingSettings>,
    ) -> Self {
        Self {
            customers,
            purchases,
            applier,
            notifier,
            settings,
        }
    }

    pub async fn handle(&self, customer_id: CustomerId) -> Result<ActivateTrialResult, DomainError> {
        let trial = &self.settings.trial;
        if !trial.enabled {
            return Ok(ActivateTrialResult::Disabled);
        }

        let customer = self.customers.find_by_id(customer_id).await?.ok_or_else(|| {
            DomainError::new(
                ErrorCode::CustomerNotFound,
                format!("customer {} not found", customer_id),
            )
        })?;

        if customer.expire_at.is_some() || self.purchases.has_paid_purchases(customer.id).await? {
            return Ok(ActivateTrialResult::AlreadyUsed);
        }

        let expire_at = self
            .applier
            .create_or_update_user(EntitlementGrant {
                customer_id: customer.id,
                external_id: customer.external_id,
                traffic_limit_bytes: trial.traffic_limit_bytes,
                days: trial.days,
                is_trial: true,
                device_limit: Some(trial.device_limit),
            })
            .await?;

        tracing::info!(customer_id = %customer.id, expire_at = %expire_at, "Trial activated");
        notify(
            self.notifier.as_ref(),
            &customer,
            Notification::TrialActivated { expire_at },
        )
        .await;

        Ok(ActivateTrialResult::Activated { expire_at })
    }
}
