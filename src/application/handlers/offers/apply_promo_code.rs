//! ApplyPromoCodeHandler - grants a generic promo code's bonus days.
//!
//! The grant happens first and is authoritative. Recording the activation
//! and bumping the counter afterwards are best effort: a failure there is
//! logged and the grant stands.

use std::sync::Arc;

use crate::application::handlers::entitlement::{EntitlementApplier, EntitlementGrant};
use crate::application::handlers::notify::notify;
use crate::application::settings::BillingSettings;
use crate::domain::foundation::{CustomerId, DomainError, ErrorCode, Timestamp};
use crate::domain::notification::Notification;
use crate::domain::offer::{check_redeemable, parse_code, OfferRejection};
use crate::ports::{Clock, CustomerRepository, Notifier, PromoCodeRepository};

use super::OfferOutcome;

#[derive(Debug, Clone)]
pub struct ApplyPromoCodeCommand {
    pub customer_id: CustomerId,
    pub code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromoApplied {
    pub bonus_days: i64,
    pub expire_at: Timestamp,
}

pub struct ApplyPromoCodeHandler {
    codes: Arc<dyn PromoCodeRepository>,
    customers: Arc<dyn CustomerRepository>,
    applier: Arc<EntitlementApplier>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    settings: Arc<BillingSettings>,
}

impl ApplyPromoCodeHandler {
    pub fn new(
        codes: Arc<dyn PromoCodeRepository>,
        customers: Arc<dyn CustomerRepository>,
        applier: Arc<EntitlementApplier>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        settings: Arc<BillingSettings>,
    ) -> Self {
        Self {
            codes,
            customers,
            applier,
            notifier,
            clock,
            settings,
        }
    }

    pub async fn handle(
        &self,
        cmd: ApplyPromoCodeCommand,
    ) -> Result<OfferOutcome<PromoApplied>, DomainError> {
        let value = match parse_code(&cmd.code) {
            Ok(value) => value,
            Err(rejection) => return Ok(OfferOutcome::Rejected(rejection)),
        };
        let Some(code) = self.codes.find_by_code(&value).await? else {
            return Ok(OfferOutcome::Rejected(OfferRejection::NotFound));
        };
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

        let now = self.clock.now();
        let already_used = self.codes.has_activation(code.id, customer.id).await?;
        if let Err(rejection) = check_redeemable(&code, now, already_used) {
            tracing::debug!(
                code = %code.code,
                customer_id = %customer.id,
                reason = rejection.i18n_key(),
                "Promo code rejected"
            );
            return Ok(OfferOutcome::Rejected(rejection));
        }

        let expire_at = self
            .applier
            .create_or_update_user(EntitlementGrant {
                customer_id: customer.id,
                external_id: customer.external_id,
                traffic_limit_bytes: self.settings.traffic_limit_bytes,
                days: code.bonus_days,
                is_trial: false,
                device_limit: None,
            })
            .await?;

        match self.codes.record_activation(code.id, customer.id, now).await {
            Ok(true) => {}
            Ok(false) => tracing::warn!(
                code = %code.code,
                customer_id = %customer.id,
                "Promo activation already recorded by a concurrent request"
            ),
            Err(err) => tracing::error!(
                code = %code.code,
                customer_id = %customer.id,
                error = %err,
                "Failed to record promo activation after grant"
            ),
        }
        match self.codes.increment_activations(code.id).await {
            Ok(true) => {}
            Ok(false) => tracing::warn!(code = %code.code, "Promo counter already at its limit"),
            Err(err) => tracing::error!(
                code = %code.code,
                error = %err,
                "Failed to increment promo counter after grant"
            ),
        }

        tracing::info!(
            code = %code.code,
            customer_id = %customer.id,
            bonus_days = code.bonus_days,
            "Promo code applied"
        );

        notify(
            self.notifier.as_ref(),
            &customer,
            Notification::PromoApplied {
                bonus_days: code.bonus_days,
                expire_at,
            },
        )
        .await;

        Ok(OfferOutcome::Applied(PromoApplied {
            bonus_days: code.bonus_days,
            expire_at,
        }))
    }
}
