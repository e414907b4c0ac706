//! ActivateTariffPromoHandler - redeems a tariff promo code into an offer
//! snapshot on the customer.
//!
//! Nothing is granted here. The snapshot copies price, devices and months
//! from the code as it is now; checkout reads only the snapshot, so later
//! edits to the code never reach an outstanding offer.

use std::sync::Arc;

use crate::domain::customer::PromoOffer;
use crate::domain::foundation::{CustomerId, DomainError, ErrorCode};
use crate::domain::offer::{check_redeemable, parse_code, Offer, OfferRejection};
use crate::ports::{Clock, CustomerRepository, PromoTariffCodeRepository};

use super::OfferOutcome;

#[derive(Debug, Clone)]
pub struct ActivateTariffPromoCommand {
    pub customer_id: CustomerId,
    pub code: String,
}

pub struct ActivateTariffPromoHandler {
    codes: Arc<dyn PromoTariffCodeRepository>,
    customers: Arc<dyn CustomerRepository>,
    clock: Arc<dyn Clock>,
}

impl ActivateTariffPromoHandler {
    pub fn new(
        codes: Arc<dyn PromoTariffCodeRepository>,
        customers: Arc<dyn CustomerRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            codes,
            customers,
            clock,
        }
    }

    pub async fn handle(
        &self,
        cmd: ActivateTariffPromoCommand,
    ) -> Result<OfferOutcome<Offer>, DomainError> {
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
            return Ok(OfferOutcome::Rejected(rejection));
        }

        // The conditional increment is the limit gate under concurrency;
        // the unique activation row is the per-customer gate.
        if !self.codes.increment_activations(code.id).await? {
            return Ok(OfferOutcome::Rejected(OfferRejection::LimitReached));
        }
        if !self.codes.record_activation(code.id, customer.id, now).await? {
            tracing::warn!(
                code = %code.code,
                customer_id = %customer.id,
                "Concurrent tariff promo activation, counter is one ahead"
            );
            return Ok(OfferOutcome::Rejected(OfferRejection::AlreadyUsed));
        }

        let offer = code.snapshot_offer(now);
        self.customers
            .set_promo_offer(
                customer.id,
                &PromoOffer {
                    code_id: code.id,
                    offer,
                },
            )
            .await?;

        tracing::info!(
            code = %code.code,
            customer_id = %customer.id,
            price = offer.price,
            expires_at = %offer.expires_at,
            "Tariff promo offer written"
        );

        Ok(OfferOutcome::Applied(offer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::adapters::memory::InMemoryPromoTariffCodeRepository;
    use crate::application::handlers::{CheckoutItem, CreateCheckoutCommand, CreateCheckoutResult};
    use crate::application::testing::Harness;
    use crate::domain::foundation::{CodeId, Timestamp};
    use crate::domain::offer::{CodeValue, NewPromoTariffCode, OfferKind, PromoTariffCode};
    use crate::domain::purchase::InvoiceType;

    fn tariff_code(h: &Harness) -> PromoTariffCode {
        PromoTariffCode {
            id: CodeId::new(1),
            code: CodeValue::try_new("HALFPRICE").unwrap(),
            price: 75,
            devices: 2,
            months: 1,
            max_activations: 10,
            current_activations: 0,
            valid_hours: 24,
            is_active: true,
            valid_until: None,
            created_at: h.clock.now(),
        }
    }

    fn cmd(customer_id: CustomerId) -> ActivateTariffPromoCommand {
        ActivateTariffPromoCommand {
            customer_id,
            code: "halfprice".to_string(),
        }
    }

    #[tokio::test]
    async fn activation_writes_snapshot_and_grants_nothing() {
        let h = Harness::new();
        h.tariff_codes.insert(tariff_code(&h)).await;
        let c = h.customer(42).await;

        let out = h
            .ctx
            .activate_tariff_promo_handler()
            .handle(cmd(c.id))
            .await
            .unwrap();

        let offer = match out {
            OfferOutcome::Applied(offer) => offer,
            other => panic!("expected Applied, got {:?}", other),
        };
        assert_eq!(offer.expires_at, h.clock.now().add_hours(24));
        assert_eq!(h.panel.write_count(), 0);
        let stored = h.customers.get(c.id).await.unwrap().promo_offer.unwrap();
        assert_eq!(stored.code_id, CodeId::new(1));
        assert_eq!(stored.offer, offer);
        assert_eq!(
            h.tariff_codes.get(CodeId::new(1)).await.unwrap().current_activations,
            1
        );
    }

    #[tokio::test]
    async fn second_activation_is_already_used() {
        let h = Harness::new();
        h.tariff_codes.insert(tariff_code(&h)).await;
        let c = h.customer(42).await;
        let handler = h.ctx.activate_tariff_promo_handler();

        handler.handle(cmd(c.id)).await.unwrap();
        let again = handler.handle(cmd(c.id)).await.unwrap();

        assert_eq!(again.rejection(), Some(OfferRejection::AlreadyUsed));
        assert_eq!(
            h.tariff_codes.get(CodeId::new(1)).await.unwrap().current_activations,
            1
        );
    }

    #[tokio::test]
    async fn later_code_edit_does_not_change_purchase_terms() {
        let h = Harness::new();
        h.tariff_codes.insert(tariff_code(&h)).await;
        let c = h.customer(42).await;
        h.ctx
            .activate_tariff_promo_handler()
            .handle(cmd(c.id))
            .await
            .unwrap();

        h.tariff_codes
            .edit(CodeId::new(1), |code| {
                code.price = 10;
                code.devices = 9;
                code.months = 12;
            })
            .await;

        let result = h
            .ctx
            .checkout_handler()
            .handle(CreateCheckoutCommand {
                customer_id: c.id,
                invoice_type: InvoiceType::Card,
                item: CheckoutItem::Offer(OfferKind::TariffPromo),
                save_payment_method: false,
            })
            .await
            .unwrap();

        let CreateCheckoutResult::Created { purchase, .. } = result else {
            panic!("expected a purchase");
        };
        assert_eq!(purchase.amount, 75);
        assert_eq!(purchase.device_limit, Some(2));
        assert_eq!(purchase.months, 1);
    }

    #[tokio::test]
    async fn snapshot_expires_strictly() {
        let h = Harness::new();
        h.tariff_codes.insert(tariff_code(&h)).await;
        let c = h.customer(42).await;
        h.ctx
            .activate_tariff_promo_handler()
            .handle(cmd(c.id))
            .await
            .unwrap();

        h.clock.advance_hours(24);
        let result = h
            .ctx
            .checkout_handler()
            .handle(CreateCheckoutCommand {
                customer_id: c.id,
                invoice_type: InvoiceType::Card,
                item: CheckoutItem::Offer(OfferKind::TariffPromo),
                save_payment_method: false,
            })
            .await
            .unwrap();

        assert!(matches!(
            result,
            CreateCheckoutResult::Rejected(OfferRejection::Expired)
        ));
    }

    #[tokio::test]
    async fn exhausted_code_is_rejected_without_counting() {
        let h = Harness::new();
        let mut code = tariff_code(&h);
        code.max_activations = 3;
        code.current_activations = 3;
        h.tariff_codes.insert(code).await;
        let c = h.customer(42).await;

        let out = h
            .ctx
            .activate_tariff_promo_handler()
            .handle(cmd(c.id))
            .await
            .unwrap();

        assert_eq!(out.rejection(), Some(OfferRejection::LimitReached));
        assert_eq!(
            h.tariff_codes.get(CodeId::new(1)).await.unwrap().current_activations,
            3
        );
        assert!(h.customers.get(c.id).await.unwrap().promo_offer.is_none());
    }

    /// Reads see a free slot but the increment loses to another activation.
    struct LastSlotTaken(InMemoryPromoTariffCodeRepository);

    #[async_trait]
    impl PromoTariffCodeRepository for LastSlotTaken {
        async fn create(&self, code: NewPromoTariffCode) -> Result<PromoTariffCode, DomainError> {
            self.0.create(code).await
        }

        async fn find_by_code(
            &self,
            code: &CodeValue,
        ) -> Result<Option<PromoTariffCode>, DomainError> {
            self.0.find_by_code(code).await
        }

        async fn set_active(&self, id: CodeId, active: bool) -> Result<(), DomainError> {
            self.0.set_active(id, active).await
        }

        async fn delete(&self, id: CodeId) -> Result<(), DomainError> {
            self.0.delete(id).await
        }

        async fn has_activation(
            &self,
            code_id: CodeId,
            customer_id: CustomerId,
        ) -> Result<bool, DomainError> {
            self.0.has_activation(code_id, customer_id).await
        }

        async fn record_activation(
            &self,
            code_id: CodeId,
            customer_id: CustomerId,
            at: Timestamp,
        ) -> Result<bool, DomainError> {
            self.0.record_activation(code_id, customer_id, at).await
        }

        async fn increment_activations(&self, _code_id: CodeId) -> Result<bool, DomainError> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn losing_the_increment_race_is_limit_reached() {
        let h = Harness::new();
        let mut code = tariff_code(&h);
        code.max_activations = 1;
        h.tariff_codes.insert(code).await;
        let c = h.customer(42).await;
        let handler = ActivateTariffPromoHandler::new(
            Arc::new(LastSlotTaken(h.tariff_codes.clone())),
            h.ctx.customers.clone(),
            h.ctx.clock.clone(),
        );

        let out = handler.handle(cmd(c.id)).await.unwrap();

        assert_eq!(out.rejection(), Some(OfferRejection::LimitReached));
        assert!(!h
            .tariff_codes
            .has_activation(CodeId::new(1), c.id)
            .await
            .unwrap());
        assert!(h.customers.get(c.id).await.unwrap().promo_offer.is_none());
    }
}
