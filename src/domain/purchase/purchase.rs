//! Purchase ledger entry.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    Currency, CustomerId, DomainError, ErrorCode, PurchaseId, Timestamp,
};
use crate::domain::offer::{Offer, OfferKind};
use crate::domain::tariff::Tariff;

use super::{InvoiceType, PurchaseStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: PurchaseId,
    pub customer_id: CustomerId,
    pub amount: i64,
    pub currency: Currency,
    pub months: u32,
    pub status: PurchaseStatus,
    pub invoice_type: InvoiceType,
    /// Provider-side id: card payment id, crypto invoice id, platform subscription key
    pub correlation_id: Option<String>,
    pub tariff_name: Option<String>,
    /// Device limit granted by this purchase; `None` keeps the panel's current one
    pub device_limit: Option<u32>,
    /// Offer snapshot this purchase was created from, cleared once paid
    pub offer_kind: Option<OfferKind>,
    /// Ask the card processor to store the payment method for recurring charges
    pub save_payment_method: bool,
    /// Charged against a stored method without the customer starting it
    pub is_recurring: bool,
    pub created_at: Timestamp,
    pub paid_at: Option<Timestamp>,
}

impl Purchase {
    pub fn is_paid(&self) -> bool {
        self.status == PurchaseStatus::Paid
    }

    /// Whether `offer` still carries the terms this purchase was created with.
    pub fn was_made_from(&self, offer: &Offer) -> bool {
        self.offer_kind == Some(offer.kind)
            && self.amount == offer.price
            && self.months == offer.months
            && self.device_limit == Some(offer.devices)
    }

    /// Days this purchase adds to an entitlement.
    pub fn days(&self, days_per_month: i64) -> i64 {
        self.months as i64 * days_per_month
    }

    fn transition(&mut self, target: PurchaseStatus) -> Result<(), DomainError> {
        if !self.status.can_transition_to(target) {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("purchase {} cannot go from {} to {}", self.id, self.status, target),
            ));
        }
        self.status = target;
        Ok(())
    }

    pub fn mark_pending(&mut self, correlation_id: Option<String>) -> Result<(), DomainError> {
        self.transition(PurchaseStatus::Pending)?;
        if correlation_id.is_some() {
            self.correlation_id = correlation_id;
        }
        Ok(())
    }

    pub fn mark_paid(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition(PurchaseStatus::Paid)?;
        self.paid_at = Some(now);
        Ok(())
    }

    pub fn mark_cancelled(&mut self) -> Result<(), DomainError> {
        self.transition(PurchaseStatus::Cancel)
    }
}

/// A purchase about to be written to the ledger; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPurchase {
    pub customer_id: CustomerId,
    pub amount: i64,
    pub currency: Currency,
    pub months: u32,
    pub invoice_type: InvoiceType,
    pub correlation_id: Option<String>,
    pub tariff_name: Option<String>,
    pub device_limit: Option<u32>,
    pub offer_kind: Option<OfferKind>,
    pub save_payment_method: bool,
    pub is_recurring: bool,
}

impl NewPurchase {
    /// Terms taken from the tariff table.
    pub fn from_tariff(
        customer_id: CustomerId,
        tariff: &Tariff,
        invoice_type: InvoiceType,
        currency: Currency,
        amount: i64,
    ) -> Self {
        Self {
            customer_id,
            amount,
            currency,
            months: tariff.months,
            invoice_type,
            correlation_id: None,
            tariff_name: Some(tariff.name.clone()),
            device_limit: Some(tariff.devices),
            offer_kind: None,
            save_payment_method: false,
            is_recurring: false,
        }
    }

    /// Terms taken only from an offer snapshot, never from the code row
    /// it came from.
    pub fn from_offer(customer_id: CustomerId, offer: &Offer, invoice_type: InvoiceType) -> Self {
        Self {
            customer_id,
            amount: offer.price,
            currency: Currency::Rub,
            months: offer.months,
            invoice_type,
            correlation_id: None,
            tariff_name: None,
            device_limit: Some(offer.devices),
            offer_kind: Some(offer.kind),
            save_payment_method: false,
            is_recurring: false,
        }
    }

    pub fn with_payment_method_saving(mut self, save: bool) -> Self {
        self.save_payment_method = save;
        self
    }

    pub fn recurring(mut self) -> Self {
        self.is_recurring = true;
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Materializes the ledger row once the store has assigned an id.
    pub fn into_purchase(self, id: PurchaseId, created_at: Timestamp) -> Purchase {
        Purchase {
            id,
            customer_id: self.customer_id,
            amount: self.amount,
            currency: self.currency,
            months: self.months,
            status: PurchaseStatus::New,
            invoice_type: self.invoice_type,
            correlation_id: self.correlation_id,
            tariff_name: self.tariff_name,
            device_limit: self.device_limit,
            offer_kind: self.offer_kind,
            save_payment_method: self.save_payment_method,
            is_recurring: self.is_recurring,
            created_at,
            paid_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> Timestamp {
        Timestamp::parse_rfc3339("2024-06-01T12:00:00Z").unwrap()
    }

    fn tariff() -> Tariff {
        Tariff {
            name: "basic".to_string(),
            price: 150,
            stars_price: Some(100),
            devices: 3,
            months: 1,
        }
    }

    fn purchase() -> Purchase {
        NewPurchase::from_tariff(CustomerId::new(1), &tariff(), InvoiceType::Card, Currency::Rub, 150)
            .into_purchase(PurchaseId::new(7), now())
    }

    #[test]
    fn new_purchase_starts_as_new() {
        let p = purchase();
        assert_eq!(p.status, PurchaseStatus::New);
        assert_eq!(p.device_limit, Some(3));
        assert_eq!(p.tariff_name.as_deref(), Some("basic"));
        assert!(p.paid_at.is_none());
    }

    #[test]
    fn mark_paid_sets_paid_at() {
        let mut p = purchase();
        p.mark_pending(Some("pay-1".to_string())).unwrap();
        p.mark_paid(now()).unwrap();
        assert!(p.is_paid());
        assert_eq!(p.paid_at, Some(now()));
        assert_eq!(p.correlation_id.as_deref(), Some("pay-1"));
    }

    #[test]
    fn paid_purchase_cannot_be_paid_again() {
        let mut p = purchase();
        p.mark_paid(now()).unwrap();
        let err = p.mark_paid(now()).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStateTransition);
    }

    #[test]
    fn cancelled_purchase_cannot_be_paid() {
        let mut p = purchase();
        p.mark_pending(None).unwrap();
        p.mark_cancelled().unwrap();
        assert!(p.mark_paid(now()).is_err());
        assert_eq!(p.status, PurchaseStatus::Cancel);
    }

    #[test]
    fn offer_purchase_copies_snapshot_terms() {
        let offer = Offer {
            kind: OfferKind::Winback,
            price: 100,
            devices: 1,
            months: 2,
            expires_at: now(),
        };
        let p = NewPurchase::from_offer(CustomerId::new(1), &offer, InvoiceType::Crypto);
        assert_eq!(p.amount, 100);
        assert_eq!(p.months, 2);
        assert_eq!(p.device_limit, Some(1));
        assert_eq!(p.offer_kind, Some(OfferKind::Winback));
        assert!(p.tariff_name.is_none());
    }

    #[test]
    fn days_multiplies_months() {
        let mut p = purchase();
        p.months = 3;
        assert_eq!(p.days(30), 90);
    }

    #[test]
    fn offer_terms_identify_the_originating_snapshot() {
        let offer = Offer {
            kind: OfferKind::Winback,
            price: 100,
            devices: 1,
            months: 1,
            expires_at: now().add_hours(48),
        };
        let p = NewPurchase::from_offer(CustomerId::new(1), &offer, InvoiceType::Card)
            .into_purchase(PurchaseId::new(3), now());

        assert!(p.was_made_from(&offer));
        assert!(!p.was_made_from(&Offer { price: 90, ..offer }));
        assert!(!p.was_made_from(&Offer {
            kind: OfferKind::TariffPromo,
            ..offer
        }));
        assert!(!purchase().was_made_from(&offer));
    }
}
