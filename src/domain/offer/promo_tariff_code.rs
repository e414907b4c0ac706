//! Tariff promo code: unlocks a time-boxed discounted tariff offer.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{CodeId, Timestamp, ValidationError};

use super::{CodeValue, Offer, OfferKind, RedeemableCode};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoTariffCode {
    pub id: CodeId,
    pub code: CodeValue,
    pub price: i64,
    pub devices: u32,
    pub months: u32,
    pub max_activations: i32,
    pub current_activations: i32,
    /// Lifetime of the offer written on activation
    pub valid_hours: i64,
    pub is_active: bool,
    pub valid_until: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl PromoTariffCode {
    /// Freezes the code's current terms into an offer expiring
    /// `valid_hours` after `now`.
    pub fn snapshot_offer(&self, now: Timestamp) -> Offer {
        Offer {
            kind: OfferKind::TariffPromo,
            price: self.price,
            devices: self.devices,
            months: self.months,
            expires_at: now.add_hours(self.valid_hours),
        }
    }
}

/// Administrator input for a new tariff promo code.
#[derive(Debug, Clone)]
pub struct NewPromoTariffCode {
    pub code: CodeValue,
    pub price: i64,
    pub devices: u32,
    pub months: u32,
    pub max_activations: i32,
    pub valid_hours: i64,
    pub valid_until: Option<Timestamp>,
}

impl NewPromoTariffCode {
    #[allow(clippy::too_many_arguments)]
    pub fn try_new(
        code: &str,
        price: i64,
        devices: u32,
        months: u32,
        max_activations: i32,
        valid_hours: i64,
        valid_until: Option<Timestamp>,
    ) -> Result<Self, ValidationError> {
        let code = CodeValue::try_new(code)?;
        if price <= 0 {
            return Err(ValidationError::out_of_range("price", 1, i64::MAX, price));
        }
        if devices == 0 {
            return Err(ValidationError::out_of_range("devices", 1, 100, 0));
        }
        if !(1..=12).contains(&months) {
            return Err(ValidationError::out_of_range("months", 1, 12, months as i64));
        }
        if max_activations < 1 {
            return Err(ValidationError::out_of_range(
                "max_activations",
                1,
                i32::MAX as i64,
                max_activations as i64,
            ));
        }
        if valid_hours < 1 {
            return Err(ValidationError::out_of_range(
                "valid_hours",
                1,
                i64::MAX,
                valid_hours,
            ));
        }
        Ok(Self {
            code,
            price,
            devices,
            months,
            max_activations,
            valid_hours,
            valid_until,
        })
    }
}

impl RedeemableCode for PromoTariffCode {
    fn is_active(&self) -> bool {
        self.is_active
    }

    fn valid_until(&self) -> Option<Timestamp> {
        self.valid_until
    }

    fn current_activations(&self) -> i32 {
        self.current_activations
    }

    fn max_activations(&self) -> i32 {
        self.max_activations
    }
}
