//! Generic promo code: grants bonus days immediately on activation.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{CodeId, Timestamp, ValidationError};

use super::{CodeValue, RedeemableCode};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoCode {
    pub id: CodeId,
    pub code: CodeValue,
    pub bonus_days: i64,
    pub max_activations: i32,
    pub current_activations: i32,
    pub is_active: bool,
    pub valid_until: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// Administrator input for a new promo code.
#[derive(Debug, Clone)]
pub struct NewPromoCode {
    pub code: CodeValue,
    pub bonus_days: i64,
    pub max_activations: i32,
    pub valid_until: Option<Timestamp>,
}

impl NewPromoCode {
    pub fn try_new(
        code: &str,
        bonus_days: i64,
        max_activations: i32,
        valid_until: Option<Timestamp>,
    ) -> Result<Self, ValidationError> {
        let code = CodeValue::try_new(code)?;
        if !(1..=3650).contains(&bonus_days) {
            return Err(ValidationError::out_of_range("bonus_days", 1, 3650, bonus_days));
        }
        if max_activations < 1 {
            return Err(ValidationError::out_of_range(
                "max_activations",
                1,
                i32::MAX as i64,
                max_activations as i64,
            ));
        }
        Ok(Self {
            code,
            bonus_days,
            max_activations,
            valid_until,
        })
    }
}

impl RedeemableCode for PromoCode {
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
