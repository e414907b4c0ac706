//! Recurring billing settings stored on a customer.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, Timestamp};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringBilling {
    pub enabled: bool,
    /// Card processor's saved payment method id; survives disabling
    pub payment_method_id: Option<String>,
    pub tariff_name: Option<String>,
    pub months: Option<u32>,
    pub amount: Option<i64>,
    /// Last "you will be charged" notice
    pub notified_at: Option<Timestamp>,
}

/// What an autonomous charge bills for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurringPlan {
    pub payment_method_id: String,
    pub tariff_name: String,
    pub months: u32,
    pub amount: i64,
}

impl RecurringBilling {
    /// Enabled and holding a payment method to charge.
    pub fn is_chargeable(&self) -> bool {
        self.enabled && self.payment_method_id.is_some()
    }

    /// The stored terms, or an invariant violation if any is missing.
    pub fn plan(&self) -> Result<RecurringPlan, DomainError> {
        match (
            &self.payment_method_id,
            &self.tariff_name,
            self.months,
            self.amount,
        ) {
            (Some(method), Some(tariff), Some(months), Some(amount))
                if months > 0 && amount > 0 =>
            {
                Ok(RecurringPlan {
                    payment_method_id: method.clone(),
                    tariff_name: tariff.clone(),
                    months,
                    amount,
                })
            }
            _ => Err(DomainError::invariant(
                "recurring billing is missing method, tariff, months or amount",
            )),
        }
    }

    /// Stores a freshly saved payment method and what it pays for.
    pub fn store_method(
        &mut self,
        payment_method_id: String,
        tariff_name: String,
        months: u32,
        amount: i64,
        enable: bool,
    ) {
        self.payment_method_id = Some(payment_method_id);
        self.tariff_name = Some(tariff_name);
        self.months = Some(months);
        self.amount = Some(amount);
        if enable {
            self.enabled = true;
        }
    }

    /// Turns charging off; the method id is kept so it can be re-enabled.
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// Returns false when there is no stored method to charge.
    pub fn enable(&mut self) -> bool {
        if self.payment_method_id.is_none() {
            return false;
        }
        self.enabled = true;
        true
    }

    /// At most one "will be charged" notice per `min_gap_hours`.
    pub fn should_notify(&self, now: Timestamp, min_gap_hours: i64) -> bool {
        match self.notified_at {
            None => true,
            Some(at) => !at.add_hours(min_gap_hours).is_after(&now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored() -> RecurringBilling {
        let mut r = RecurringBilling::default();
        r.store_method("pm_1".to_string(), "basic".to_string(), 1, 150, true);
        r
    }

    #[test]
    fn store_method_enables_when_asked() {
        let r = stored();
        assert!(r.is_chargeable());
        assert_eq!(r.plan().unwrap().amount, 150);
    }

    #[test]
    fn store_method_without_opt_in_stays_disabled() {
        let mut r = RecurringBilling::default();
        r.store_method("pm_1".to_string(), "basic".to_string(), 1, 150, false);
        assert!(!r.is_chargeable());
        assert!(r.payment_method_id.is_some());
    }

    #[test]
    fn disable_keeps_payment_method() {
        let mut r = stored();
        r.disable();
        assert!(!r.is_chargeable());
        assert_eq!(r.payment_method_id.as_deref(), Some("pm_1"));
        assert!(r.enable());
        assert!(r.is_chargeable());
    }

    #[test]
    fn enable_without_method_fails() {
        let mut r = RecurringBilling::default();
        assert!(!r.enable());
        assert!(!r.enabled);
    }

    #[test]
    fn missing_amount_is_invariant_violation() {
        let mut r = stored();
        r.amount = None;
        assert!(r.plan().is_err());
    }

    #[test]
    fn notice_is_throttled() {
        let now = Timestamp::parse_rfc3339("2024-06-01T12:00:00Z").unwrap();
        let mut r = stored();
        assert!(r.should_notify(now, 20));
        r.notified_at = Some(now.add_hours(-19));
        assert!(!r.should_notify(now, 20));
        r.notified_at = Some(now.add_hours(-20));
        assert!(r.should_notify(now, 20));
    }
}
