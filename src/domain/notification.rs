//! Customer-facing notifications.
//!
//! The presentation layer renders these; this core only chooses which
//! one to send and with which arguments.

use serde::Serialize;

use crate::domain::foundation::Timestamp;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    PaymentSucceeded {
        months: u32,
        expire_at: Timestamp,
    },
    PromoApplied {
        bonus_days: i64,
        expire_at: Timestamp,
    },
    TrialActivated {
        expire_at: Timestamp,
    },
    RecurringChargeUpcoming {
        amount: i64,
        expire_at: Option<Timestamp>,
    },
    RecurringChargeSucceeded {
        amount: i64,
        months: u32,
        expire_at: Timestamp,
    },
    RecurringChargeFailed,
    RecurringPermissionRevoked,
    SubscriptionExpiringSoon {
        expire_at: Option<Timestamp>,
    },
    SubscriptionExpired,
    SubscriptionCancelled {
        expire_at: Option<Timestamp>,
    },
    WinbackOffer {
        price: i64,
        devices: u32,
        months: u32,
        expires_at: Timestamp,
    },
}

impl Notification {
    pub fn i18n_key(&self) -> &'static str {
        match self {
            Notification::PaymentSucceeded { .. } => "payment.succeeded",
            Notification::PromoApplied { .. } => "promo.applied",
            Notification::TrialActivated { .. } => "trial.activated",
            Notification::RecurringChargeUpcoming { .. } => "recurring.upcoming",
            Notification::RecurringChargeSucceeded { .. } => "recurring.succeeded",
            Notification::RecurringChargeFailed => "recurring.failed",
            Notification::RecurringPermissionRevoked => "recurring.permission_revoked",
            Notification::SubscriptionExpiringSoon { .. } => "subscription.expiring_soon",
            Notification::SubscriptionExpired => "subscription.expired",
            Notification::SubscriptionCancelled { .. } => "subscription.cancelled",
            Notification::WinbackOffer { .. } => "winback.offer",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_value(Notification::RecurringChargeFailed).unwrap();
        assert_eq!(json["type"], "recurring_charge_failed");
    }

    #[test]
    fn carries_arguments() {
        let n = Notification::WinbackOffer {
            price: 100,
            devices: 1,
            months: 1,
            expires_at: Timestamp::parse_rfc3339("2024-06-03T00:00:00Z").unwrap(),
        };
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["price"], 100);
        assert_eq!(n.i18n_key(), "winback.offer");
    }
}
