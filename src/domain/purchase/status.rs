//! Purchase status and invoice type enums.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Lifecycle of a purchase: `new -> pending -> {paid | cancel}`.
///
/// `new -> paid` and `new -> cancel` are allowed for invoice types that
/// never wait on a remote confirmation. Nothing leaves a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    New,
    Pending,
    Paid,
    Cancel,
}

impl PurchaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseStatus::New => "new",
            PurchaseStatus::Pending => "pending",
            PurchaseStatus::Paid => "paid",
            PurchaseStatus::Cancel => "cancel",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PurchaseStatus::Paid | PurchaseStatus::Cancel)
    }

    pub fn can_transition_to(&self, target: PurchaseStatus) -> bool {
        use PurchaseStatus::*;
        matches!(
            (self, target),
            (New, Pending) | (New, Paid) | (New, Cancel) | (Pending, Paid) | (Pending, Cancel)
        )
    }
}

impl fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PurchaseStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(PurchaseStatus::New),
            "pending" => Ok(PurchaseStatus::Pending),
            "paid" => Ok(PurchaseStatus::Paid),
            "cancel" => Ok(PurchaseStatus::Cancel),
            other => Err(ValidationError::invalid_format(
                "purchase_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

/// Which settlement channel a purchase goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceType {
    Card,
    Crypto,
    ChatNative,
    SubscriptionPlatform,
}

impl InvoiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceType::Card => "card",
            InvoiceType::Crypto => "crypto",
            InvoiceType::ChatNative => "chat_native",
            InvoiceType::SubscriptionPlatform => "subscription_platform",
        }
    }
}

impl fmt::Display for InvoiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card" => Ok(InvoiceType::Card),
            "crypto" => Ok(InvoiceType::Crypto),
            "chat_native" => Ok(InvoiceType::ChatNative),
            "subscription_platform" => Ok(InvoiceType::SubscriptionPlatform),
            other => Err(ValidationError::invalid_format(
                "invoice_type",
                format!("unknown invoice type '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PurchaseStatus::*;

    #[test]
    fn forward_transitions_are_allowed() {
        assert!(New.can_transition_to(Pending));
        assert!(Pending.can_transition_to(Paid));
        assert!(Pending.can_transition_to(Cancel));
        assert!(New.can_transition_to(Paid));
    }

    #[test]
    fn terminal_states_never_move() {
        for target in [New, Pending, Paid, Cancel] {
            assert!(!Paid.can_transition_to(target));
            assert!(!Cancel.can_transition_to(target));
        }
    }

    #[test]
    fn pending_cannot_go_back_to_new() {
        assert!(!Pending.can_transition_to(New));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [New, Pending, Paid, Cancel] {
            assert_eq!(status.as_str().parse::<PurchaseStatus>().unwrap(), status);
        }
    }

    #[test]
    fn invoice_type_round_trips_through_str() {
        for t in [
            InvoiceType::Card,
            InvoiceType::Crypto,
            InvoiceType::ChatNative,
            InvoiceType::SubscriptionPlatform,
        ] {
            assert_eq!(t.as_str().parse::<InvoiceType>().unwrap(), t);
        }
    }
}
