//! Card processor port.
//!
//! Payments go through a redirect confirmation the first time; a saved
//! payment method can later be charged without the customer present.

use async_trait::async_trait;

use crate::domain::foundation::{Currency, ExternalId, PurchaseId};

use super::PaymentError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardPaymentStatus {
    Pending,
    WaitingForCapture,
    Succeeded,
    Canceled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancellationReason {
    /// The customer withdrew permission to charge the saved method.
    PermissionRevoked,
    Other(String),
}

impl CancellationReason {
    pub fn parse(reason: &str) -> Self {
        match reason {
            "permission_revoked" => CancellationReason::PermissionRevoked,
            other => CancellationReason::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedPaymentMethod {
    pub id: String,
    pub saved: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardPayment {
    pub id: String,
    pub status: CardPaymentStatus,
    pub paid: bool,
    pub cancellation_reason: Option<CancellationReason>,
    pub payment_method: Option<SavedPaymentMethod>,
    pub confirmation_url: Option<String>,
}

impl CardPayment {
    pub fn is_succeeded(&self) -> bool {
        self.status == CardPaymentStatus::Succeeded && self.paid
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == CardPaymentStatus::Canceled
    }

    /// Method id to store for recurring charges, if the provider saved one.
    pub fn saved_method_id(&self) -> Option<&str> {
        self.payment_method
            .as_ref()
            .filter(|m| m.saved)
            .map(|m| m.id.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCardPayment {
    pub purchase_id: PurchaseId,
    pub external_id: ExternalId,
    pub amount: i64,
    pub currency: Currency,
    pub months: u32,
    pub save_payment_method: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeSavedMethod {
    pub purchase_id: PurchaseId,
    pub external_id: ExternalId,
    pub amount: i64,
    pub currency: Currency,
    pub months: u32,
    pub payment_method_id: String,
}

#[async_trait]
pub trait CardPaymentProvider: Send + Sync {
    async fn get_payment(&self, payment_id: &str) -> Result<CardPayment, PaymentError>;

    /// Creates a payment awaiting redirect confirmation.
    async fn create_payment(&self, request: CreateCardPayment)
        -> Result<CardPayment, PaymentError>;

    /// Charges a saved method with no confirmation step.
    async fn charge_saved_method(
        &self,
        request: ChargeSavedMethod,
    ) -> Result<CardPayment, PaymentError>;
}
