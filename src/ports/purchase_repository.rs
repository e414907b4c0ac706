//! Purchase ledger port.
//!
//! Status updates are conditional: `mark_as_paid` and `mark_as_cancelled`
//! only move rows that are not yet terminal and report whether they did.
//! That return value is what lets two racing callers agree on who
//! performed the transition.

use async_trait::async_trait;

use crate::domain::foundation::{CustomerId, DomainError, PurchaseId, Timestamp};
use crate::domain::purchase::{InvoiceType, NewPurchase, Purchase, PurchaseStatus};

#[async_trait]
pub trait PurchaseRepository: Send + Sync {
    /// Writes a purchase with status `new` and returns it with its id.
    async fn create(&self, purchase: NewPurchase) -> Result<Purchase, DomainError>;

    async fn find_by_id(&self, id: PurchaseId) -> Result<Option<Purchase>, DomainError>;

    async fn find_by_correlation_id(
        &self,
        invoice_type: InvoiceType,
        correlation_id: &str,
    ) -> Result<Option<Purchase>, DomainError>;

    async fn find_by_invoice_type_and_status(
        &self,
        invoice_type: InvoiceType,
        status: PurchaseStatus,
    ) -> Result<Vec<Purchase>, DomainError>;

    /// `new -> pending`, storing the provider correlation id when given.
    async fn mark_as_pending(
        &self,
        id: PurchaseId,
        correlation_id: Option<&str>,
    ) -> Result<bool, DomainError>;

    /// Sets status `paid` and `paid_at`; false if the purchase was already terminal.
    async fn mark_as_paid(&self, id: PurchaseId, paid_at: Timestamp)
        -> Result<bool, DomainError>;

    /// Sets status `cancel`; false if the purchase was already terminal.
    async fn mark_as_cancelled(&self, id: PurchaseId) -> Result<bool, DomainError>;

    async fn has_paid_purchases(&self, customer_id: CustomerId) -> Result<bool, DomainError>;

    /// Whether a purchase was paid within `window_minutes` before `now`.
    async fn has_recent_paid_purchase(
        &self,
        customer_id: CustomerId,
        window_minutes: i64,
        now: Timestamp,
    ) -> Result<bool, DomainError>;

    /// The customer's recurring charge that is still `new` or `pending`, if any.
    async fn find_open_recurring_charge(
        &self,
        customer_id: CustomerId,
    ) -> Result<Option<Purchase>, DomainError>;
}
