//! In-memory purchase ledger.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{CustomerId, DomainError, PurchaseId, Timestamp};
use crate::domain::purchase::{InvoiceType, NewPurchase, Purchase, PurchaseStatus};
use crate::ports::PurchaseRepository;

#[derive(Debug, Clone, Default)]
pub struct InMemoryPurchaseRepository {
    inner: Arc<RwLock<State>>,
}

#[derive(Debug, Default)]
struct State {
    purchases: BTreeMap<PurchaseId, Purchase>,
    next_id: i64,
}

impl InMemoryPurchaseRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a purchase verbatim (test setup).
    pub async fn insert(&self, purchase: Purchase) {
        let mut state = self.inner.write().await;
        state.next_id = state.next_id.max(purchase.id.as_i64());
        state.purchases.insert(purchase.id, purchase);
    }

    pub async fn all(&self) -> Vec<Purchase> {
        self.inner.read().await.purchases.values().cloned().collect()
    }
}

#[async_trait]
impl PurchaseRepository for InMemoryPurchaseRepository {
    async fn create(&self, purchase: NewPurchase) -> Result<Purchase, DomainError> {
        let mut state = self.inner.write().await;
        state.next_id += 1;
        let id = PurchaseId::new(state.next_id);
        let purchase = purchase.into_purchase(id, Timestamp::now());
        state.purchases.insert(id, purchase.clone());
        Ok(purchase)
    }

    async fn find_by_id(&self, id: PurchaseId) -> Result<Option<Purchase>, DomainError> {
        Ok(self.inner.read().await.purchases.get(&id).cloned())
    }

    async fn find_by_correlation_id(
        &self,
        invoice_type: InvoiceType,
        correlation_id: &str,
    ) -> Result<Option<Purchase>, DomainError> {
        Ok(self
            .inner
            .read()
            .await
            .purchases
            .values()
            .find(|p| {
                p.invoice_type == invoice_type
                    && p.correlation_id.as_deref() == Some(correlation_id)
            })
            .cloned())
    }

    async fn find_by_invoice_type_and_status(
        &self,
        invoice_type: InvoiceType,
        status: PurchaseStatus,
    ) -> Result<Vec<Purchase>, DomainError> {
        Ok(self
            .inner
            .read()
            .await
            .purchases
            .values()
            .filter(|p| p.invoice_type == invoice_type && p.status == status)
            .cloned()
            .collect())
    }

    async fn mark_as_pending(
        &self,
        id: PurchaseId,
        correlation_id: Option<&str>,
    ) -> Result<bool, DomainError> {
        let mut state = self.inner.write().await;
        match state.purchases.get_mut(&id) {
            Some(p) => Ok(p.mark_pending(correlation_id.map(str::to_string)).is_ok()),
            None => Ok(false),
        }
    }

    async fn mark_as_paid(&self, id: PurchaseId, paid_at: Timestamp) -> Result<bool, DomainError> {
        let mut state = self.inner.write().await;
        match state.purchases.get_mut(&id) {
            Some(p) => Ok(p.mark_paid(paid_at).is_ok()),
            None => Ok(false),
        }
    }

    async fn mark_as_cancelled(&self, id: PurchaseId) -> Result<bool, DomainError> {
        let mut state = self.inner.write().await;
        match state.purchases.get_mut(&id) {
            Some(p) => Ok(p.mark_cancelled().is_ok()),
            None => Ok(false),
        }
    }

    async fn has_paid_purchases(&self, customer_id: CustomerId) -> Result<bool, DomainError> {
        Ok(self
            .inner
            .read()
            .await
            .purchases
            .values()
            .any(|p| p.customer_id == customer_id && p.is_paid()))
    }

    async fn has_recent_paid_purchase(
        &self,
        customer_id: CustomerId,
        window_minutes: i64,
        now: Timestamp,
    ) -> Result<bool, DomainError> {
        let since = now.minus_minutes(window_minutes);
        Ok(self
            .inner
            .read()
            .await
            .purchases
            .values()
            .any(|p| {
                p.customer_id == customer_id
                    && p.paid_at.map(|at| !at.is_before(&since)).unwrap_or(false)
            }))
    }

    async fn find_open_recurring_charge(
        &self,
        customer_id: CustomerId,
    ) -> Result<Option<Purchase>, DomainError> {
        Ok(self
            .inner
            .read()
            .await
            .purchases
            .values()
            .rev()
            .find(|p| {
                p.customer_id == customer_id
                    && p.is_recurring
                    && matches!(p.status, PurchaseStatus::New | PurchaseStatus::Pending)
            })
            .cloned())
    }
}
