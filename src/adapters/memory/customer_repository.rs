//! In-memory customer store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::customer::{Customer, PromoOffer, RecurringBilling, WinbackOffer};
use crate::domain::foundation::{
    CustomerId, DomainError, ErrorCode, ExternalId, Timestamp,
};
use crate::domain::offer::OfferKind;
use crate::ports::CustomerRepository;

#[derive(Debug, Clone, Default)]
pub struct InMemoryCustomerRepository {
    inner: Arc<RwLock<State>>,
}

#[derive(Debug, Default)]
struct State {
    customers: HashMap<CustomerId, Customer>,
    next_id: i64,
}

impl InMemoryCustomerRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a customer verbatim (test setup).
    pub async fn insert(&self, customer: Customer) {
        let mut state = self.inner.write().await;
        state.next_id = state.next_id.max(customer.id.as_i64());
        state.customers.insert(customer.id, customer);
    }

    pub async fn get(&self, id: CustomerId) -> Option<Customer> {
        self.inner.read().await.customers.get(&id).cloned()
    }

    async fn modify<F>(&self, id: CustomerId, f: F) -> Result<(), DomainError>
    where
        F: FnOnce(&mut Customer) + Send,
    {
        let mut state = self.inner.write().await;
        let customer = state.customers.get_mut(&id).ok_or_else(|| {
            DomainError::new(ErrorCode::CustomerNotFound, format!("customer {} not found", id))
        })?;
        f(customer);
        Ok(())
    }
}

#[async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    async fn find_or_create(
        &self,
        external_id: ExternalId,
        language: &str,
    ) -> Result<Customer, DomainError> {
        let mut state = self.inner.write().await;
        if let Some(existing) = state
            .customers
            .values()
            .find(|c| c.external_id == external_id)
        {
            return Ok(existing.clone());
        }
        state.next_id += 1;
        let id = CustomerId::new(state.next_id);
        let customer = Customer::new(id, external_id, language, Timestamp::now());
        state.customers.insert(id, customer.clone());
        Ok(customer)
    }

    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, DomainError> {
        Ok(self.inner.read().await.customers.get(&id).cloned())
    }

    async fn find_by_external_id(
        &self,
        external_id: ExternalId,
    ) -> Result<Option<Customer>, DomainError> {
        Ok(self
            .inner
            .read()
            .await
            .customers
            .values()
            .find(|c| c.external_id == external_id)
            .cloned())
    }

    async fn update_expire_at(
        &self,
        id: CustomerId,
        expire_at: Timestamp,
    ) -> Result<(), DomainError> {
        self.modify(id, |c| c.expire_at = Some(expire_at)).await
    }

    async fn update_recurring(
        &self,
        id: CustomerId,
        recurring: &RecurringBilling,
    ) -> Result<(), DomainError> {
        let recurring = recurring.clone();
        self.modify(id, move |c| c.recurring = recurring).await
    }

    async fn set_promo_offer(
        &self,
        id: CustomerId,
        offer: &PromoOffer,
    ) -> Result<(), DomainError> {
        let offer = *offer;
        self.modify(id, move |c| c.promo_offer = Some(offer)).await
    }

    async fn set_winback_offer(
        &self,
        id: CustomerId,
        offer: &WinbackOffer,
    ) -> Result<(), DomainError> {
        let offer = *offer;
        self.modify(id, move |c| c.winback_offer = Some(offer)).await
    }

    async fn clear_offer(&self, id: CustomerId, kind: OfferKind) -> Result<(), DomainError> {
        self.modify(id, move |c| c.clear_offer(kind)).await
    }
}
