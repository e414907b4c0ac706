//! In-memory promo code and tariff promo code stores.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{CodeId, CustomerId, DomainError, ErrorCode, Timestamp};
use crate::domain::offer::{
    CodeValue, NewPromoCode, NewPromoTariffCode, PromoCode, PromoTariffCode, RedeemableCode,
};
use crate::ports::{PromoCodeRepository, PromoTariffCodeRepository};

/// Row-level access the shared table needs.
trait CodeRow: RedeemableCode + Clone + Send + Sync {
    fn code(&self) -> &CodeValue;
    fn set_active(&mut self, active: bool);
    fn bump(&mut self);
}

impl CodeRow for PromoCode {
    fn code(&self) -> &CodeValue {
        &self.code
    }
    fn set_active(&mut self, active: bool) {
        self.is_active = active;
    }
    fn bump(&mut self) {
        self.current_activations += 1;
    }
}

impl CodeRow for PromoTariffCode {
    fn code(&self) -> &CodeValue {
        &self.code
    }
    fn set_active(&mut self, active: bool) {
        self.is_active = active;
    }
    fn bump(&mut self) {
        self.current_activations += 1;
    }
}

#[derive(Debug)]
struct CodeTable<C> {
    codes: HashMap<CodeId, C>,
    activations: HashSet<(CodeId, CustomerId)>,
    next_id: i64,
}

impl<C> Default for CodeTable<C> {
    fn default() -> Self {
        Self {
            codes: HashMap::new(),
            activations: HashSet::new(),
            next_id: 0,
        }
    }
}

impl<C: CodeRow> CodeTable<C> {
    fn insert_unique(&mut self, make: impl FnOnce(CodeId) -> C) -> Result<C, DomainError> {
        let id = CodeId::new(self.next_id + 1);
        let row = make(id);
        if self.codes.values().any(|c| c.code() == row.code()) {
            return Err(DomainError::new(
                ErrorCode::Conflict,
                format!("code {} already exists", row.code()),
            ));
        }
        self.next_id += 1;
        self.codes.insert(id, row.clone());
        Ok(row)
    }

    fn find(&self, code: &CodeValue) -> Option<C> {
        self.codes.values().find(|c| c.code() == code).cloned()
    }

    fn set_active(&mut self, id: CodeId, active: bool) -> Result<(), DomainError> {
        self.codes
            .get_mut(&id)
            .map(|c| c.set_active(active))
            .ok_or_else(|| not_found(id))
    }

    fn delete(&mut self, id: CodeId) -> Result<(), DomainError> {
        self.codes.remove(&id).map(|_| ()).ok_or_else(|| not_found(id))?;
        self.activations.retain(|(code_id, _)| *code_id != id);
        Ok(())
    }

    fn increment(&mut self, id: CodeId) -> Result<bool, DomainError> {
        let row = self.codes.get_mut(&id).ok_or_else(|| not_found(id))?;
        if row.is_exhausted() {
            return Ok(false);
        }
        row.bump();
        Ok(true)
    }
}

fn not_found(id: CodeId) -> DomainError {
    DomainError::new(ErrorCode::CodeNotFound, format!("code {} not found", id))
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryPromoCodeRepository {
    inner: Arc<RwLock<CodeTable<PromoCode>>>,
}

impl InMemoryPromoCodeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a code verbatim (test setup).
    pub async fn insert(&self, code: PromoCode) {
        let mut table = self.inner.write().await;
        table.next_id = table.next_id.max(code.id.as_i64());
        table.codes.insert(code.id, code);
    }

    pub async fn get(&self, id: CodeId) -> Option<PromoCode> {
        self.inner.read().await.codes.get(&id).cloned()
    }
}

#[async_trait]
impl PromoCodeRepository for InMemoryPromoCodeRepository {
    async fn create(&self, code: NewPromoCode) -> Result<PromoCode, DomainError> {
        self.inner.write().await.insert_unique(|id| PromoCode {
            id,
            code: code.code,
            bonus_days: code.bonus_days,
            max_activations: code.max_activations,
            current_activations: 0,
            is_active: true,
            valid_until: code.valid_until,
            created_at: Timestamp::now(),
        })
    }

    async fn find_by_code(&self, code: &CodeValue) -> Result<Option<PromoCode>, DomainError> {
        Ok(self.inner.read().await.find(code))
    }

    async fn set_active(&self, id: CodeId, active: bool) -> Result<(), DomainError> {
        self.inner.write().await.set_active(id, active)
    }

    async fn delete(&self, id: CodeId) -> Result<(), DomainError> {
        self.inner.write().await.delete(id)
    }

    async fn has_activation(
        &self,
        code_id: CodeId,
        customer_id: CustomerId,
    ) -> Result<bool, DomainError> {
        Ok(self
            .inner
            .read()
            .await
            .activations
            .contains(&(code_id, customer_id)))
    }

    async fn record_activation(
        &self,
        code_id: CodeId,
        customer_id: CustomerId,
        _at: Timestamp,
    ) -> Result<bool, DomainError> {
        Ok(self
            .inner
            .write()
            .await
            .activations
            .insert((code_id, customer_id)))
    }

    async fn increment_activations(&self, code_id: CodeId) -> Result<bool, DomainError> {
        self.inner.write().await.increment(code_id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryPromoTariffCodeRepository {
    inner: Arc<RwLock<CodeTable<PromoTariffCode>>>,
}

impl InMemoryPromoTariffCodeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a code verbatim (test setup).
    pub async fn insert(&self, code: PromoTariffCode) {
        let mut table = self.inner.write().await;
        table.next_id = table.next_id.max(code.id.as_i64());
        table.codes.insert(code.id, code);
    }

    pub async fn get(&self, id: CodeId) -> Option<PromoTariffCode> {
        self.inner.read().await.codes.get(&id).cloned()
    }

    /// Edits a stored code in place (simulates an administrator edit).
    pub async fn edit<F: FnOnce(&mut PromoTariffCode)>(&self, id: CodeId, f: F) {
        if let Some(code) = self.inner.write().await.codes.get_mut(&id) {
            f(code);
        }
    }
}

#[async_trait]
impl PromoTariffCodeRepository for InMemoryPromoTariffCodeRepository {
    async fn create(&self, code: NewPromoTariffCode) -> Result<PromoTariffCode, DomainError> {
        self.inner.write().await.insert_unique(|id| PromoTariffCode {
            id,
            code: code.code,
            price: code.price,
            devices: code.devices,
            months: code.months,
            max_activations: code.max_activations,
            current_activations: 0,
            valid_hours: code.valid_hours,
            is_active: true,
            valid_until: code.valid_until,
            created_at: Timestamp::now(),
        })
    }

    async fn find_by_code(
        &self,
        code: &CodeValue,
    ) -> Result<Option<PromoTariffCode>, DomainError> {
        Ok(self.inner.read().await.find(code))
    }

    async fn set_active(&self, id: CodeId, active: bool) -> Result<(), DomainError> {
        self.inner.write().await.set_active(id, active)
    }

    async fn delete(&self, id: CodeId) -> Result<(), DomainError> {
        self.inner.write().await.delete(id)
    }

    async fn has_activation(
        &self,
        code_id: CodeId,
        customer_id: CustomerId,
    ) -> Result<bool, DomainError> {
        Ok(self
            .inner
            .read()
            .await
            .activations
            .contains(&(code_id, customer_id)))
    }

    async fn record_activation(
        &self,
        code_id: CodeId,
        customer_id: CustomerId,
        _at: Timestamp,
    ) -> Result<bool, DomainError> {
        Ok(self
            .inner
            .write()
            .await
            .activations
            .insert((code_id, customer_id)))
    }

    async fn increment_activations(&self, code_id: CodeId) -> Result<bool, DomainError> {
        self.inner.write().await.increment(code_id)
    }
}
