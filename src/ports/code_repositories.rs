//! Promo code and tariff promo code store ports.
//!
//! Each code kind has its own activation table with a unique
//! `(code_id, customer_id)` pair. Counter increments are conditional on
//! staying within `max_activations`.

use async_trait::async_trait;

use crate::domain::foundation::{CodeId, CustomerId, DomainError, Timestamp};
use crate::domain::offer::{
    CodeValue, NewPromoCode, NewPromoTariffCode, PromoCode, PromoTariffCode,
};

#[async_trait]
pub trait PromoCodeRepository: Send + Sync {
    async fn create(&self, code: NewPromoCode) -> Result<PromoCode, DomainError>;

    async fn find_by_code(&self, code: &CodeValue) -> Result<Option<PromoCode>, DomainError>;

    async fn set_active(&self, id: CodeId, active: bool) -> Result<(), DomainError>;

    async fn delete(&self, id: CodeId) -> Result<(), DomainError>;

    async fn has_activation(
        &self,
        code_id: CodeId,
        customer_id: CustomerId,
    ) -> Result<bool, DomainError>;

    /// Inserts the activation row; false if the pair already existed.
    async fn record_activation(
        &self,
        code_id: CodeId,
        customer_id: CustomerId,
        at: Timestamp,
    ) -> Result<bool, DomainError>;

    /// Adds one activation; false if the code was already at its limit.
    async fn increment_activations(&self, code_id: CodeId) -> Result<bool, DomainError>;
}

#[async_trait]
pub trait PromoTariffCodeRepository: Send + Sync {
    async fn create(&self, code: NewPromoTariffCode) -> Result<PromoTariffCode, DomainError>;

    async fn find_by_code(&self, code: &CodeValue)
        -> Result<Option<PromoTariffCode>, DomainError>;

    async fn set_active(&self, id: CodeId, active: bool) -> Result<(), DomainError>;

    async fn delete(&self, id: CodeId) -> Result<(), DomainError>;

    async fn has_activation(
        &self,
        code_id: CodeId,
        customer_id: CustomerId,
    ) -> Result<bool, DomainError>;

    /// Inserts the activation row; false if the pair already existed.
    async fn record_activation(
        &self,
        code_id: CodeId,
        customer_id: CustomerId,
        at: Timestamp,
    ) -> Result<bool, DomainError>;

    /// Adds one activation; false if the code was already at its limit.
    async fn increment_activations(&self, code_id: CodeId) -> Result<bool, DomainError>;
}
