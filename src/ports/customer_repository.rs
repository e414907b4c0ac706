//! Customer store port.
//!
//! Updates are targeted at one concern each (expiry, recurring fields, one
//! offer snapshot) so concurrent writers never overwrite each other's
//! columns with a stale aggregate.

use async_trait::async_trait;

use crate::domain::customer::{Customer, PromoOffer, RecurringBilling, WinbackOffer};
use crate::domain::foundation::{CustomerId, DomainError, ExternalId, Timestamp};
use crate::domain::offer::OfferKind;

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    /// Returns the existing customer for `external_id` or creates one.
    async fn find_or_create(
        &self,
        external_id: ExternalId,
        language: &str,
    ) -> Result<Customer, DomainError>;

    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, DomainError>;

    async fn find_by_external_id(
        &self,
        external_id: ExternalId,
    ) -> Result<Option<Customer>, DomainError>;

    /// Mirrors the panel's expiry locally.
    async fn update_expire_at(&self, id: CustomerId, expire_at: Timestamp)
        -> Result<(), DomainError>;

    async fn update_recurring(
        &self,
        id: CustomerId,
        recurring: &RecurringBilling,
    ) -> Result<(), DomainError>;

    /// Writes all tariff-promo snapshot columns together, replacing any previous offer.
    async fn set_promo_offer(&self, id: CustomerId, offer: &PromoOffer)
        -> Result<(), DomainError>;

    /// Writes all winback snapshot columns together.
    async fn set_winback_offer(
        &self,
        id: CustomerId,
        offer: &WinbackOffer,
    ) -> Result<(), DomainError>;

    /// Nulls every column of one snapshot kind together.
    async fn clear_offer(&self, id: CustomerId, kind: OfferKind) -> Result<(), DomainError>;
}
