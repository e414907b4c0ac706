//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! This module provides adapters for PostgreSQL-backed persistence:
//! - `PostgresCustomerRepository` - customers, recurring fields and offer snapshots
//! - `PostgresPurchaseRepository` - the purchase ledger
//! - `PostgresPromoCodeRepository` / `PostgresPromoTariffCodeRepository` - codes and activations
//! - `PostgresBroadcastStore` - broadcast run status

mod broadcast_store;
mod code_repositories;
mod customer_repository;
mod purchase_repository;

pub use broadcast_store::PostgresBroadcastStore;
pub use code_repositories::{PostgresPromoCodeRepository, PostgresPromoTariffCodeRepository};
pub use customer_repository::PostgresCustomerRepository;
pub use purchase_repository::PostgresPurchaseRepository;

use crate::domain::foundation::{DomainError, ErrorCode};

fn db_error(action: &str, err: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("Failed to {}: {}", action, err))
}
