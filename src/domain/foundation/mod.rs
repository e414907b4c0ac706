//! Foundation module - Shared domain primitives.
//!
//! Identifiers, the timestamp value object, money and the error types
//! that form the vocabulary of the billing domain.

mod errors;
mod ids;
mod money;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{BroadcastId, CodeId, CustomerId, ExternalId, PurchaseId};
pub use money::Currency;
pub use timestamp::Timestamp;
