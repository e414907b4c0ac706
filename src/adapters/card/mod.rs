//! Card processor adapter.
//!
//! Implements the `CardPaymentProvider` port: redirect-confirmed
//! payments, saved-method charges and status lookups for reconciliation.
//!
//! # Security
//!
//! - The secret key is held as `secrecy::SecretString`
//! - Every payment creation carries its own `Idempotence-Key`

mod card_adapter;
mod wire_types;

pub use card_adapter::{CardProcessorAdapter, CardProcessorConfig};
