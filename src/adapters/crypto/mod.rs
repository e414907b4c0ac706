//! Crypto processor adapter.
//!
//! Implements `CryptoPaymentProvider`: fiat-denominated invoices and a
//! batched status lookup used by reconciliation.

mod crypto_adapter;

pub use crypto_adapter::{CryptoProcessorAdapter, CryptoProcessorConfig};
