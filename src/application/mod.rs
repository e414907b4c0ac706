//! Application layer - command handlers and their wiring.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Handlers are built on demand from a [`BillingContext`].

pub mod context;
pub mod handlers;
pub mod settings;

#[cfg(test)]
pub(crate) mod testing;

pub use context::BillingContext;
pub use settings::{BillingSettings, ReconcileSettings};
