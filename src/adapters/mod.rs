//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the billing core to external systems:
//! - `postgres` - customer store, purchase ledger, codes, broadcasts
//! - `panel` - VPN panel REST client
//! - `card` / `crypto` - payment processor clients
//! - `notifier` - presentation service client (or log-only fallback)
//! - `http` - axum endpoints for webhooks and broadcasts
//! - `scheduler` - reconciliation loops
//! - `memory` - in-memory implementations of every port

pub mod card;
pub mod crypto;
pub mod http;
pub mod memory;
pub mod notifier;
pub mod panel;
pub mod postgres;
pub mod scheduler;

pub use card::{CardProcessorAdapter, CardProcessorConfig};
pub use crypto::{CryptoProcessorAdapter, CryptoProcessorConfig};
pub use self::http::{app_router, AppState};
pub use notifier::{HttpNotifier, HttpNotifierConfig, LogNotifier};
pub use panel::{PanelApiAdapter, PanelApiConfig};
pub use scheduler::{ReconcilePass, ReconcileScheduler};
