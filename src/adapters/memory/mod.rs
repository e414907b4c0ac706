//! In-memory adapters.
//!
//! Every port has an implementation here; the unit and integration
//! test suites run against them.

mod code_repositories;
mod customer_repository;
mod payment_providers;
mod purchase_repository;
mod support;
mod vpn_panel;

pub use code_repositories::{InMemoryPromoCodeRepository, InMemoryPromoTariffCodeRepository};
pub use customer_repository::InMemoryCustomerRepository;
pub use payment_providers::{CardCall, ScriptedCardProvider, ScriptedCryptoProvider};
pub use purchase_repository::InMemoryPurchaseRepository;
pub use support::{
    FixedClock, InMemoryBroadcastStore, RecordingMessageSender, RecordingNotifier,
};
pub use vpn_panel::{InMemoryVpnPanel, PanelCall};
