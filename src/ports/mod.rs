//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the billing core and the outside world. Adapters implement these ports.
//!
//! ## Storage Ports
//!
//! - `CustomerRepository` - customer records and offer snapshots
//! - `PurchaseRepository` - the purchase ledger
//! - `PromoCodeRepository` / `PromoTariffCodeRepository` - codes and activations
//! - `BroadcastStore` - broadcast run status
//!
//! ## Collaborator Ports
//!
//! - `VpnPanel` - account expiry and device limits
//! - `CardPaymentProvider` / `CryptoPaymentProvider` - settlement
//! - `Notifier` / `MessageSender` - outbound messages
//! - `Clock` - injectable "now"

mod broadcast;
mod card_payment_provider;
mod clock;
mod code_repositories;
mod crypto_payment_provider;
mod customer_repository;
mod notifier;
mod payment_error;
mod purchase_repository;
mod vpn_panel;

pub use broadcast::{BroadcastStore, MessageSender};
pub use card_payment_provider::{
    CancellationReason, CardPayment, CardPaymentProvider, CardPaymentStatus, ChargeSavedMethod,
    CreateCardPayment, SavedPaymentMethod,
};
pub use clock::{Clock, SystemClock};
pub use code_repositories::{PromoCodeRepository, PromoTariffCodeRepository};
pub use crypto_payment_provider::{
    CreateCryptoInvoice, CryptoInvoice, CryptoInvoiceStatus, CryptoPaymentProvider,
};
pub use customer_repository::CustomerRepository;
pub use notifier::{Notifier, Recipient};
pub use payment_error::{PaymentError, PaymentErrorCode};
pub use purchase_repository::PurchaseRepository;
pub use vpn_panel::{CreatePanelUser, PanelError, PanelUser, UpdatePanelUser, VpnPanel};
