//! Purchase ledger domain.

mod purchase;
mod status;

pub use purchase::{NewPurchase, Purchase};
pub use status::{InvoiceType, PurchaseStatus};
