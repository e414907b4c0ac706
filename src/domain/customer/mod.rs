//! Customer domain.

mod customer;
mod recurring;

pub use customer::{Customer, PromoOffer, WinbackOffer};
pub use recurring::{RecurringBilling, RecurringPlan};
