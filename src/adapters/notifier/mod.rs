//! Notification delivery adapters.
//!
//! The presentation service renders and delivers messages; this crate
//! posts typed notifications and raw broadcast texts to it. Without a
//! configured endpoint, deliveries are only logged.

mod http_notifier;
mod log_notifier;

pub use http_notifier::{HttpNotifier, HttpNotifierConfig};
pub use log_notifier::LogNotifier;
