//! Entitlement rules: how long an account stays active and how many
//! devices it may use.

mod device_limit;
mod expiry;

pub use device_limit::resolve_device_limit;
pub use expiry::{extended_expiry, initial_expiry};
