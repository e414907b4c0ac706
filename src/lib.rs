//! VPN Billing - Billing & Entitlement Reconciliation Core
//!
//! Turns payment-provider events (polled or pushed) into exactly-once
//! entitlement changes on a VPN panel, runs recurring re-billing for
//! opted-in customers and enforces time- and usage-limited offers.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
