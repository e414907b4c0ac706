//! Domain layer - pure billing rules with no I/O.

pub mod broadcast;
pub mod customer;
pub mod entitlement;
pub mod foundation;
pub mod notification;
pub mod offer;
pub mod purchase;
pub mod tariff;
pub mod webhook;
