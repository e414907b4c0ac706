//! Time-boxed offer snapshot frozen onto a customer record.
//!
//! Tariff-promo and winback offers share this shape. Everything a
//! purchase needs (price, devices, months) is copied at issuance, so
//! later edits to the originating code cannot change an outstanding offer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{DomainError, Timestamp, ValidationError};

use super::OfferRejection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferKind {
    TariffPromo,
    Winback,
}

impl OfferKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferKind::TariffPromo => "tariff_promo",
            OfferKind::Winback => "winback",
        }
    }
}

impl fmt::Display for OfferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OfferKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tariff_promo" => Ok(OfferKind::TariffPromo),
            "winback" => Ok(OfferKind::Winback),
            other => Err(ValidationError::invalid_format(
                "offer_kind",
                format!("unknown offer kind '{}'", other),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub kind: OfferKind,
    pub price: i64,
    pub devices: u32,
    pub months: u32,
    pub expires_at: Timestamp,
}

impl Offer {
    /// Strict: an offer expiring exactly at `now` is no longer valid.
    pub fn is_valid_at(&self, now: Timestamp) -> bool {
        self.expires_at.is_after(&now)
    }

    /// Reassembles a snapshot stored as nullable columns.
    ///
    /// All null means no offer. A mix of null and set columns is an
    /// invariant violation.
    pub fn from_columns(
        kind: OfferKind,
        price: Option<i64>,
        devices: Option<i32>,
        months: Option<i32>,
        expires_at: Option<Timestamp>,
    ) -> Result<Option<Self>, DomainError> {
        match (price, devices, months, expires_at) {
            (None, None, None, None) => Ok(None),
            (Some(price), Some(devices), Some(months), Some(expires_at))
                if devices > 0 && months > 0 =>
            {
                Ok(Some(Self {
                    kind,
                    price,
                    devices: devices as u32,
                    months: months as u32,
                    expires_at,
                }))
            }
            _ => Err(DomainError::invariant(format!(
                "{} offer snapshot is partially set",
                kind
            ))),
        }
    }
}

/// Validity test for an optional snapshot: it must exist and expire after `now`.
pub fn require_valid_offer(
    snapshot: Option<&Offer>,
    now: Timestamp,
) -> Result<Offer, OfferRejection> {
    match snapshot {
        None => Err(OfferRejection::NotFound),
        Some(offer) if offer.is_valid_at(now) => Ok(*offer),
        Some(_) => Err(OfferRejection::Expired),
    }
}
