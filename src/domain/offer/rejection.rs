//! Typed reasons an offer cannot be redeemed.

use serde::Serialize;
use std::fmt;

/// Why a code or offer was rejected.
///
/// Returned to the presentation layer as a value, never as an error.
/// Variants are listed in the order the checks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferRejection {
    InvalidFormat,
    NotFound,
    Inactive,
    Expired,
    LimitReached,
    AlreadyUsed,
}

impl OfferRejection {
    /// Translation key the presentation layer renders.
    pub fn i18n_key(&self) -> &'static str {
        match self {
            OfferRejection::InvalidFormat => "offer.invalid_format",
            OfferRejection::NotFound => "offer.not_found",
            OfferRejection::Inactive => "offer.inactive",
            OfferRejection::Expired => "offer.expired",
            OfferRejection::LimitReached => "offer.limit_reached",
            OfferRejection::AlreadyUsed => "offer.already_used",
        }
    }
}

impl fmt::Display for OfferRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.i18n_key())
    }
}
