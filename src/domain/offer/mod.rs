//! Offer engine domain: codes, offer snapshots and the shared
//! redemption checks.

mod code_value;
mod offer;
mod promo_code;
mod promo_tariff_code;
mod redemption;
mod rejection;

pub use code_value::CodeValue;
pub use offer::{require_valid_offer, Offer, OfferKind};
pub use promo_code::{NewPromoCode, PromoCode};
pub use promo_tariff_code::{NewPromoTariffCode, PromoTariffCode};
pub use redemption::{check_redeemable, parse_code, RedeemableCode};
pub use rejection::OfferRejection;
