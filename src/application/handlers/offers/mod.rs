//! Offer engine handlers.
//!
//! - generic promo codes grant bonus days immediately
//! - tariff promo codes write a time-boxed offer snapshot
//! - winback offers are issued to lapsed trial users and redeemed through
//!   checkout
//!
//! Business rejections come back as [`OfferOutcome::Rejected`] with a
//! typed reason; `Err` is reserved for infrastructure failures.

mod activate_tariff_promo;
mod apply_promo_code;
mod winback;

use crate::domain::offer::OfferRejection;

pub use activate_tariff_promo::{
    ActivateTariffPromoCommand, ActivateTariffPromoHandler,
};
pub use apply_promo_code::{ApplyPromoCodeCommand, ApplyPromoCodeHandler, PromoApplied};
pub use winback::{
    ActivateWinbackCommand, ActivateWinbackHandler, IssueWinbackHandler, WinbackIssue,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfferOutcome<T> {
    Applied(T),
    Rejected(OfferRejection),
}

impl<T> OfferOutcome<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, OfferOutcome::Applied(_))
    }

    pub fn rejection(&self) -> Option<OfferRejection> {
        match self {
            OfferOutcome::Rejected(r) => Some(*r),
            OfferOutcome::Applied(_) => None,
        }
    }

    /// i18n key for the presentation layer; `None` on success.
    pub fn error_key(&self) -> Option<&'static str> {
        self.rejection().map(|r| r.i18n_key())
    }
}
