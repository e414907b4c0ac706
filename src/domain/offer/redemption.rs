//! Redemption checks shared by every code kind.
//!
//! Order, first failure wins:
//!
//! 1. code format
//! 2. existence
//! 3. active flag
//! 4. the code's own hard expiry, if set
//! 5. activation limit (`current >= max`)
//! 6. prior activation by the same customer
//!
//! Steps 1 and 2 need the raw input and a lookup; [`parse_code`] covers the
//! first and the caller the second. [`check_redeemable`] runs steps 3-6
//! against any [`RedeemableCode`].

use crate::domain::foundation::Timestamp;

use super::{CodeValue, OfferRejection};

/// Capability every activatable code exposes to the shared checks.
pub trait RedeemableCode {
    fn is_active(&self) -> bool;
    fn valid_until(&self) -> Option<Timestamp>;
    fn current_activations(&self) -> i32;
    fn max_activations(&self) -> i32;

    fn is_exhausted(&self) -> bool {
        self.current_activations() >= self.max_activations()
    }
}

/// Step 1: canonicalize the typed code.
pub fn parse_code(raw: &str) -> Result<CodeValue, OfferRejection> {
    CodeValue::try_new(raw).map_err(|_| OfferRejection::InvalidFormat)
}

/// Steps 3-6 for a code that exists.
///
/// `already_used` is whether the customer has an activation row for
/// this code; it is only consulted after every code-level check passed.
pub fn check_redeemable<C: RedeemableCode + ?Sized>(
    code: &C,
    now: Timestamp,
    already_used: bool,
) -> Result<(), OfferRejection> {
    if !code.is_active() {
        return Err(OfferRejection::Inactive);
    }
    if let Some(valid_until) = code.valid_until() {
        if !valid_until.is_after(&now) {
            return Err(OfferRejection::Expired);
        }
    }
    if code.is_exhausted() {
        return Err(OfferRejection::LimitReached);
    }
    if already_used {
        return Err(OfferRejection::AlreadyUsed);
    }
    Ok(())
}
