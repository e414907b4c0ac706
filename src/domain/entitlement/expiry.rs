//! Expiry arithmetic for VPN accounts.

use crate::domain::foundation::Timestamp;

/// Expiry for an account that does not exist yet.
pub fn initial_expiry(now: Timestamp, days: i64) -> Timestamp {
    now.add_days(days)
}

/// Expiry after applying `days` to an existing account.
///
/// Positive days extend from the current expiry when it is still in the
/// future, otherwise from `now`, so lapsed time is never paid for twice.
/// Zero or negative days shorten from the current expiry but never below
/// one day from `now`.
pub fn extended_expiry(current: Timestamp, now: Timestamp, days: i64) -> Timestamp {
    if days > 0 {
        let base = if current.is_after(&now) { current } else { now };
        base.add_days(days)
    } else {
        let floor = now.add_days(1);
        let shortened = current.add_days(days);
        if shortened.is_after(&floor) {
            shortened
        } else {
            floor
        }
    }
}
