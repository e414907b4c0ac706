//! Strongly-typed identifier value objects.
//!
//! Identifiers are database-assigned `BIGSERIAL` keys, except
//! [`ExternalId`], which is the customer's chat-platform identity.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! int_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.trim().parse()?))
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

int_id!(
    /// Local customer record key.
    CustomerId
);

int_id!(
    /// Chat-platform user id; the stable identity shared with the VPN panel.
    ExternalId
);

int_id!(
    /// Purchase ledger key.
    PurchaseId
);

int_id!(
    /// Key of a generic promo code or a tariff promo code.
    CodeId
);

int_id!(
    /// Key of a broadcast run.
    BroadcastId
);
