//! Device-limit resolution.

/// Chooses the device limit to send to the panel after a purchase.
///
/// `current` is the account's limit as the panel reports it; `None` means
/// the limit is disabled on that account and must stay untouched.
/// Otherwise the tariff's limit replaces it outright, upwards or
/// downwards: the customer gets exactly what they paid for.
pub fn resolve_device_limit(current: Option<u32>, tariff_limit: u32) -> Option<u32> {
    current.map(|_| tariff_limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn disabled_limit_stays_disabled() {
        assert_eq!(resolve_device_limit(None, 3), None);
    }

    #[test]
    fn higher_current_limit_is_lowered_to_tariff() {
        assert_eq!(resolve_device_limit(Some(5), 1), Some(1));
    }

    #[test]
    fn lower_current_limit_is_raised_to_tariff() {
        assert_eq!(resolve_device_limit(Some(1), 3), Some(3));
    }

    proptest! {
        #[test]
        fn absent_always_maps_to_absent(tariff in 0u32..1000) {
            prop_assert_eq!(resolve_device_limit(None, tariff), None);
        }

        #[test]
        fn present_always_maps_to_tariff(current in 0u32..1000, tariff in 0u32..1000) {
            prop_assert_eq!(resolve_device_limit(Some(current), tariff), Some(tariff));
        }
    }
}
