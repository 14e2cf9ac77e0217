/// Rounding unit for a raw price: 100 below 10,000, 500 below 50,000,
/// otherwise 1,000.
#[must_use]
pub fn tier_step(price: i64) -> i64 {
    if price < 10_000 {
        100
    } else if price < 50_000 {
        500
    } else {
        1_000
    }
}

/// Rounds `price` UP to the next multiple of its tier step. Multiples are
/// returned unchanged. `None` if the rounded value does not fit in `i64`.
#[must_use]
pub fn round_to_tier(price: i64) -> Option<i64> {
    let step = tier_step(price);
    let rem = price.rem_euclid(step);
    if rem == 0 {
        Some(price)
    } else {
        price.checked_sub(rem)?.checked_add(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_up_within_each_tier() {
        assert_eq!(round_to_tier(1), Some(100));
        assert_eq!(round_to_tier(9_901), Some(10_000));
        assert_eq!(round_to_tier(10_001), Some(10_500));
        assert_eq!(round_to_tier(49_999), Some(50_000));
        assert_eq!(round_to_tier(50_001), Some(51_000));
    }

    #[test]
    fn exact_multiples_are_unchanged() {
        for p in [100, 9_900, 10_000, 12_500, 50_000, 123_000] {
            assert_eq!(round_to_tier(p), Some(p));
        }
    }

    #[test]
    fn tier_boundaries_use_the_upper_step() {
        assert_eq!(tier_step(9_999), 100);
        assert_eq!(tier_step(10_000), 500);
        assert_eq!(tier_step(49_999), 500);
        assert_eq!(tier_step(50_000), 1_000);
    }

    #[test]
    fn rounding_past_i64_max_is_none() {
        assert_eq!(round_to_tier(i64::MAX), None);
        assert_eq!(round_to_tier(i64::MAX - 500), None);
        let top = i64::MAX - i64::MAX.rem_euclid(1_000);
        assert_eq!(round_to_tier(top), Some(top));
    }

    #[test]
    fn result_is_never_below_input() {
        for p in (0..120_000).step_by(137) {
            let r = round_to_tier(p).unwrap();
            assert!(r >= p);
            assert_eq!(r % tier_step(p), 0);
        }
    }
}
