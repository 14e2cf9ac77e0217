//! Back-off for rate-limited (HTTP 429) marketplace responses.
//!
//! Only 429 is retried. Every other status is handed back to the caller, and
//! network failures are not retried here.

use std::time::Duration;

const MAX_DELAY_MS: u64 = 60_000;

/// Parses a `Retry-After` header given in whole seconds. HTTP-date values
/// are ignored.
#[must_use]
pub(crate) fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// Delay before retry number `attempt` (1-based).
///
/// A server-supplied `Retry-After` wins and is capped at 60 s. Otherwise
/// `backoff_base_ms × 2^(attempt-1)` with ±25 % jitter, also capped.
#[must_use]
pub(crate) fn retry_delay(
    attempt: u32,
    retry_after: Option<Duration>,
    backoff_base_ms: u64,
) -> Duration {
    if let Some(wait) = retry_after {
        return wait.min(Duration::from_millis(MAX_DELAY_MS));
    }

    let exp = attempt.saturating_sub(1).min(10);
    let capped = backoff_base_ms.saturating_mul(1u64 << exp).min(MAX_DELAY_MS);
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
    Duration::from_millis(delay_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_after_seconds_are_parsed() {
        assert_eq!(parse_retry_after("3"), Some(Duration::from_secs(3)));
        assert_eq!(parse_retry_after(" 10 "), Some(Duration::from_secs(10)));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }

    #[test]
    fn retry_after_is_capped() {
        let d = retry_delay(1, Some(Duration::from_secs(600)), 1_000);
        assert_eq!(d, Duration::from_secs(60));
    }

    #[test]
    fn backoff_doubles_within_jitter_bounds() {
        for attempt in 1..=3u32 {
            let nominal = 1_000u64 << (attempt - 1);
            let d = retry_delay(attempt, None, 1_000).as_millis();
            let lo = u128::from(nominal * 3 / 4);
            let hi = u128::from(nominal * 5 / 4);
            assert!(d >= lo && d <= hi, "attempt {attempt}: {d}ms outside {lo}..={hi}");
        }
    }

    #[test]
    fn zero_base_means_no_wait() {
        assert_eq!(retry_delay(2, None, 0), Duration::ZERO);
    }
}
