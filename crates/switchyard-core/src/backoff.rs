//! Exponential backoff with jitter (§4.C "Backoff") and the retryable-error
//! substring classifier (§7 "Transient I/O").

use std::time::Duration;

use rand::Rng;

/// Base delay for attempt 1, per spec: 1 second.
pub const BASE_MS: u64 = 1_000;
/// Ceiling on any computed delay, per spec: 60 seconds.
pub const CEILING_MS: u64 = 60_000;
/// Default maximum dispatch attempts before a run is marked `failed`.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Compute the backoff delay for the given attempt number (1-indexed).
///
/// Formula: `base * 2^attempt + uniform(0, base * 2^attempt / 2)`, capped at
/// `CEILING_MS`. Attempt 0 returns zero delay (no backoff before the first
/// try).
#[must_use]
pub fn backoff_delay(attempt: u32) -> Duration {
    backoff_delay_with_rng(attempt, &mut rand::thread_rng())
}

/// Same as [`backoff_delay`] but with an injectable RNG, so tests can assert
/// on the jitter bounds deterministically.
pub fn backoff_delay_with_rng<R: Rng + ?Sized>(attempt: u32, rng: &mut R) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let exponent = attempt.min(32);
    let base = (BASE_MS as f64) * 2f64.powi(i32::try_from(exponent).unwrap_or(i32::MAX));
    let capped_base = base.min(CEILING_MS as f64);
    let jitter_max = capped_base / 2.0;
    let jitter = rng.gen_range(0.0..=jitter_max);

    let total_ms = (capped_base + jitter).min(CEILING_MS as f64);
    Duration::from_millis(total_ms.max(0.0) as u64)
}

/// Substrings that mark an error message as transient/retryable (§7).
const RETRYABLE_SUBSTRINGS: &[&str] = &[
    "econnreset",
    "etimedout",
    "socket hang up",
    "fetch failed",
    "429",
];

/// Substrings that mark an error message as a terminal, non-retryable
/// remote rejection (§7 "Non-retryable remote error").
const NON_RETRYABLE_SUBSTRINGS: &[&str] = &["invalid", "malformed", "missing required"];

/// Decide whether an error message describes a transient, retryable
/// failure. Checks the closed vocabulary from §7 plus any 5xx-shaped
/// three-digit code starting with `5`.
#[must_use]
pub fn is_retryable(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();

    if NON_RETRYABLE_SUBSTRINGS
        .iter()
        .any(|needle| lower.contains(needle))
    {
        return false;
    }

    if RETRYABLE_SUBSTRINGS.iter().any(|needle| lower.contains(needle)) {
        return true;
    }

    contains_5xx_code(&lower)
}

fn contains_5xx_code(lower: &str) -> bool {
    let bytes = lower.as_bytes();
    bytes.windows(3).any(|w| {
        w[0] == b'5' && w[1].is_ascii_digit() && w[2].is_ascii_digit()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn attempt_zero_has_no_delay() {
        assert_eq!(backoff_delay(0), Duration::ZERO);
    }

    #[test]
    fn delay_grows_and_caps_at_ceiling() {
        let mut rng = StdRng::seed_from_u64(42);
        // With jitter at its theoretical max, attempt 1 should never exceed
        // base*2 * 1.5 and should never be below base*2.
        let d1 = backoff_delay_with_rng(1, &mut rng);
        assert!(d1.as_millis() >= 2_000);
        assert!(d1.as_millis() <= 3_000);

        let mut rng = StdRng::seed_from_u64(7);
        let big = backoff_delay_with_rng(10, &mut rng);
        assert!(big.as_millis() as u64 <= CEILING_MS);
    }

    #[test]
    fn retryable_substrings_match() {
        assert!(is_retryable("ECONNRESET"));
        assert!(is_retryable("request failed: socket hang up"));
        assert!(is_retryable("fetch failed"));
        assert!(is_retryable("received 429 Too Many Requests"));
        assert!(is_retryable("upstream returned 503 Service Unavailable"));
    }

    #[test]
    fn non_retryable_takes_precedence() {
        assert!(!is_retryable("400 invalid request body"));
        assert!(!is_retryable("malformed payload"));
        assert!(!is_retryable("missing required field 'text'"));
    }

    #[test]
    fn unmatched_errors_are_not_retryable() {
        assert!(!is_retryable("division by zero"));
    }
}
