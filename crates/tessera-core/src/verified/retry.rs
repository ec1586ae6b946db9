//! Pure backoff computation for the transaction retry driver.
//!
//! The driver keeps one piece of state between attempts: the delay it used
//! last. Everything else is derived from the attempt number and the policy.

use tessera_constants::retry::MAX_BACKOFF_EXPONENT;

/// Result of a backoff computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffResult {
    /// Sleep duration for this retry (delay plus jitter).
    pub sleep_ms: u64,
    /// Delay floor carried into the next retry.
    pub delay_ms: u64,
}

/// Exponential policy delay before retrying after failed attempt `attempt`.
///
/// Attempt numbering starts at 1: the first retry waits `initial_ms`, each
/// further retry doubles it, and the result is capped at `max_ms`.
///
/// # Example
///
/// ```
/// use tessera_core::verified::compute_policy_delay_ms;
///
/// assert_eq!(compute_policy_delay_ms(1, 10, 1000), 10);
/// assert_eq!(compute_policy_delay_ms(3, 10, 1000), 40);
/// assert_eq!(compute_policy_delay_ms(30, 10, 1000), 1000);
/// ```
#[inline]
pub fn compute_policy_delay_ms(attempt: u32, initial_ms: u64, max_ms: u64) -> u64 {
    let exponent = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
    let scaled = initial_ms.saturating_mul(1u64 << exponent);
    scaled.min(max_ms)
}

/// Compute the backoff before the next attempt.
///
/// The delay is the largest of the policy delay, the store's hint, and the
/// previous delay, so a retry never waits less than the one before it.
/// Jitter is additive and bounded to half the delay plus one.
///
/// # Arguments
///
/// * `attempt` - Number of the attempt that just failed (1-based)
/// * `previous_delay_ms` - Delay computed for the previous retry, 0 if none
/// * `initial_ms` / `max_ms` - Policy curve
/// * `hint_ms` - Minimum wait requested by the store, if any
/// * `jitter_seed` - Random value for jitter calculation
///
/// # Tiger Style
///
/// - Uses saturating arithmetic throughout
/// - Policy component bounded by `max_ms`
#[inline]
pub fn compute_backoff_with_jitter(
    attempt: u32,
    previous_delay_ms: u64,
    initial_ms: u64,
    max_ms: u64,
    hint_ms: Option<u64>,
    jitter_seed: u64,
) -> BackoffResult {
    let policy = compute_policy_delay_ms(attempt, initial_ms, max_ms);
    let delay_ms = policy.max(hint_ms.unwrap_or(0)).max(previous_delay_ms);

    let max_jitter = delay_ms.saturating_div(2).saturating_add(1);
    let jitter = jitter_seed % max_jitter;

    BackoffResult {
        sleep_ms: delay_ms.saturating_add(jitter),
        delay_ms,
    }
}

/// Whether `attempts_made` has used up the configured budget.
///
/// `None` means no ceiling.
#[inline]
pub fn is_attempt_budget_exhausted(attempts_made: u32, max_attempts: Option<u32>) -> bool {
    match max_attempts {
        Some(max) => attempts_made >= max,
        None => false,
    }
}
