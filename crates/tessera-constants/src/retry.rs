//! Backoff curve for the transactional retry driver.
//!
//! The curve is exponential: the delay before attempt `n + 1` is
//! `initial * 2^n`, capped at the maximum, and never lower than the delay
//! used before the previous attempt.

/// Delay before the first retry, in milliseconds.
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 10;

/// Upper bound on a single backoff delay, in milliseconds (1 second).
///
/// Tiger Style: a retry loop with no attempt ceiling still has a bounded
/// per-iteration wait.
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 1_000;

/// Largest exponent applied to the initial backoff.
///
/// `1 << 20` times any sane initial delay already exceeds the maximum, so the
/// shift is clamped here to keep the multiplication overflow-free.
pub const MAX_BACKOFF_EXPONENT: u32 = 20;

/// Ceiling accepted for a configured attempt limit.
pub const MAX_CONFIGURED_ATTEMPTS: u32 = 100_000;
