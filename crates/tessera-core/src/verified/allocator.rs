//! Pure window arithmetic for the high-contention allocator.
//!
//! The allocator's persistent state is a window `[start, start + size)`.
//! Candidates are drawn from the current window; once it is dense the
//! window advances past itself and doubles, up to the maximum size.

use tessera_constants::allocator::HCA_MAX_WINDOW_SIZE;

/// Window that follows `[start, start + size)`.
///
/// Returns `None` if the new window would not fit in `i64`.
///
/// # Example
///
/// ```
/// use tessera_core::verified::advance_window;
///
/// assert_eq!(advance_window(0, 64), Some((64, 128)));
/// assert_eq!(advance_window(i64::MAX - 10, 64), None);
/// ```
#[inline]
pub fn advance_window(start: i64, size: u64) -> Option<(i64, u64)> {
    let next_start = start.checked_add_unsigned(size)?;
    let next_size = size.saturating_mul(2).min(HCA_MAX_WINDOW_SIZE);
    // The whole next window must be representable, not only its start.
    next_start.checked_add_unsigned(next_size)?;
    Some((next_start, next_size))
}

/// Candidate at `offset` within the window, reduced modulo the window size.
///
/// Returns `None` for an empty window or on overflow.
#[inline]
pub fn candidate_in_window(start: i64, size: u64, offset: u64) -> Option<i64> {
    if size == 0 {
        return None;
    }
    start.checked_add_unsigned(offset % size)
}

/// Whether a stored window size could have been produced by this allocator.
#[inline]
pub fn is_valid_window_size(size: u64) -> bool {
    size.is_power_of_two() && size <= HCA_MAX_WINDOW_SIZE
}
