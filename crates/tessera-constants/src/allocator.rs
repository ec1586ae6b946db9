//! High-contention allocator constants.
//!
//! Windows start small so early prefixes stay one or two bytes long, and
//! double on every contention-driven advance until they reach the maximum.

/// Window size used by a freshly initialized allocator.
pub const HCA_INITIAL_WINDOW_SIZE: u64 = 64;

/// Largest window the allocator will grow to.
pub const HCA_MAX_WINDOW_SIZE: u64 = 8192;

/// Occupied probes tolerated in one window before it is advanced.
///
/// With a half-full window the chance of this many consecutive misses is
/// below 1%, so advancing only happens once the window is genuinely dense.
pub const HCA_MAX_PROBES_PER_WINDOW: u32 = 8;

/// Window advances allowed within a single `allocate` call.
///
/// Tiger Style: bounds the inner loop; each advance doubles the window, so
/// hitting this limit means the allocator state is corrupt.
pub const HCA_MAX_WINDOW_ADVANCES: u32 = 64;

/// Tuple field name of the `(start, window)` counters key.
pub const HCA_COUNTERS_KEY: &str = "counters";

/// Tuple field name of the claimed-candidates range.
pub const HCA_RECENT_PREFIX: &str = "recent";
