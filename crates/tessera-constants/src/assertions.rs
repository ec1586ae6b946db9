//! Compile-time constant assertions.

use super::allocator::*;
use super::directory::*;
use super::retry::*;
use super::store::*;
use super::tuple::*;

// ============================================================================
// Retry Backoff
// ============================================================================

const _: () = assert!(DEFAULT_INITIAL_BACKOFF_MS > 0);
const _: () = assert!(DEFAULT_INITIAL_BACKOFF_MS <= DEFAULT_MAX_BACKOFF_MS);
const _: () = assert!(MAX_BACKOFF_EXPONENT < 64);

// ============================================================================
// Allocator Windows
// ============================================================================
// Windows double on each advance, so both ends must be powers of two.

const _: () = assert!(HCA_INITIAL_WINDOW_SIZE.is_power_of_two());
const _: () = assert!(HCA_MAX_WINDOW_SIZE.is_power_of_two());
const _: () = assert!(HCA_INITIAL_WINDOW_SIZE <= HCA_MAX_WINDOW_SIZE);
const _: () = assert!(HCA_MAX_PROBES_PER_WINDOW > 0);
const _: () = assert!(HCA_MAX_WINDOW_ADVANCES > 0);

// ============================================================================
// Directory Bounds
// ============================================================================

const _: () = assert!(MAX_DIRECTORY_DEPTH > 0);
const _: () = assert!(MAX_PATH_SEGMENT_LENGTH_BYTES > 0);
const _: () = assert!(MAX_LIST_RESULTS <= MAX_SUBTREE_NODES);

// ============================================================================
// Store
// ============================================================================

const _: () = assert!(RANGE_PAGE_SIZE > 0);
const _: () = assert!(MAX_CONFLICT_HISTORY > 0);

// ============================================================================
// Tuple Codec
// ============================================================================

const _: () = assert!(MAX_TUPLE_NESTING_DEPTH > 0);
