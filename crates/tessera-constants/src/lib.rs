//! Centralized constants for the tessera layering crates.
//!
//! Every fixed bound used by the codec, the allocator, the directory layer,
//! the retry driver, and the in-memory store lives here so the numbers that
//! form part of the on-disk contract are reviewed in one place.
//!
//! Tiger Style: Constants are fixed and immutable, enforced at compile time.
//! Each constant has explicit bounds to prevent unbounded resource allocation.
//!
//! # Modules
//!
//! - [`retry`]: Transaction retry backoff curve
//! - [`allocator`]: High-contention allocator windows and probe limits
//! - [`directory`]: Directory layer reserved keys, path bounds, versions
//! - [`store`]: Store boundary page sizes and in-memory engine bounds
//! - [`tuple`]: Tuple codec decoding bounds

pub mod allocator;
mod assertions;
pub mod directory;
pub mod retry;
pub mod store;
pub mod tuple;

/// Prelude module for commonly used constants.
pub mod prelude {
    pub use crate::allocator::HCA_INITIAL_WINDOW_SIZE;
    pub use crate::allocator::HCA_MAX_WINDOW_SIZE;
    pub use crate::directory::DEFAULT_NODE_PREFIX;
    pub use crate::directory::MAX_DIRECTORY_DEPTH;
    pub use crate::retry::DEFAULT_INITIAL_BACKOFF_MS;
    pub use crate::retry::DEFAULT_MAX_BACKOFF_MS;
    pub use crate::store::RANGE_PAGE_SIZE;
    pub use crate::tuple::MAX_TUPLE_NESTING_DEPTH;
}
