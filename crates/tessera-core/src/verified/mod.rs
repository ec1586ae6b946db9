//! Verified pure functions for the transactional layers.
//!
//! This module contains the production implementations of the arithmetic the
//! async layers depend on. All functions are:
//!
//! - **Deterministic**: No I/O, no clocks, randomness passed in as a seed
//! - **Bounded**: Saturating or checked arithmetic, no panics on any input
//!
//! # Architecture
//!
//! This module implements the "Functional Core, Imperative Shell" (FCIS) pattern:
//!
//! - **verified/** (this module): pure decisions, unit tested exhaustively
//! - **retry.rs / layer/**: the async shell that performs store I/O and sleeps
//!
//! # Module Organization
//!
//! - [`retry`]: Backoff curve, store hints, jitter, attempt budgets
//! - [`allocator`]: Window advance, candidate selection, window validation
//! - [`directory`]: Path ancestry and subtree relocation

pub mod allocator;
pub mod directory;
pub mod retry;

pub use allocator::advance_window;
pub use allocator::candidate_in_window;
pub use allocator::is_valid_window_size;
pub use directory::is_same_or_descendant;
pub use directory::parent_path;
pub use directory::relocate_path;
pub use retry::BackoffResult;
pub use retry::compute_backoff_with_jitter;
pub use retry::compute_policy_delay_ms;
pub use retry::is_attempt_budget_exhausted;
