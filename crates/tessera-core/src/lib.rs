//! Transactional layers for tessera.
//!
//! This crate sits between the ordered key codec in `tessera-layer` and the
//! transactional store boundary in `tessera-kv`:
//!
//! - [`retry`]: [`TransactionRunner`] runs a closure against fresh
//!   transactions until it commits, backing off on retryable store errors
//! - [`layer::allocator`]: [`HighContentionAllocator`] hands out short unique
//!   integers without serializing concurrent callers
//! - [`layer::directory`]: [`DirectoryLayer`] maps hierarchical paths to
//!   short allocated key prefixes
//! - [`verified`]: pure functions behind the backoff curve, allocator windows
//!   and directory path arithmetic
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use tessera_core::Directory;
//! use tessera_core::TransactionRunner;
//! use tessera_kv::DeterministicStore;
//!
//! let runner = TransactionRunner::new(Arc::new(DeterministicStore::new()));
//! let dir = Directory::new(runner);
//! let users = dir.create_or_open(&["app", "users"], None).await?;
//! let key = users.pack(&tessera_layer::Tuple::new().push(42i64));
//! ```

pub mod layer;
pub mod retry;
pub mod verified;

pub use layer::allocator::AllocationError;
pub use layer::allocator::HighContentionAllocator;
pub use layer::directory::Directory;
pub use layer::directory::DirectoryError;
pub use layer::directory::DirectoryLayer;
pub use layer::directory::DirectorySubspace;
pub use retry::AttemptState;
pub use retry::RetryPolicy;
pub use retry::RetryableError;
pub use retry::TransactionMode;
pub use retry::TransactionRunner;
pub use retry::range_stream;
pub use tokio_util::sync::CancellationToken;
