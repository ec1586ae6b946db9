//! Transactional key-value store boundary for tessera.
//!
//! The layering library never talks to a storage engine directly. It drives
//! the [`Database`] and [`Transaction`] traits defined here, and recognizes
//! retryable failures through [`StoreError`].
//!
//! [`DeterministicStore`] is a complete in-memory engine behind the same
//! boundary: snapshot isolation, read-your-writes, optimistic conflict
//! detection, and fault injection for tests.

pub mod error;
pub mod inmemory;
pub mod traits;

pub use error::StoreError;
pub use error::codes;
pub use inmemory::DeterministicStore;
pub use inmemory::DeterministicTransaction;
pub use inmemory::StoreStats;
pub use traits::Database;
pub use traits::KeyValue;
pub use traits::RangeOptions;
pub use traits::RangeResult;
pub use traits::Transaction;
