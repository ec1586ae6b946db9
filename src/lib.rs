//! Tessera: typed, ordered key layering over a transactional key-value store.
//!
//! The workspace is split the way the layers stack:
//!
//! - [`tessera_layer`]: order-preserving tuple codec, [`Subspace`] and [`TypedSubspace`]
//! - [`tessera_kv`]: the [`Database`]/[`Transaction`] boundary and the in-memory
//!   [`DeterministicStore`]
//! - [`tessera_core`]: [`TransactionRunner`], [`HighContentionAllocator`] and
//!   the [`DirectoryLayer`]
//! - [`config`]: layered settings for the runner and the directory layout
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use tessera::DeterministicStore;
//! use tessera::TesseraConfig;
//! use tessera::Tuple;
//!
//! let config = TesseraConfig::load_with_layers()?;
//! let dir = config.directory(Arc::new(DeterministicStore::new()));
//! let users = dir.create_or_open(&["app", "users"], None).await?;
//! let key = users.pack(&Tuple::new().push(42i64).push("email"));
//! ```

pub mod config;

pub use config::ConfigError;
pub use config::DirectoryConfig;
pub use config::RetryConfig;
pub use config::TesseraConfig;
pub use tessera_constants as constants;
pub use tessera_core::AllocationError;
pub use tessera_core::AttemptState;
pub use tessera_core::CancellationToken;
pub use tessera_core::Directory;
pub use tessera_core::DirectoryError;
pub use tessera_core::DirectoryLayer;
pub use tessera_core::DirectorySubspace;
pub use tessera_core::HighContentionAllocator;
pub use tessera_core::RetryPolicy;
pub use tessera_core::RetryableError;
pub use tessera_core::TransactionMode;
pub use tessera_core::TransactionRunner;
pub use tessera_core::range_stream;
pub use tessera_kv::Database;
pub use tessera_kv::DeterministicStore;
pub use tessera_kv::KeyValue;
pub use tessera_kv::RangeOptions;
pub use tessera_kv::StoreError;
pub use tessera_kv::Transaction;
pub use tessera_layer::Element;
pub use tessera_layer::Subspace;
pub use tessera_layer::SubspaceError;
pub use tessera_layer::Tuple;
pub use tessera_layer::TupleError;
pub use tessera_layer::TypedSubspace;
pub use tessera_layer::Versionstamp;
