//! Order-preserving key encoding for tessera.
//!
//! This crate holds the pure, I/O-free half of the layering library:
//!
//! - [`Tuple`] / [`Element`]: the tuple codec. Packed tuples compare
//!   byte-wise exactly as their decoded values compare element-wise.
//! - [`Subspace`]: a binary prefix plus a [`SubspaceContext`], producing and
//!   parsing keys scoped to that prefix.
//! - [`TypedSubspace`]: a subspace bound to a fixed composite key type, with
//!   partial encode/decode over leading components.
//!
//! # Example
//!
//! ```
//! use tessera_layer::{Subspace, Tuple};
//!
//! let users = Subspace::new(Tuple::new().push("users"));
//! let key = users.pack(&Tuple::new().push(42i64).push("profile"));
//!
//! assert!(users.contains(&key));
//! assert_eq!(users.unpack(&key).unwrap(), Tuple::new().push(42i64).push("profile"));
//! ```

pub mod subspace;
pub mod tuple;
pub mod typed;

#[cfg(test)]
mod proptest;

pub use subspace::Subspace;
pub use subspace::SubspaceContext;
pub use subspace::SubspaceError;
pub use tuple::Element;
pub use tuple::Tuple;
pub use tuple::TupleError;
pub use tuple::Versionstamp;
pub use tuple::strinc;
pub use typed::PrefixOf;
pub use typed::TupleKey;
pub use typed::TupleValue;
pub use typed::TypedSubspace;
pub use uuid::Uuid;
