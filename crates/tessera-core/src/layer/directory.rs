//! FoundationDB-style Directory Layer for hierarchical namespace management.
//!
//! The Directory Layer provides a hierarchical namespace on top of the flat
//! key-value store, mapping human-readable paths to short binary prefixes.
//!
//! # Benefits
//!
//! - **Short prefixes**: allocated integers pack to 2-3 bytes regardless of depth
//! - **Guaranteed isolation**: each directory owns a unique prefix
//! - **Cheap moves**: renaming a subtree rewrites metadata only, never content
//! - **Discoverability**: list the children of any directory
//!
//! # Layout
//!
//! ```text
//! node_subspace (0xFE)
//!   ("version",)            -> (major, minor, patch)
//!   ("hca", ...)            -> allocator counters and claims
//!   (0xFE-bytes, *path)     -> (prefix bytes, layer or null)
//! content_subspace
//!   prefix = content ++ pack((allocated id,))
//! ```
//!
//! Every operation on [`DirectoryLayer`] runs inside a caller transaction;
//! [`Directory`] wraps each one in its own retried transaction.
//!
//! # Example
//!
//! ```ignore
//! use tessera_core::Directory;
//! use tessera_layer::Tuple;
//!
//! let dir = Directory::new(runner);
//!
//! let repos = dir.create_or_open(&["apps", "forge", "repos"], None).await?;
//! let key = repos.pack(&Tuple::new().push(repo_id).push("metadata"));
//!
//! let apps = dir.list(&["apps"]).await?;
//! // => ["forge", ...]
//! ```
//!
//! # References
//!
//! - [FoundationDB Directory Layer](https://apple.github.io/foundationdb/developer-guide.html)
//! - [Directory Layer design](https://github.com/apple/foundationdb/blob/main/design/directory-layer.md)

mod facade;
mod layer;
mod node;
mod subspace;
mod validation;

use snafu::Snafu;
use tessera_kv::StoreError;
use tessera_layer::SubspaceError;

use super::allocator::AllocationError;
use crate::retry::RetryableError;

pub use facade::Directory;
pub use layer::DirectoryLayer;
pub use subspace::DirectorySubspace;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during directory operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DirectoryError {
    /// Directory not found at the specified path.
    #[snafu(display("directory not found: /{}", path.join("/")))]
    NotFound {
        /// The path that was not found.
        path: Vec<String>,
    },

    /// Directory already exists at the specified path.
    #[snafu(display("directory already exists: /{}", path.join("/")))]
    AlreadyExists {
        /// The path that already exists.
        path: Vec<String>,
    },

    /// The stored layer tag differs from the one the caller asked for.
    #[snafu(display(
        "layer mismatch for /{}: expected '{}', found '{}'",
        path.join("/"),
        expected,
        actual.as_deref().unwrap_or("<none>")
    ))]
    LayerMismatch {
        /// The path with mismatched layer.
        path: Vec<String>,
        /// Layer requested by the caller.
        expected: String,
        /// Layer stored on the node.
        actual: Option<String>,
    },

    /// Move rejected: missing endpoint, root involved, or a cycle.
    #[snafu(display("invalid move: {reason}"))]
    InvalidMove {
        /// Why the move was rejected.
        reason: String,
    },

    /// Path segment is invalid (empty or too long), or the root was targeted.
    #[snafu(display("invalid path segment '{segment}': {reason}"))]
    InvalidPath {
        /// The invalid segment.
        segment: String,
        /// Why it's invalid.
        reason: String,
    },

    /// Path exceeds maximum depth.
    #[snafu(display("path depth {depth} exceeds maximum of {max}"))]
    PathTooDeep {
        /// Actual depth.
        depth: u32,
        /// Maximum allowed depth.
        max: u32,
    },

    /// A freshly allocated prefix already holds data.
    #[snafu(display("allocated prefix {prefix:02x?} already contains data"))]
    PrefixInUse {
        /// The allocated prefix.
        prefix: Vec<u8>,
    },

    /// Subtree too large to move or remove in one transaction.
    #[snafu(display("subtree at /{} has more than {max} directories", path.join("/")))]
    SubtreeTooLarge {
        /// Root of the subtree.
        path: Vec<String>,
        /// Node bound per transaction.
        max: u32,
    },

    /// The stored directory format is newer than this implementation.
    #[snafu(display("directory layer version {stored} is incompatible with supported version {supported}"))]
    IncompatibleVersion {
        /// Version found in the store.
        stored: String,
        /// Version written by this implementation.
        supported: String,
    },

    /// Directory metadata is corrupted.
    #[snafu(display("corrupted directory metadata for /{}: {}", path.join("/"), reason))]
    CorruptedMetadata {
        /// The path with corrupted metadata.
        path: Vec<String>,
        /// Description of the corruption.
        reason: String,
    },

    /// Prefix allocation failed.
    #[snafu(display("prefix allocation failed: {source}"))]
    Allocation {
        /// The underlying allocation error.
        source: AllocationError,
    },

    /// Key decoding failed.
    #[snafu(display("subspace error: {source}"))]
    Subspace {
        /// The underlying subspace error.
        source: SubspaceError,
    },

    /// Store error during directory operation.
    #[snafu(display("store error: {source}"))]
    Store {
        /// The underlying store error.
        source: StoreError,
    },
}

impl From<StoreError> for DirectoryError {
    fn from(source: StoreError) -> Self {
        DirectoryError::Store { source }
    }
}

impl RetryableError for DirectoryError {
    fn store_error(&self) -> Option<&StoreError> {
        match self {
            DirectoryError::Store { source } => Some(source),
            DirectoryError::Allocation { source } => source.store_error(),
            _ => None,
        }
    }
}
