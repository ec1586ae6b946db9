//! Directory layer constants.

/// Default prefix byte of the node metadata subspace.
///
/// Matches the conventional system prefix used by tuple-layer directories so
/// user content allocated under an empty content prefix never collides with
/// metadata (allocated prefixes start with an integer type code).
pub const DEFAULT_NODE_PREFIX: u8 = 0xFE;

/// Tuple field under the node subspace holding the layer version.
pub const DIR_VERSION_KEY: &str = "version";

/// Tuple field under the node subspace holding the allocator state.
pub const DIR_HCA_KEY: &str = "hca";

/// Directory layer format version written by this implementation.
pub const DIRECTORY_VERSION: (u32, u32, u32) = (1, 0, 0);

/// Maximum path depth (number of segments).
///
/// Tiger Style: bounds ancestor walks and node-key lengths.
pub const MAX_DIRECTORY_DEPTH: u32 = 32;

/// Maximum length of a single path segment in bytes.
pub const MAX_PATH_SEGMENT_LENGTH_BYTES: u32 = 256;

/// Maximum number of children returned by one `list` call.
pub const MAX_LIST_RESULTS: u32 = 10_000;

/// Maximum number of nodes touched by one `move_to` or `remove` call.
///
/// Tiger Style: a subtree larger than this cannot be rewritten in a single
/// transaction anyway.
pub const MAX_SUBTREE_NODES: u32 = 10_000;
