//! DirectorySubspace - a directory with an allocated prefix.

use tessera_layer::Subspace;
use tessera_layer::SubspaceError;
use tessera_layer::Tuple;
use tessera_layer::TupleKey;
use tessera_layer::TypedSubspace;

/// A directory with an allocated prefix, extending Subspace with metadata.
///
/// `DirectorySubspace` provides all the functionality of a `Subspace` for key
/// encoding, plus the path and layer tag it was resolved from. Its subspace
/// carries the context of the transaction that resolved it; see
/// [`ensure_valid`](Self::ensure_valid).
///
/// # Example
///
/// ```ignore
/// let repos = dir.create_or_open(&["apps", "forge", "repos"], None).await?;
///
/// // Use subspace operations
/// let key = repos.pack(&Tuple::new().push(repo_id).push("name"));
/// let (start, end) = repos.range();
///
/// // Access metadata
/// println!("Path: {:?}", repos.path());
/// println!("Layer: {:?}", repos.layer());
/// ```
#[derive(Debug, Clone)]
pub struct DirectorySubspace {
    /// The underlying subspace with the allocated prefix.
    subspace: Subspace,
    /// Full path to this directory.
    path: Vec<String>,
    /// Layer tag, if any.
    layer: Option<String>,
}

impl DirectorySubspace {
    pub(super) fn new(subspace: Subspace, path: Vec<String>, layer: Option<String>) -> Self {
        Self { subspace, path, layer }
    }

    /// Get the underlying subspace.
    pub fn subspace(&self) -> &Subspace {
        &self.subspace
    }

    /// Get the directory path.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Get the layer tag.
    pub fn layer(&self) -> Option<&str> {
        self.layer.as_deref()
    }

    /// Get the raw prefix bytes.
    pub fn prefix(&self) -> &[u8] {
        self.subspace.prefix()
    }

    /// Fails once the resolving transaction has been dropped without committing.
    pub fn ensure_valid(&self) -> Result<(), SubspaceError> {
        self.subspace.ensure_valid()
    }

    /// Pack a key tuple within this directory's subspace.
    pub fn pack(&self, key: &Tuple) -> Vec<u8> {
        self.subspace.pack(key)
    }

    /// Unpack a key from this directory's subspace.
    pub fn unpack(&self, key: &[u8]) -> Result<Tuple, SubspaceError> {
        self.subspace.unpack(key)
    }

    /// Range of every key in this directory, the bare prefix included.
    pub fn range(&self) -> (Vec<u8>, Vec<u8>) {
        self.subspace.range()
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.subspace.contains(key)
    }

    /// Nested subspace under this directory.
    pub fn subspace_at(&self, suffix: &Tuple) -> Subspace {
        self.subspace.subspace(suffix)
    }

    /// Typed view of this directory's keys.
    pub fn typed<K: TupleKey>(&self) -> TypedSubspace<K> {
        self.subspace.typed::<K>()
    }
}
