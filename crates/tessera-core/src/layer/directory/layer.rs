//! DirectoryLayer - transactional API for hierarchical namespace management.

use snafu::ResultExt;
use tessera_constants::directory::DEFAULT_NODE_PREFIX;
use tessera_constants::directory::DIR_HCA_KEY;
use tessera_constants::directory::DIR_VERSION_KEY;
use tessera_constants::directory::DIRECTORY_VERSION;
use tessera_constants::directory::MAX_LIST_RESULTS;
use tessera_constants::directory::MAX_SUBTREE_NODES;
use tessera_kv::KeyValue;
use tessera_kv::RangeOptions;
use tessera_kv::Transaction;
use tessera_layer::Element;
use tessera_layer::Subspace;
use tessera_layer::Tuple;
use tracing::debug;

use super::AllocationSnafu;
use super::DirectoryError;
use super::SubspaceSnafu;
use super::node::Node;
use super::node::decode_version;
use super::node::encode_version;
use super::node::format_version;
use super::subspace::DirectorySubspace;
use super::validation::display_path;
use super::validation::validate_path;
use super::validation::validate_path_allow_empty;
use crate::layer::allocator::HighContentionAllocator;
use crate::retry::collect_range;
use crate::verified::is_same_or_descendant;
use crate::verified::parent_path;
use crate::verified::relocate_path;

/// Directory Layer for hierarchical namespace management.
///
/// The Directory Layer maps hierarchical paths to short binary prefixes,
/// enabling efficient multi-tenant namespace isolation. It holds no state of
/// its own: every operation reads and writes through the transaction it is
/// given, so the caller decides what commits together.
///
/// # Thread Safety
///
/// `DirectoryLayer` is `Send + Sync` and cheap to clone.
#[derive(Debug, Clone)]
pub struct DirectoryLayer {
    /// Subspace for directory metadata, the version key and the allocator.
    node_subspace: Subspace,
    /// Subspace allocated prefixes are placed under.
    content_subspace: Subspace,
    /// Node metadata keyed by path.
    root_node: Subspace,
    /// High-contention allocator for prefix allocation.
    allocator: HighContentionAllocator,
}

impl Default for DirectoryLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectoryLayer {
    /// Directory layer with metadata under `0xFE` and content at the root of the keyspace.
    pub fn new() -> Self {
        Self::with_subspaces(Subspace::from_bytes(vec![DEFAULT_NODE_PREFIX]), Subspace::all())
    }

    /// Directory layer over raw node and content prefixes.
    pub fn with_prefixes(node_prefix: impl Into<Vec<u8>>, content_prefix: impl Into<Vec<u8>>) -> Self {
        Self::with_subspaces(Subspace::from_bytes(node_prefix), Subspace::from_bytes(content_prefix))
    }

    /// Directory layer over explicit subspaces.
    pub fn with_subspaces(node_subspace: Subspace, content_subspace: Subspace) -> Self {
        let root_node = node_subspace.subspace(&Tuple::new().push(node_subspace.prefix()));
        let allocator = HighContentionAllocator::new(node_subspace.subspace(&Tuple::new().push(DIR_HCA_KEY)));
        Self {
            node_subspace,
            content_subspace,
            root_node,
            allocator,
        }
    }

    pub fn node_subspace(&self) -> &Subspace {
        &self.node_subspace
    }

    pub fn content_subspace(&self) -> &Subspace {
        &self.content_subspace
    }

    pub fn allocator(&self) -> &HighContentionAllocator {
        &self.allocator
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Open `path`, creating it and any missing ancestors.
    ///
    /// With `layer` set, an existing directory must carry the same tag.
    /// Ancestors created on the way carry no tag.
    pub async fn create_or_open<Tx: Transaction, S: AsRef<str>>(
        &self,
        tr: &mut Tx,
        path: &[S],
        layer: Option<&str>,
    ) -> Result<DirectorySubspace, DirectoryError> {
        let path = validate_path(path)?;
        self.check_version(tr, false).await?;

        match self.find(tr, &path).await? {
            Some(node) => self.open_node(tr, path, node, layer),
            None => self.create_node(tr, path, layer).await,
        }
    }

    /// Create `path`, failing with `AlreadyExists` if it is present.
    pub async fn create<Tx: Transaction, S: AsRef<str>>(
        &self,
        tr: &mut Tx,
        path: &[S],
        layer: Option<&str>,
    ) -> Result<DirectorySubspace, DirectoryError> {
        let path = validate_path(path)?;
        self.check_version(tr, false).await?;

        if self.find(tr, &path).await?.is_some() {
            return Err(DirectoryError::AlreadyExists { path });
        }
        self.create_node(tr, path, layer).await
    }

    /// Open `path`, failing with `NotFound` if it is absent.
    pub async fn open<Tx: Transaction, S: AsRef<str>>(
        &self,
        tr: &Tx,
        path: &[S],
        layer: Option<&str>,
    ) -> Result<DirectorySubspace, DirectoryError> {
        let path = validate_path(path)?;
        self.check_version(tr, false).await?;

        match self.find(tr, &path).await? {
            Some(node) => self.open_node(tr, path, node, layer),
            None => Err(DirectoryError::NotFound { path }),
        }
    }

    /// Whether `path` exists. The root always exists.
    pub async fn exists<Tx: Transaction, S: AsRef<str>>(&self, tr: &Tx, path: &[S]) -> Result<bool, DirectoryError> {
        let path = validate_path_allow_empty(path)?;
        self.check_version(tr, false).await?;

        if path.is_empty() {
            return Ok(true);
        }
        Ok(self.find(tr, &path).await?.is_some())
    }

    /// Names of the immediate children of `path`, in key order.
    ///
    /// Each child costs one single-row range read that skips the child's own
    /// descendants. At most `MAX_LIST_RESULTS` names are returned.
    pub async fn list<Tx: Transaction, S: AsRef<str>>(
        &self,
        tr: &Tx,
        path: &[S],
    ) -> Result<Vec<String>, DirectoryError> {
        let path = validate_path_allow_empty(path)?;
        self.check_version(tr, false).await?;

        if !path.is_empty() && self.find(tr, &path).await?.is_none() {
            return Err(DirectoryError::NotFound { path });
        }

        let parent = self.root_node.subspace(&path_tuple(&path));
        let (mut begin, end) = parent.tuple_range();
        let mut children = Vec::new();

        while children.len() < MAX_LIST_RESULTS as usize {
            let page = tr.get_range(&begin, &end, RangeOptions::default().with_limit(1)).await?;
            let Some(entry) = page.entries.into_iter().next() else {
                break;
            };

            let child = parent.unpack_prefix(&entry.key, 1).context(SubspaceSnafu)?;
            let Some(name) = child.get(0).and_then(Element::as_str) else {
                return Err(DirectoryError::CorruptedMetadata {
                    path,
                    reason: format!("child segment is not a string: {child:?}"),
                });
            };

            // Skip past the child and all of its descendants.
            begin = parent.range_of(&child).1;
            children.push(name.to_string());
        }

        Ok(children)
    }

    /// Move the directory at `old_path`, with its subtree, to `new_path`.
    ///
    /// Prefixes and content stay where they are; only node metadata moves.
    pub async fn move_to<Tx: Transaction, A: AsRef<str>, B: AsRef<str>>(
        &self,
        tr: &mut Tx,
        old_path: &[A],
        new_path: &[B],
    ) -> Result<DirectorySubspace, DirectoryError> {
        let old_path = validate_path_allow_empty(old_path)?;
        let new_path = validate_path_allow_empty(new_path)?;

        if old_path.is_empty() {
            return Err(DirectoryError::InvalidMove {
                reason: "the root directory cannot be moved".to_string(),
            });
        }
        if new_path.is_empty() {
            return Err(DirectoryError::InvalidMove {
                reason: "cannot move onto the root directory".to_string(),
            });
        }
        if is_same_or_descendant(&old_path, &new_path) {
            return Err(DirectoryError::InvalidMove {
                reason: format!("{} cannot be moved into itself ({})", display_path(&old_path), display_path(&new_path)),
            });
        }

        self.prepare_write(tr).await?;

        let Some(node) = self.find(tr, &old_path).await? else {
            return Err(DirectoryError::InvalidMove {
                reason: format!("source {} does not exist", display_path(&old_path)),
            });
        };
        if self.find(tr, &new_path).await?.is_some() {
            return Err(DirectoryError::AlreadyExists { path: new_path });
        }
        if let Some(parent) = parent_path(&new_path) {
            if !parent.is_empty() && self.find(tr, parent).await?.is_none() {
                return Err(DirectoryError::InvalidMove {
                    reason: format!("destination parent {} does not exist", display_path(parent)),
                });
            }
        }

        let subtree = self.subtree(tr, &old_path).await?;
        for (path, entry) in &subtree {
            let Some(relocated) = relocate_path(&old_path, &new_path, path) else {
                return Err(DirectoryError::CorruptedMetadata {
                    path: path.clone(),
                    reason: format!("stored under {} but outside it", display_path(&old_path)),
                });
            };
            tr.set(&self.node_key(&relocated), &entry.value);
        }
        let (begin, end) = self.subtree_range(&old_path);
        tr.clear_range(&begin, &end);

        debug!(
            from = %display_path(&old_path),
            to = %display_path(&new_path),
            nodes = subtree.len(),
            "moved directory"
        );
        Ok(self.subspace_for(tr, new_path, node))
    }

    /// Remove `path` and every descendant, clearing their contents.
    ///
    /// Fails with `NotFound` if `path` is absent. Removed prefixes are never
    /// handed out again.
    pub async fn remove<Tx: Transaction, S: AsRef<str>>(&self, tr: &mut Tx, path: &[S]) -> Result<(), DirectoryError> {
        let path = validate_path(path)?;
        if self.remove_existing(tr, &path).await? {
            Ok(())
        } else {
            Err(DirectoryError::NotFound { path })
        }
    }

    /// Like [`remove`](Self::remove), returning whether anything was removed.
    pub async fn remove_if_exists<Tx: Transaction, S: AsRef<str>>(
        &self,
        tr: &mut Tx,
        path: &[S],
    ) -> Result<bool, DirectoryError> {
        let path = validate_path(path)?;
        self.remove_existing(tr, &path).await
    }

    // =========================================================================
    // Internal Methods
    // =========================================================================

    async fn remove_existing<Tx: Transaction>(&self, tr: &mut Tx, path: &[String]) -> Result<bool, DirectoryError> {
        self.check_version(tr, true).await?;
        if self.find(tr, path).await?.is_none() {
            return Ok(false);
        }
        self.prepare_write(tr).await?;

        let subtree = self.subtree(tr, path).await?;
        for (node_path, entry) in &subtree {
            let node = Node::decode(node_path, &entry.value)?;
            let (begin, end) = Subspace::from_bytes(node.prefix).range();
            tr.clear_range(&begin, &end);
        }
        let (begin, end) = self.subtree_range(path);
        tr.clear_range(&begin, &end);

        debug!(path = %display_path(path), nodes = subtree.len(), "removed directory");
        Ok(true)
    }

    /// Check the stored layer version. Returns `true` if none is stored yet.
    async fn check_version<Tx: Transaction>(&self, tr: &Tx, for_write: bool) -> Result<bool, DirectoryError> {
        let Some(raw) = tr.get(&self.version_key(), false).await? else {
            return Ok(true);
        };

        let stored = decode_version(&raw)?;
        let (major, minor, _) = DIRECTORY_VERSION;
        // A newer minor version may add fields this version would not maintain on write.
        if stored.0 > major || (for_write && stored.0 == major && stored.1 > minor) {
            return Err(DirectoryError::IncompatibleVersion {
                stored: format_version(stored),
                supported: format_version(DIRECTORY_VERSION),
            });
        }
        Ok(false)
    }

    /// Check the version for writing and stamp it on the first mutation.
    async fn prepare_write<Tx: Transaction>(&self, tr: &mut Tx) -> Result<(), DirectoryError> {
        if self.check_version(tr, true).await? {
            tr.set(&self.version_key(), &encode_version());
        }
        Ok(())
    }

    async fn create_node<Tx: Transaction>(
        &self,
        tr: &mut Tx,
        path: Vec<String>,
        layer: Option<&str>,
    ) -> Result<DirectorySubspace, DirectoryError> {
        self.prepare_write(tr).await?;

        for depth in 1..path.len() {
            let ancestor = &path[..depth];
            if self.find(tr, ancestor).await?.is_none() {
                self.allocate_node(tr, ancestor, None).await?;
            }
        }
        let node = self.allocate_node(tr, &path, layer).await?;
        Ok(self.subspace_for(tr, path, node))
    }

    async fn allocate_node<Tx: Transaction>(
        &self,
        tr: &mut Tx,
        path: &[String],
        layer: Option<&str>,
    ) -> Result<Node, DirectoryError> {
        let id = self.allocator.allocate(tr).await.context(AllocationSnafu)?;
        let prefix = self.content_subspace.pack(&Tuple::new().push(id));

        let (begin, end) = Subspace::from_bytes(prefix.clone()).range();
        let existing = tr.get_range(&begin, &end, RangeOptions::default().with_limit(1)).await?;
        if !existing.entries.is_empty() {
            return Err(DirectoryError::PrefixInUse { prefix });
        }

        let node = Node {
            prefix,
            layer: layer.map(str::to_string),
        };
        tr.set(&self.node_key(path), &node.encode());
        debug!(path = %display_path(path), id, layer = ?node.layer, "created directory");
        Ok(node)
    }

    fn open_node<Tx: Transaction>(
        &self,
        tr: &Tx,
        path: Vec<String>,
        node: Node,
        layer: Option<&str>,
    ) -> Result<DirectorySubspace, DirectoryError> {
        if let Some(expected) = layer {
            if node.layer.as_deref() != Some(expected) {
                return Err(DirectoryError::LayerMismatch {
                    path,
                    expected: expected.to_string(),
                    actual: node.layer,
                });
            }
        }
        Ok(self.subspace_for(tr, path, node))
    }

    async fn find<Tx: Transaction>(&self, tr: &Tx, path: &[String]) -> Result<Option<Node>, DirectoryError> {
        match tr.get(&self.node_key(path), false).await? {
            Some(raw) => Ok(Some(Node::decode(path, &raw)?)),
            None => Ok(None),
        }
    }

    /// Metadata entries of `path` and every descendant, with decoded paths.
    async fn subtree<Tx: Transaction>(
        &self,
        tr: &Tx,
        path: &[String],
    ) -> Result<Vec<(Vec<String>, KeyValue)>, DirectoryError> {
        let (begin, end) = self.subtree_range(path);
        let Some(entries) = collect_range(tr, begin, end, MAX_SUBTREE_NODES).await? else {
            return Err(DirectoryError::SubtreeTooLarge {
                path: path.to_vec(),
                max: MAX_SUBTREE_NODES,
            });
        };

        let mut subtree = Vec::with_capacity(entries.len());
        for entry in entries {
            let tuple = self.root_node.unpack(&entry.key).context(SubspaceSnafu)?;
            let mut node_path = Vec::with_capacity(tuple.len());
            for element in tuple.iter() {
                let Some(segment) = element.as_str() else {
                    return Err(DirectoryError::CorruptedMetadata {
                        path: path.to_vec(),
                        reason: format!("node key holds a non-string segment: {tuple:?}"),
                    });
                };
                node_path.push(segment.to_string());
            }
            subtree.push((node_path, entry));
        }
        Ok(subtree)
    }

    fn subspace_for<Tx: Transaction>(&self, tr: &Tx, path: Vec<String>, node: Node) -> DirectorySubspace {
        let subspace = Subspace::from_bytes(node.prefix).with_context(tr.context().clone());
        DirectorySubspace::new(subspace, path, node.layer)
    }

    fn node_key(&self, path: &[String]) -> Vec<u8> {
        self.root_node.pack(&path_tuple(path))
    }

    /// The node key of `path` and every key extending it: `[key, key + 0xFF)`.
    fn subtree_range(&self, path: &[String]) -> (Vec<u8>, Vec<u8>) {
        let begin = self.node_key(path);
        let mut end = begin.clone();
        end.push(0xFF);
        (begin, end)
    }

    fn version_key(&self) -> Vec<u8> {
        self.node_subspace.pack(&Tuple::new().push(DIR_VERSION_KEY))
    }
}

fn path_tuple(path: &[String]) -> Tuple {
    path.iter().map(Element::from).collect()
}
