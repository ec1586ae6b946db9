//! Prefix-scoped key spaces.
//!
//! A [`Subspace`] is a binary prefix. Keys are built by appending a packed
//! tuple to it, and parsed by stripping it. Every subspace also carries a
//! [`SubspaceContext`], the handle of whatever produced its prefix. A
//! subspace resolved inside a transaction carries that transaction's
//! context. [`Subspace::try_pack`] refuses to build keys once that context
//! is invalidated; [`Subspace::pack`] never checks it.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use snafu::ResultExt;
use snafu::Snafu;

use crate::tuple::Tuple;
use crate::tuple::TupleError;
use crate::tuple::strinc;
use crate::typed::TupleKey;
use crate::typed::TypedSubspace;

// =============================================================================
// Errors
// =============================================================================

/// Errors from subspace key operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SubspaceError {
    /// Key does not start with the subspace prefix.
    #[snafu(display("key of {key_len} bytes is outside subspace with {prefix_len}-byte prefix"))]
    KeyOutsideSubspace {
        /// Length of the rejected key.
        key_len: usize,
        /// Length of the subspace prefix.
        prefix_len: usize,
    },

    /// The context that resolved this subspace is no longer valid.
    #[snafu(display("subspace context '{label}' is no longer valid"))]
    InvalidContext {
        /// Label of the invalidated context.
        label: String,
    },

    /// Tuple encoding or decoding failed.
    #[snafu(display("tuple error: {source}"))]
    Tuple {
        /// The underlying tuple error.
        source: TupleError,
    },
}

// =============================================================================
// Context
// =============================================================================

struct ContextState {
    label: String,
    valid: AtomicBool,
}

/// Validity handle shared by a resolver and the subspaces it produced.
///
/// The root context is always valid. A named context starts valid and stays
/// that way until [`invalidate`](Self::invalidate) is called on any clone.
#[derive(Clone, Default)]
pub struct SubspaceContext {
    state: Option<Arc<ContextState>>,
}

impl SubspaceContext {
    /// The always-valid context of subspaces built directly from a prefix.
    pub fn root() -> Self {
        Self { state: None }
    }

    /// A fresh, valid context.
    pub fn named(label: impl Into<String>) -> Self {
        Self {
            state: Some(Arc::new(ContextState {
                label: label.into(),
                valid: AtomicBool::new(true),
            })),
        }
    }

    pub fn label(&self) -> &str {
        self.state.as_ref().map_or("root", |s| s.label.as_str())
    }

    pub fn is_root(&self) -> bool {
        self.state.is_none()
    }

    pub fn is_valid(&self) -> bool {
        self.state.as_ref().is_none_or(|s| s.valid.load(Ordering::Acquire))
    }

    /// Mark the context invalid. No effect on the root context.
    pub fn invalidate(&self) {
        if let Some(state) = &self.state {
            state.valid.store(false, Ordering::Release);
        }
    }

    pub fn ensure_valid(&self) -> Result<(), SubspaceError> {
        if self.is_valid() {
            Ok(())
        } else {
            InvalidContextSnafu { label: self.label() }.fail()
        }
    }

    /// Whether both handles refer to the same context.
    pub fn same_as(&self, other: &SubspaceContext) -> bool {
        match (&self.state, &other.state) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for SubspaceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubspaceContext")
            .field("label", &self.label())
            .field("valid", &self.is_valid())
            .finish()
    }
}

// =============================================================================
// Subspace
// =============================================================================

/// A binary key prefix plus the context that resolved it.
///
/// Subspaces are cheap to clone; the prefix is shared.
#[derive(Clone)]
pub struct Subspace {
    prefix: Arc<[u8]>,
    context: SubspaceContext,
}

impl Subspace {
    /// Subspace whose prefix is the packed tuple.
    pub fn new(prefix: Tuple) -> Self {
        Self::from_bytes(prefix.pack())
    }

    /// Subspace with a raw byte prefix.
    pub fn from_bytes(prefix: impl Into<Vec<u8>>) -> Self {
        Self {
            prefix: Arc::from(prefix.into()),
            context: SubspaceContext::root(),
        }
    }

    /// The subspace covering every key.
    pub fn all() -> Self {
        Self::from_bytes(Vec::new())
    }

    /// Replace the context, keeping the prefix.
    pub fn with_context(mut self, context: SubspaceContext) -> Self {
        self.context = context;
        self
    }

    /// Same context, different prefix.
    pub fn rebind(&self, prefix: impl Into<Vec<u8>>) -> Self {
        Self {
            prefix: Arc::from(prefix.into()),
            context: self.context.clone(),
        }
    }

    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    pub fn context(&self) -> &SubspaceContext {
        &self.context
    }

    pub fn ensure_valid(&self) -> Result<(), SubspaceError> {
        self.context.ensure_valid()
    }

    /// Child subspace whose prefix is this prefix plus the packed tuple.
    pub fn subspace(&self, tuple: &Tuple) -> Subspace {
        self.rebind(self.pack(tuple))
    }

    /// Bind a fixed composite key type to this subspace.
    pub fn typed<K: TupleKey>(&self) -> TypedSubspace<K> {
        TypedSubspace::new(self.clone())
    }

    // =========================================================================
    // Keys
    // =========================================================================

    /// Prefix followed by the packed tuple.
    pub fn pack(&self, tuple: &Tuple) -> Vec<u8> {
        let mut key = Vec::with_capacity(self.prefix.len() + tuple.len() * 8);
        key.extend_from_slice(&self.prefix);
        tuple.pack_into(&mut key);
        key
    }

    /// Like [`pack`](Self::pack), rejecting an invalidated context and
    /// incomplete versionstamps.
    pub fn try_pack(&self, tuple: &Tuple) -> Result<Vec<u8>, SubspaceError> {
        self.ensure_valid()?;
        let packed = tuple.try_pack().context(TupleSnafu)?;
        let mut key = self.prefix.to_vec();
        key.extend_from_slice(&packed);
        Ok(key)
    }

    /// Versionstamped key under this prefix; see [`Tuple::pack_with_versionstamp`].
    pub fn pack_with_versionstamp(&self, tuple: &Tuple) -> Result<Vec<u8>, SubspaceError> {
        tuple.pack_with_versionstamp(&self.prefix).context(TupleSnafu)
    }

    /// Strip the prefix and decode the rest as a tuple.
    pub fn unpack(&self, key: &[u8]) -> Result<Tuple, SubspaceError> {
        let rest = self.strip(key)?;
        Tuple::unpack(rest).context(TupleSnafu)
    }

    /// Strip the prefix and decode only the first `count` elements.
    pub fn unpack_prefix(&self, key: &[u8], count: usize) -> Result<Tuple, SubspaceError> {
        let rest = self.strip(key)?;
        let (tuple, _) = Tuple::unpack_prefix(rest, count).context(TupleSnafu)?;
        Ok(tuple)
    }

    fn strip<'k>(&self, key: &'k [u8]) -> Result<&'k [u8], SubspaceError> {
        key.strip_prefix(self.prefix.as_ref()).ok_or(SubspaceError::KeyOutsideSubspace {
            key_len: key.len(),
            prefix_len: self.prefix.len(),
        })
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        key.starts_with(&self.prefix)
    }

    // =========================================================================
    // Ranges
    // =========================================================================

    /// Range covering every key that starts with the prefix, the bare prefix
    /// (the packed empty tuple) included.
    ///
    /// The end is the incremented prefix. When the prefix is empty or all
    /// `0xFF` it has no increment, and `prefix + 0xFF` is used instead.
    pub fn range(&self) -> (Vec<u8>, Vec<u8>) {
        let begin = self.prefix.to_vec();
        let end = strinc(&self.prefix).unwrap_or_else(|| {
            let mut end = begin.clone();
            end.push(0xFF);
            end
        });
        (begin, end)
    }

    /// Keys holding at least one tuple element: `(prefix + 0x00, prefix + 0xFF)`.
    ///
    /// Excludes the bare prefix, so scanning it over a node subspace skips the
    /// node's own entry.
    pub fn tuple_range(&self) -> (Vec<u8>, Vec<u8>) {
        let mut begin = self.prefix.to_vec();
        begin.push(0x00);
        let mut end = self.prefix.to_vec();
        end.push(0xFF);
        (begin, end)
    }

    /// Keys strictly extending `tuple` under this prefix.
    pub fn range_of(&self, tuple: &Tuple) -> (Vec<u8>, Vec<u8>) {
        self.subspace(tuple).tuple_range()
    }
}

impl fmt::Debug for Subspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subspace")
            .field("prefix", &hex::encode(&*self.prefix))
            .field("context", &self.context.label())
            .finish()
    }
}

impl PartialEq for Subspace {
    fn eq(&self, other: &Self) -> bool {
        self.prefix == other.prefix
    }
}

impl Eq for Subspace {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack() {
        let space = Subspace::new(Tuple::new().push("users"));
        let key = space.pack(&Tuple::new().push(7i64));

        assert!(key.starts_with(space.prefix()));
        assert_eq!(space.unpack(&key).unwrap(), Tuple::new().push(7i64));
    }

    #[test]
    fn test_unpack_rejects_foreign_key() {
        let users = Subspace::new(Tuple::new().push("users"));
        let orders = Subspace::new(Tuple::new().push("orders"));
        let key = orders.pack(&Tuple::new().push(1i64));

        assert!(!users.contains(&key));
        assert!(matches!(users.unpack(&key), Err(SubspaceError::KeyOutsideSubspace { .. })));
    }

    #[test]
    fn test_nested_subspace_prefix() {
        let root = Subspace::from_bytes(vec![0x15, 0x01]);
        let child = root.subspace(&Tuple::new().push("child"));

        assert!(child.prefix().starts_with(root.prefix()));
        assert_eq!(root.unpack(child.prefix()).unwrap(), Tuple::new().push("child"));
    }

    #[test]
    fn test_tuple_range_excludes_bare_prefix() {
        let space = Subspace::from_bytes(b"p".to_vec());
        let (begin, end) = space.tuple_range();

        assert_eq!(begin, b"p\x00".to_vec());
        assert_eq!(end, b"p\xFF".to_vec());
        assert!(space.prefix() < begin.as_slice());

        let key = space.pack(&Tuple::new().push(()));
        assert!(key >= begin && key < end);
    }

    #[test]
    fn test_range_covers_prefix() {
        let space = Subspace::from_bytes(vec![0x15, 0x05]);
        let (begin, end) = space.range();

        assert_eq!(begin, vec![0x15, 0x05]);
        assert_eq!(end, vec![0x15, 0x06]);

        let inside = space.pack(&Tuple::new().push(vec![0xFFu8; 4]));
        assert!(inside >= begin && inside < end);
        assert!(vec![0x15, 0x06] >= end);
    }

    #[test]
    fn test_range_of_all_ff_prefix() {
        let space = Subspace::from_bytes(vec![0xFF, 0xFF]);
        let (begin, end) = space.range();
        assert_eq!(begin, vec![0xFF, 0xFF]);
        assert_eq!(end, vec![0xFF, 0xFF, 0xFF]);

        let (begin, end) = Subspace::all().range();
        assert!(begin.is_empty());
        assert_eq!(end, vec![0xFF]);
    }

    #[test]
    fn test_range_contains_empty_tuple_key() {
        let space = Subspace::from_bytes(vec![0x15, 0x07]);
        let bare = space.pack(&Tuple::new());
        let (begin, end) = space.range();

        assert_eq!(bare, vec![0x15, 0x07]);
        assert!(begin <= bare && bare < end);

        let (begin, end) = space.tuple_range();
        assert!(bare < begin);
        assert!(space.pack(&Tuple::new().push(1i64)) >= begin && space.pack(&Tuple::new().push(1i64)) < end);
    }

    #[test]
    fn test_range_of_skips_bare_child() {
        let space = Subspace::from_bytes(b"n".to_vec());
        let child = Tuple::new().push("a");
        let (begin, end) = space.range_of(&child);

        assert!(space.pack(&child) < begin);
        assert!(space.pack(&child.clone().push("b")) < end);
    }

    #[test]
    fn test_context_invalidation() {
        let context = SubspaceContext::named("tx-1");
        let space = Subspace::from_bytes(b"p".to_vec()).with_context(context.clone());
        let child = space.subspace(&Tuple::new().push(1i64));

        assert!(child.ensure_valid().is_ok());
        context.invalidate();
        assert!(matches!(child.ensure_valid(), Err(SubspaceError::InvalidContext { .. })));
        assert!(child.context().same_as(&context));
    }

    #[test]
    fn test_try_pack_refuses_invalidated_context() {
        let context = SubspaceContext::named("tx-2");
        let space = Subspace::from_bytes(b"p".to_vec()).with_context(context.clone());
        let tuple = Tuple::new().push(1i64);

        assert_eq!(space.try_pack(&tuple).unwrap(), space.pack(&tuple));
        context.invalidate();
        assert!(matches!(space.try_pack(&tuple), Err(SubspaceError::InvalidContext { .. })));
        assert_eq!(space.pack(&tuple), Subspace::from_bytes(b"p".to_vec()).pack(&tuple));
    }

    #[test]
    fn test_debug_renders_prefix_as_hex() {
        let space = Subspace::from_bytes(vec![0x15, 0xAB]);
        assert!(format!("{space:?}").contains("\"15ab\""));
    }

    #[test]
    fn test_root_context_always_valid() {
        let root = SubspaceContext::root();
        root.invalidate();
        assert!(root.is_valid());
        assert_eq!(root.label(), "root");
    }

    #[test]
    fn test_try_pack_rejects_incomplete_versionstamp() {
        let space = Subspace::from_bytes(b"log".to_vec());
        let tuple = Tuple::new().push(crate::Versionstamp::incomplete(0));

        assert!(space.try_pack(&tuple).is_err());
        let key = space.pack_with_versionstamp(&tuple).unwrap();
        assert!(key.starts_with(b"log"));
    }
}
