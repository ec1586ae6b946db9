//! Subspaces bound to a fixed composite key type.
//!
//! [`TypedSubspace<K>`] packs and unpacks keys of type `K`, a Rust tuple of
//! [`TupleValue`] components. Leading components can be packed or decoded
//! on their own through [`PrefixOf`], which only holds for an actual leading
//! prefix of `K`, so `pack_partial::<(String,)>` on a `(String, u64)` key is
//! accepted while `pack_partial::<(u64,)>` is not.
//!
//! ```
//! use tessera_layer::Subspace;
//! use tessera_layer::Tuple;
//!
//! let orders = Subspace::new(Tuple::new().push("orders")).typed::<(String, u64)>();
//!
//! let key = orders.pack(&("alice".to_string(), 17));
//! assert_eq!(orders.unpack(&key).unwrap(), ("alice".to_string(), 17));
//!
//! let (owner,) = orders.unpack_partial::<(String,)>(&key).unwrap();
//! assert_eq!(owner, "alice");
//! ```

use std::fmt;
use std::marker::PhantomData;

use snafu::ResultExt;
use uuid::Uuid;

use crate::subspace::Subspace;
use crate::subspace::SubspaceError;
use crate::subspace::TupleSnafu;
use crate::tuple::Element;
use crate::tuple::Tuple;
use crate::tuple::TupleError;
use crate::tuple::Versionstamp;

// =============================================================================
// Component Values
// =============================================================================

/// A single key component convertible to and from a tuple [`Element`].
pub trait TupleValue: Sized {
    /// Type name reported in mismatch errors.
    const TYPE_NAME: &'static str;

    fn to_element(&self) -> Element;

    /// Convert a decoded element, or `None` if it has another type or range.
    fn from_element(element: Element) -> Option<Self>;
}

macro_rules! impl_tuple_value_int {
    ($($t:ty),*) => {
        $(
            impl TupleValue for $t {
                const TYPE_NAME: &'static str = stringify!($t);

                fn to_element(&self) -> Element {
                    Element::Int(i128::from(*self))
                }

                fn from_element(element: Element) -> Option<Self> {
                    match element {
                        Element::Int(n) => <$t>::try_from(n).ok(),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_tuple_value_int!(i8, i16, i32, i64, i128, u8, u16, u32, u64);

macro_rules! impl_tuple_value {
    ($t:ty, $name:literal, $variant:ident, |$v:ident| $to:expr) => {
        impl TupleValue for $t {
            const TYPE_NAME: &'static str = $name;

            fn to_element(&self) -> Element {
                let $v = self;
                Element::$variant($to)
            }

            fn from_element(element: Element) -> Option<Self> {
                match element {
                    Element::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

impl_tuple_value!(bool, "bool", Bool, |v| *v);
impl_tuple_value!(f32, "f32", Float, |v| *v);
impl_tuple_value!(f64, "f64", Double, |v| *v);
impl_tuple_value!(String, "string", String, |v| v.clone());
impl_tuple_value!(Vec<u8>, "bytes", Bytes, |v| v.clone());
impl_tuple_value!(Uuid, "uuid", Uuid, |v| *v);
impl_tuple_value!(Versionstamp, "versionstamp", Versionstamp, |v| *v);
impl_tuple_value!(Tuple, "tuple", Tuple, |v| v.clone());

impl<T: TupleValue> TupleValue for Option<T> {
    const TYPE_NAME: &'static str = T::TYPE_NAME;

    fn to_element(&self) -> Element {
        match self {
            Some(v) => v.to_element(),
            None => Element::Null,
        }
    }

    fn from_element(element: Element) -> Option<Self> {
        match element {
            Element::Null => Some(None),
            other => T::from_element(other).map(Some),
        }
    }
}

// =============================================================================
// Composite Keys
// =============================================================================

/// A fixed-arity composite key made of [`TupleValue`] components.
pub trait TupleKey: Sized {
    /// Number of components.
    const ARITY: usize;

    fn to_tuple(&self) -> Tuple;

    /// Build the key from exactly [`ARITY`](Self::ARITY) decoded elements.
    fn from_tuple(tuple: Tuple) -> Result<Self, TupleError>;
}

/// Marker: `Self` is a leading prefix of the composite key `K`.
///
/// Implemented for every strict prefix and for `K` itself.
pub trait PrefixOf<K: TupleKey>: TupleKey {}

fn take_component<T: TupleValue>(elements: &mut std::vec::IntoIter<Element>, index: usize) -> Result<T, TupleError> {
    let element = elements.next().ok_or(TupleError::ArityMismatch {
        expected: index + 1,
        found: index,
    })?;
    let found = element.type_name();
    T::from_element(element).ok_or(TupleError::TypeMismatch {
        index,
        expected: T::TYPE_NAME,
        found,
    })
}

macro_rules! impl_tuple_key {
    ($arity:literal; $($t:ident . $idx:tt),+) => {
        impl<$($t: TupleValue),+> TupleKey for ($($t,)+) {
            const ARITY: usize = $arity;

            fn to_tuple(&self) -> Tuple {
                Tuple::from_elements(vec![$(self.$idx.to_element()),+])
            }

            fn from_tuple(tuple: Tuple) -> Result<Self, TupleError> {
                if tuple.len() != $arity {
                    return Err(TupleError::ArityMismatch {
                        expected: $arity,
                        found: tuple.len(),
                    });
                }
                let mut elements = tuple.into_elements().into_iter();
                Ok(($(take_component::<$t>(&mut elements, $idx)?,)+))
            }
        }
    };
}

impl_tuple_key!(1; A.0);
impl_tuple_key!(2; A.0, B.1);
impl_tuple_key!(3; A.0, B.1, C.2);
impl_tuple_key!(4; A.0, B.1, C.2, D.3);
impl_tuple_key!(5; A.0, B.1, C.2, D.3, E.4);
impl_tuple_key!(6; A.0, B.1, C.2, D.3, E.4, F.5);

macro_rules! impl_prefix_of {
    (@one ($($k:ident),+) ($($p:ident),+)) => {
        impl<$($k: TupleValue),+> PrefixOf<($($k,)+)> for ($($p,)+) {}
    };
    ($key:tt => $($prefix:tt),+) => {
        $(impl_prefix_of!(@one $key $prefix);)+
    };
}

impl_prefix_of!((A) => (A));
impl_prefix_of!((A, B) => (A), (A, B));
impl_prefix_of!((A, B, C) => (A), (A, B), (A, B, C));
impl_prefix_of!((A, B, C, D) => (A), (A, B), (A, B, C), (A, B, C, D));
impl_prefix_of!((A, B, C, D, E) => (A), (A, B), (A, B, C), (A, B, C, D), (A, B, C, D, E));
impl_prefix_of!((A, B, C, D, E, F) => (A), (A, B), (A, B, C), (A, B, C, D), (A, B, C, D, E), (A, B, C, D, E, F));

// =============================================================================
// Typed Subspace
// =============================================================================

/// A [`Subspace`] whose keys are all of type `K`.
pub struct TypedSubspace<K> {
    subspace: Subspace,
    _key: PhantomData<fn() -> K>,
}

impl<K: TupleKey> TypedSubspace<K> {
    pub fn new(subspace: Subspace) -> Self {
        Self {
            subspace,
            _key: PhantomData,
        }
    }

    pub fn subspace(&self) -> &Subspace {
        &self.subspace
    }

    pub fn pack(&self, key: &K) -> Vec<u8> {
        self.subspace.pack(&key.to_tuple())
    }

    /// Decode a full key; the suffix must hold exactly `K::ARITY` components.
    pub fn unpack(&self, raw: &[u8]) -> Result<K, SubspaceError> {
        let tuple = self.subspace.unpack(raw)?;
        K::from_tuple(tuple).context(TupleSnafu)
    }

    /// Pack only the leading components described by `P`.
    pub fn pack_partial<P: PrefixOf<K>>(&self, prefix: &P) -> Vec<u8> {
        self.subspace.pack(&prefix.to_tuple())
    }

    /// Decode only the leading components described by `P`, ignoring the rest.
    pub fn unpack_partial<P: PrefixOf<K>>(&self, raw: &[u8]) -> Result<P, SubspaceError> {
        let tuple = self.subspace.unpack_prefix(raw, P::ARITY)?;
        P::from_tuple(tuple).context(TupleSnafu)
    }

    /// Range of every key in this subspace.
    pub fn range(&self) -> (Vec<u8>, Vec<u8>) {
        self.subspace.range()
    }

    /// Range of every key whose leading components equal `prefix`.
    ///
    /// When `P` is `K` itself the range is empty of full keys, since nothing
    /// strictly extends a complete key.
    pub fn range_partial<P: PrefixOf<K>>(&self, prefix: &P) -> (Vec<u8>, Vec<u8>) {
        self.subspace.range_of(&prefix.to_tuple())
    }

    pub fn contains(&self, raw: &[u8]) -> bool {
        self.subspace.contains(raw)
    }
}

impl<K> Clone for TypedSubspace<K> {
    fn clone(&self) -> Self {
        Self {
            subspace: self.subspace.clone(),
            _key: PhantomData,
        }
    }
}

impl<K> fmt::Debug for TypedSubspace<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedSubspace")
            .field("subspace", &self.subspace)
            .field("key", &std::any::type_name::<K>())
            .finish()
    }
}
