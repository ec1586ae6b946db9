use std::cmp::Ordering;

use uuid::Uuid;

use super::encoding::Encoder;
use super::tuple_type::Tuple;
use super::versionstamp::Versionstamp;

// =============================================================================
// Element Type
// =============================================================================

/// A single typed value inside a [`Tuple`].
///
/// Elements order first by type (in type-code order) and then by value.
/// This structural order is the same order their packed bytes compare in.
/// Floats compare by IEEE total order, so `-0.0 < 0.0` and NaNs are ordered
/// by bit pattern.
#[derive(Debug, Clone)]
pub enum Element {
    /// Null value.
    Null,
    /// Raw byte string.
    Bytes(Vec<u8>),
    /// UTF-8 string.
    String(String),
    /// Nested tuple.
    Tuple(Tuple),
    /// Signed integer. Values wider than 64 bits use the arbitrary-precision form.
    Int(i128),
    /// 32-bit float.
    Float(f32),
    /// 64-bit float.
    Double(f64),
    /// Boolean.
    Bool(bool),
    /// 128-bit UUID.
    Uuid(Uuid),
    /// Commit-ordered versionstamp, possibly incomplete.
    Versionstamp(Versionstamp),
}

impl Element {
    /// Append this element's encoding to `buf`.
    ///
    /// Incomplete versionstamps are written with their placeholder bytes.
    pub fn pack_into(&self, buf: &mut Vec<u8>) {
        let mut encoder = Encoder::new(buf);
        encoder.element(self, false);
    }

    /// Human-readable type name used in mismatch errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Element::Null => "null",
            Element::Bytes(_) => "bytes",
            Element::String(_) => "string",
            Element::Tuple(_) => "tuple",
            Element::Int(_) => "int",
            Element::Float(_) => "float",
            Element::Double(_) => "double",
            Element::Bool(_) => "bool",
            Element::Uuid(_) => "uuid",
            Element::Versionstamp(_) => "versionstamp",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Element::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Element::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Element::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i128> {
        match self {
            Element::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// The integer value, if it fits in an i64.
    pub fn as_i64(&self) -> Option<i64> {
        self.as_int().and_then(|n| i64::try_from(n).ok())
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Element::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&Tuple> {
        match self {
            Element::Tuple(t) => Some(t),
            _ => None,
        }
    }

    /// Whether this element is, or contains, an incomplete versionstamp.
    pub fn has_incomplete_versionstamp(&self) -> bool {
        match self {
            Element::Versionstamp(vs) => !vs.is_complete(),
            Element::Tuple(t) => t.has_incomplete_versionstamp(),
            _ => false,
        }
    }

    /// Sort rank of the element's type, equal to its leading type code.
    fn type_rank(&self) -> u8 {
        match self {
            Element::Null => super::NULL_CODE,
            Element::Bytes(_) => super::BYTES_CODE,
            Element::String(_) => super::STRING_CODE,
            Element::Tuple(_) => super::NESTED_CODE,
            Element::Int(_) => super::INT_ZERO_CODE,
            Element::Float(_) => super::FLOAT_CODE,
            Element::Double(_) => super::DOUBLE_CODE,
            Element::Bool(_) => super::FALSE_CODE,
            Element::Uuid(_) => super::UUID_CODE,
            Element::Versionstamp(_) => super::VERSIONSTAMP_CODE,
        }
    }
}

impl Ord for Element {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Element::Null, Element::Null) => Ordering::Equal,
            (Element::Bytes(a), Element::Bytes(b)) => a.cmp(b),
            (Element::String(a), Element::String(b)) => a.as_bytes().cmp(b.as_bytes()),
            (Element::Tuple(a), Element::Tuple(b)) => a.cmp(b),
            (Element::Int(a), Element::Int(b)) => a.cmp(b),
            (Element::Float(a), Element::Float(b)) => a.total_cmp(b),
            (Element::Double(a), Element::Double(b)) => a.total_cmp(b),
            (Element::Bool(a), Element::Bool(b)) => a.cmp(b),
            (Element::Uuid(a), Element::Uuid(b)) => a.cmp(b),
            (Element::Versionstamp(a), Element::Versionstamp(b)) => a.cmp(b),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

impl PartialOrd for Element {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Element {}

// =============================================================================
// Conversions
// =============================================================================

impl From<()> for Element {
    fn from(_: ()) -> Self {
        Element::Null
    }
}

impl From<&str> for Element {
    fn from(s: &str) -> Self {
        Element::String(s.to_string())
    }
}

impl From<String> for Element {
    fn from(s: String) -> Self {
        Element::String(s)
    }
}

impl From<&String> for Element {
    fn from(s: &String) -> Self {
        Element::String(s.clone())
    }
}

impl From<Vec<u8>> for Element {
    fn from(b: Vec<u8>) -> Self {
        Element::Bytes(b)
    }
}

impl From<&[u8]> for Element {
    fn from(b: &[u8]) -> Self {
        Element::Bytes(b.to_vec())
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Element {
                fn from(n: $t) -> Self {
                    Element::Int(i128::from(n))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, i128, u8, u16, u32, u64);

impl From<bool> for Element {
    fn from(b: bool) -> Self {
        Element::Bool(b)
    }
}

impl From<f32> for Element {
    fn from(f: f32) -> Self {
        Element::Float(f)
    }
}

impl From<f64> for Element {
    fn from(d: f64) -> Self {
        Element::Double(d)
    }
}

impl From<Uuid> for Element {
    fn from(u: Uuid) -> Self {
        Element::Uuid(u)
    }
}

impl From<Versionstamp> for Element {
    fn from(vs: Versionstamp) -> Self {
        Element::Versionstamp(vs)
    }
}

impl From<Tuple> for Element {
    fn from(t: Tuple) -> Self {
        Element::Tuple(t)
    }
}

impl<T: Into<Element>> From<Option<T>> for Element {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Element::Null,
        }
    }
}
