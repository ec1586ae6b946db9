//! Order-preserving tuple encoding.
//!
//! Packed tuples compare byte-wise exactly as the decoded tuples compare
//! element-wise, so a tuple can be used directly as an ordered key and a
//! tuple prefix selects a contiguous key range.
//!
//! The byte layout follows the FoundationDB tuple layer, which keeps keys
//! written here readable by other layer implementations.
//!
//! # Type Codes
//!
//! | Code | Type | Payload |
//! |------|------|---------|
//! | 0x00 | Null | none (`0x00 0xFF` inside a nested tuple) |
//! | 0x01 | Bytes | escaped bytes, `0x00` terminated |
//! | 0x02 | String | escaped UTF-8, `0x00` terminated |
//! | 0x05 | Nested | elements, `0x00` terminated |
//! | 0x0B | NegBigInt | `len ^ 0xFF`, one's complement magnitude |
//! | 0x0C-0x13 | NegInt | one's complement magnitude (size = 0x14 - code) |
//! | 0x14 | IntZero | none |
//! | 0x15-0x1C | PosInt | big-endian magnitude (size = code - 0x14) |
//! | 0x1D | PosBigInt | `len`, big-endian magnitude |
//! | 0x20 | Float | 4 transformed bytes |
//! | 0x21 | Double | 8 transformed bytes |
//! | 0x26 / 0x27 | False / True | none |
//! | 0x30 | UUID | 16 bytes |
//! | 0x33 | Versionstamp | 10 byte commit version + 2 byte user version |
//!
//! Within bytes and strings a literal `0x00` is written as `0x00 0xFF`, which
//! keeps the terminator unambiguous and preserves ordering.
//!
//! # Example
//!
//! ```
//! use tessera_layer::Tuple;
//!
//! let tuple = Tuple::new().push(-1i64).push("hello").push(true);
//! let packed = tuple.pack();
//!
//! assert_eq!(Tuple::unpack(&packed).unwrap(), tuple);
//! ```

mod decoding;
mod element;
mod encoding;
mod tuple_type;
mod versionstamp;

#[cfg(test)]
mod tests;

pub use element::Element;
use snafu::Snafu;
pub use tuple_type::Tuple;
pub use versionstamp::Versionstamp;

// =============================================================================
// Type Codes
// =============================================================================

const NULL_CODE: u8 = 0x00;
const BYTES_CODE: u8 = 0x01;
const STRING_CODE: u8 = 0x02;
const NESTED_CODE: u8 = 0x05;

/// Arbitrary-precision negative integer.
const NEG_INT_BIG_CODE: u8 = 0x0B;

/// Integer zero; fixed-width integers are encoded relative to this code.
const INT_ZERO_CODE: u8 = 0x14;

/// Arbitrary-precision positive integer.
const POS_INT_BIG_CODE: u8 = 0x1D;

const FLOAT_CODE: u8 = 0x20;
const DOUBLE_CODE: u8 = 0x21;
const FALSE_CODE: u8 = 0x26;
const TRUE_CODE: u8 = 0x27;
const UUID_CODE: u8 = 0x30;
const VERSIONSTAMP_CODE: u8 = 0x33;

/// Escape byte following an embedded `0x00`.
const NULL_ESCAPE: u8 = 0xFF;

/// Widest fixed-width integer payload.
const MAX_FIXED_INT_BYTES: usize = 8;

/// Widest integer payload this codec accepts (i128).
const MAX_INT_BYTES: usize = 16;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during tuple encoding/decoding.
#[derive(Debug, Snafu)]
pub enum TupleError {
    /// Unexpected end of input while decoding.
    #[snafu(display("unexpected end of input at offset {offset}"))]
    UnexpectedEnd {
        /// Byte offset where the error occurred.
        offset: usize,
    },

    /// Unknown type code encountered.
    #[snafu(display("unknown type code 0x{code:02X} at offset {offset}"))]
    UnknownTypeCode {
        /// The unknown type code.
        code: u8,
        /// Byte offset where the error occurred.
        offset: usize,
    },

    /// Invalid UTF-8 string data.
    #[snafu(display("invalid UTF-8 at offset {offset}: {source}"))]
    InvalidUtf8 {
        /// Byte offset where the error occurred.
        offset: usize,
        /// The underlying UTF-8 error.
        source: std::str::Utf8Error,
    },

    /// Missing null terminator for byte/string element.
    #[snafu(display("missing null terminator at offset {offset}"))]
    MissingTerminator {
        /// Byte offset where the error occurred.
        offset: usize,
    },

    /// Integer does not fit in an i128.
    #[snafu(display("integer overflow at offset {offset}"))]
    IntegerOverflow {
        /// Byte offset where the error occurred.
        offset: usize,
    },

    /// Nested tuple not properly terminated.
    #[snafu(display("unterminated nested tuple at offset {offset}"))]
    UnterminatedNested {
        /// Byte offset where the error occurred.
        offset: usize,
    },

    /// Nested tuples exceed the decoder's depth bound.
    #[snafu(display("nested tuple at offset {offset} exceeds maximum depth of {max}"))]
    NestingTooDeep {
        /// Byte offset of the nested tuple that crossed the bound.
        offset: usize,
        /// Deepest nesting accepted.
        max: u32,
    },

    /// A decoded element had a different type than the caller asked for.
    #[snafu(display("element {index}: expected {expected}, found {found}"))]
    TypeMismatch {
        /// Position of the element within the tuple.
        index: usize,
        /// Type the caller asked for.
        expected: &'static str,
        /// Type actually decoded.
        found: &'static str,
    },

    /// A decoded tuple had the wrong number of elements.
    #[snafu(display("expected {expected} elements, found {found}"))]
    ArityMismatch {
        /// Number of elements the caller asked for.
        expected: usize,
        /// Number of elements decoded.
        found: usize,
    },

    /// A value cannot be encoded in the requested form.
    #[snafu(display("unsupported value: {reason}"))]
    UnsupportedValue {
        /// Why the value was rejected.
        reason: String,
    },
}

impl TupleError {
    /// Whether the input ended before a complete element was read.
    pub fn is_truncated(&self) -> bool {
        matches!(
            self,
            TupleError::UnexpectedEnd { .. } | TupleError::MissingTerminator { .. } | TupleError::UnterminatedNested { .. }
        )
    }
}

// =============================================================================
// Key Helpers
// =============================================================================

/// Smallest key strictly greater than every key starting with `key`.
///
/// Trailing `0xFF` bytes are dropped and the last remaining byte is
/// incremented. Returns `None` when `key` is empty or consists only of
/// `0xFF` bytes, since no such key exists.
///
/// ```
/// use tessera_layer::strinc;
///
/// assert_eq!(strinc(b"ab"), Some(b"ac".to_vec()));
/// assert_eq!(strinc(&[0x01, 0xFF, 0xFF]), Some(vec![0x02]));
/// assert_eq!(strinc(&[0xFF]), None);
/// ```
pub fn strinc(key: &[u8]) -> Option<Vec<u8>> {
    let last = key.iter().rposition(|&b| b != 0xFF)?;
    let mut out = key[..=last].to_vec();
    out[last] += 1;
    Some(out)
}
