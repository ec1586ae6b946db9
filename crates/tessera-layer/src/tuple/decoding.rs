use snafu::ResultExt;
use tessera_constants::tuple::MAX_TUPLE_NESTING_DEPTH;
use uuid::Uuid;

use super::BYTES_CODE;
use super::DOUBLE_CODE;
use super::FALSE_CODE;
use super::FLOAT_CODE;
use super::INT_ZERO_CODE;
use super::InvalidUtf8Snafu;
use super::MAX_INT_BYTES;
use super::NEG_INT_BIG_CODE;
use super::NESTED_CODE;
use super::NULL_CODE;
use super::NULL_ESCAPE;
use super::POS_INT_BIG_CODE;
use super::STRING_CODE;
use super::TRUE_CODE;
use super::TupleError;
use super::UUID_CODE;
use super::VERSIONSTAMP_CODE;
use super::element::Element;
use super::tuple_type::Tuple;
use super::versionstamp::VERSIONSTAMP_LEN;
use super::versionstamp::Versionstamp;

// =============================================================================
// Decoding Functions
// =============================================================================

/// Decode a single element from bytes at the given offset.
///
/// `depth` is the number of nested tuples enclosing the element; top-level
/// elements are at depth 0. Returns the decoded element and the number of
/// bytes consumed.
pub(super) fn decode_element(data: &[u8], offset: usize, depth: u32) -> Result<(Element, usize), TupleError> {
    let Some(&code) = data.get(offset) else {
        return Err(TupleError::UnexpectedEnd { offset });
    };

    match code {
        NULL_CODE => Ok((Element::Null, 1)),

        BYTES_CODE => {
            let (bytes, consumed) = decode_escaped(data, offset + 1)?;
            Ok((Element::Bytes(bytes), consumed + 1))
        }

        STRING_CODE => {
            let (bytes, consumed) = decode_escaped(data, offset + 1)?;
            let s = String::from_utf8(bytes)
                .map_err(|e| e.utf8_error())
                .context(InvalidUtf8Snafu { offset })?;
            Ok((Element::String(s), consumed + 1))
        }

        NESTED_CODE => {
            if depth >= MAX_TUPLE_NESTING_DEPTH {
                return Err(TupleError::NestingTooDeep {
                    offset,
                    max: MAX_TUPLE_NESTING_DEPTH,
                });
            }
            let (tuple, consumed) = decode_nested_tuple(data, offset + 1, depth + 1)?;
            Ok((Element::Tuple(tuple), consumed + 1))
        }

        NEG_INT_BIG_CODE..=POS_INT_BIG_CODE => {
            let (n, consumed) = decode_int(data, offset)?;
            Ok((Element::Int(n), consumed))
        }

        FLOAT_CODE => {
            let raw = fixed::<4>(data, offset + 1)?;
            Ok((Element::Float(f32::from_bits(decode_float_bits(u32::from_be_bytes(raw)))), 5))
        }

        DOUBLE_CODE => {
            let raw = fixed::<8>(data, offset + 1)?;
            Ok((Element::Double(f64::from_bits(decode_double_bits(u64::from_be_bytes(raw)))), 9))
        }

        FALSE_CODE => Ok((Element::Bool(false), 1)),
        TRUE_CODE => Ok((Element::Bool(true), 1)),

        UUID_CODE => {
            let raw = fixed::<16>(data, offset + 1)?;
            Ok((Element::Uuid(Uuid::from_bytes(raw)), 17))
        }

        VERSIONSTAMP_CODE => {
            let raw = fixed::<VERSIONSTAMP_LEN>(data, offset + 1)?;
            Ok((Element::Versionstamp(Versionstamp::from_bytes(raw)), 1 + VERSIONSTAMP_LEN))
        }

        _ => Err(TupleError::UnknownTypeCode { code, offset }),
    }
}

/// Copy exactly `N` bytes starting at `start`.
fn fixed<const N: usize>(data: &[u8], start: usize) -> Result<[u8; N], TupleError> {
    let slice = data.get(start..start + N).ok_or(TupleError::UnexpectedEnd { offset: start })?;
    let mut out = [0u8; N];
    out.copy_from_slice(slice);
    Ok(out)
}

/// Decode bytes with null escaping (0x00, 0xFF -> 0x00).
///
/// Returns the decoded bytes and the number of bytes consumed (including terminator).
fn decode_escaped(data: &[u8], start: usize) -> Result<(Vec<u8>, usize), TupleError> {
    let mut result = Vec::new();
    let mut i = start;

    while i < data.len() {
        let b = data[i];
        if b == 0x00 {
            if data.get(i + 1) == Some(&NULL_ESCAPE) {
                result.push(0x00);
                i += 2;
            } else {
                return Ok((result, i - start + 1));
            }
        } else {
            result.push(b);
            i += 1;
        }
    }

    Err(TupleError::MissingTerminator { offset: start })
}

/// Decode an integer in any of the fixed-width or arbitrary-precision forms.
fn decode_int(data: &[u8], offset: usize) -> Result<(i128, usize), TupleError> {
    let code = data[offset];

    if code == INT_ZERO_CODE {
        return Ok((0, 1));
    }

    // (payload start, payload length, negative)
    let (start, size, negative) = match code {
        POS_INT_BIG_CODE => {
            let len = *data.get(offset + 1).ok_or(TupleError::UnexpectedEnd { offset })?;
            (offset + 2, len as usize, false)
        }
        NEG_INT_BIG_CODE => {
            let len = *data.get(offset + 1).ok_or(TupleError::UnexpectedEnd { offset })? ^ 0xFF;
            (offset + 2, len as usize, true)
        }
        c if c > INT_ZERO_CODE => (offset + 1, (c - INT_ZERO_CODE) as usize, false),
        c => (offset + 1, (INT_ZERO_CODE - c) as usize, true),
    };

    let payload = data.get(start..start + size).ok_or(TupleError::UnexpectedEnd { offset })?;
    let consumed = start + size - offset;

    // Leading zero bytes are tolerated; only significant bytes count toward width.
    let significant = if negative {
        payload.iter().skip_while(|&&b| b == 0xFF).count()
    } else {
        payload.iter().skip_while(|&&b| b == 0x00).count()
    };
    if significant > MAX_INT_BYTES {
        return Err(TupleError::IntegerOverflow { offset });
    }

    let magnitude = payload[size - significant..]
        .iter()
        .fold(0u128, |acc, &b| (acc << 8) | u128::from(if negative { !b } else { b }));

    let n = if negative {
        if magnitude > i128::MIN.unsigned_abs() {
            return Err(TupleError::IntegerOverflow { offset });
        }
        0i128.wrapping_sub_unsigned(magnitude)
    } else {
        i128::try_from(magnitude).map_err(|_| TupleError::IntegerOverflow { offset })?
    };

    Ok((n, consumed))
}

/// Inverse of the float transform applied by the encoder.
fn decode_float_bits(transformed: u32) -> u32 {
    if transformed & 0x8000_0000 != 0 {
        transformed ^ 0x8000_0000
    } else {
        !transformed
    }
}

fn decode_double_bits(transformed: u64) -> u64 {
    if transformed & 0x8000_0000_0000_0000 != 0 {
        transformed ^ 0x8000_0000_0000_0000
    } else {
        !transformed
    }
}

/// Decode a nested tuple body up to and including its terminator.
fn decode_nested_tuple(data: &[u8], start: usize, depth: u32) -> Result<(Tuple, usize), TupleError> {
    let mut elements = Vec::new();
    let mut i = start;

    while i < data.len() {
        if data[i] == 0x00 {
            if data.get(i + 1) == Some(&NULL_ESCAPE) {
                elements.push(Element::Null);
                i += 2;
            } else {
                return Ok((Tuple::from_elements(elements), i - start + 1));
            }
        } else {
            let (elem, consumed) = decode_element(data, i, depth)?;
            elements.push(elem);
            i += consumed;
        }
    }

    Err(TupleError::UnterminatedNested { offset: start })
}
