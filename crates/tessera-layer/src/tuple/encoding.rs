use super::BYTES_CODE;
use super::DOUBLE_CODE;
use super::FALSE_CODE;
use super::FLOAT_CODE;
use super::INT_ZERO_CODE;
use super::MAX_FIXED_INT_BYTES;
use super::NEG_INT_BIG_CODE;
use super::NESTED_CODE;
use super::NULL_CODE;
use super::NULL_ESCAPE;
use super::POS_INT_BIG_CODE;
use super::STRING_CODE;
use super::TRUE_CODE;
use super::UUID_CODE;
use super::VERSIONSTAMP_CODE;
use super::element::Element;

// =============================================================================
// Encoder
// =============================================================================

/// Appends element encodings to a buffer.
///
/// Tracks the buffer offset of every incomplete versionstamp's commit-version
/// bytes so callers can emit a versionstamped key.
pub(super) struct Encoder<'a> {
    buf: &'a mut Vec<u8>,
    incomplete_offsets: Vec<usize>,
}

impl<'a> Encoder<'a> {
    pub(super) fn new(buf: &'a mut Vec<u8>) -> Self {
        Self {
            buf,
            incomplete_offsets: Vec::new(),
        }
    }

    /// Offsets (into the buffer) of incomplete versionstamp payloads written so far.
    pub(super) fn incomplete_offsets(&self) -> &[usize] {
        &self.incomplete_offsets
    }

    pub(super) fn element(&mut self, element: &Element, nested: bool) {
        match element {
            Element::Null => {
                self.buf.push(NULL_CODE);
                if nested {
                    self.buf.push(NULL_ESCAPE);
                }
            }
            Element::Bytes(b) => {
                self.buf.push(BYTES_CODE);
                encode_escaped(self.buf, b);
            }
            Element::String(s) => {
                self.buf.push(STRING_CODE);
                encode_escaped(self.buf, s.as_bytes());
            }
            Element::Tuple(t) => {
                self.buf.push(NESTED_CODE);
                for child in t.iter() {
                    self.element(child, true);
                }
                self.buf.push(0x00);
            }
            Element::Int(n) => encode_int(self.buf, *n),
            Element::Float(f) => {
                self.buf.push(FLOAT_CODE);
                self.buf.extend_from_slice(&encode_float_bits(f.to_bits()).to_be_bytes());
            }
            Element::Double(d) => {
                self.buf.push(DOUBLE_CODE);
                self.buf.extend_from_slice(&encode_double_bits(d.to_bits()).to_be_bytes());
            }
            Element::Bool(b) => self.buf.push(if *b { TRUE_CODE } else { FALSE_CODE }),
            Element::Uuid(u) => {
                self.buf.push(UUID_CODE);
                self.buf.extend_from_slice(u.as_bytes());
            }
            Element::Versionstamp(vs) => {
                self.buf.push(VERSIONSTAMP_CODE);
                if !vs.is_complete() {
                    self.incomplete_offsets.push(self.buf.len());
                }
                self.buf.extend_from_slice(vs.as_bytes());
            }
        }
    }
}

// =============================================================================
// Primitive Encoders
// =============================================================================

/// Write bytes with `0x00` escaped as `0x00 0xFF`, followed by a `0x00` terminator.
fn encode_escaped(buf: &mut Vec<u8>, data: &[u8]) {
    for &b in data {
        buf.push(b);
        if b == 0x00 {
            buf.push(NULL_ESCAPE);
        }
    }
    buf.push(0x00);
}

/// Number of bytes needed to hold `magnitude` big-endian (0 for zero).
fn byte_len(magnitude: u128) -> usize {
    16 - (magnitude.leading_zeros() as usize / 8)
}

/// Encode an integer.
///
/// Magnitudes up to 8 bytes use the fixed-width codes around `0x14`. Wider
/// magnitudes use `0x1D`/`0x0B` with an explicit length byte, which sorts
/// outside every fixed-width code.
fn encode_int(buf: &mut Vec<u8>, n: i128) {
    if n == 0 {
        buf.push(INT_ZERO_CODE);
        return;
    }

    let magnitude = n.unsigned_abs();
    let len = byte_len(magnitude);
    let be = magnitude.to_be_bytes();
    let payload = &be[16 - len..];

    if n > 0 {
        if len <= MAX_FIXED_INT_BYTES {
            buf.push(INT_ZERO_CODE + len as u8);
        } else {
            buf.push(POS_INT_BIG_CODE);
            buf.push(len as u8);
        }
        buf.extend_from_slice(payload);
    } else {
        if len <= MAX_FIXED_INT_BYTES {
            buf.push(INT_ZERO_CODE - len as u8);
        } else {
            buf.push(NEG_INT_BIG_CODE);
            buf.push(len as u8 ^ 0xFF);
        }
        // One's complement within `len` bytes.
        buf.extend(payload.iter().map(|b| !b));
    }
}

/// Negative floats have every bit flipped; non-negative floats have only the
/// sign bit flipped. The result compares as an unsigned big-endian integer in
/// IEEE total order.
pub(super) fn encode_float_bits(bits: u32) -> u32 {
    if bits & 0x8000_0000 != 0 { !bits } else { bits ^ 0x8000_0000 }
}

pub(super) fn encode_double_bits(bits: u64) -> u64 {
    if bits & 0x8000_0000_0000_0000 != 0 {
        !bits
    } else {
        bits ^ 0x8000_0000_0000_0000
    }
}
