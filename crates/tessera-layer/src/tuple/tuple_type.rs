use super::TupleError;
use super::decoding::decode_element;
use super::element::Element;
use super::encoding::Encoder;

// =============================================================================
// Tuple Type
// =============================================================================

/// An ordered, immutable sequence of typed elements that packs into an
/// order-preserving key.
///
/// `Ord` on tuples is element-wise, with a proper prefix sorting first, and
/// agrees with byte-wise comparison of the packed forms.
///
/// # Example
///
/// ```
/// use tessera_layer::Tuple;
///
/// let t1 = Tuple::new().push("users").push(1i64);
/// let t2 = Tuple::new().push("users").push(2i64);
///
/// assert!(t1 < t2);
/// assert!(t1.pack() < t2.pack());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Tuple {
    elements: Vec<Element>,
}

impl Tuple {
    /// Create a new empty tuple.
    pub fn new() -> Self {
        Self { elements: Vec::new() }
    }

    pub fn from_elements(elements: Vec<Element>) -> Self {
        Self { elements }
    }

    /// Return a tuple extended with one more element (builder pattern).
    pub fn push<E: Into<Element>>(mut self, element: E) -> Self {
        self.elements.push(element.into());
        self
    }

    /// Concatenate two tuples.
    pub fn concat(&self, other: &Tuple) -> Tuple {
        let mut elements = Vec::with_capacity(self.len() + other.len());
        elements.extend_from_slice(&self.elements);
        elements.extend_from_slice(&other.elements);
        Tuple { elements }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Element> {
        self.elements.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter()
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn into_elements(self) -> Vec<Element> {
        self.elements
    }

    /// Whether any element, at any nesting depth, is an incomplete versionstamp.
    pub fn has_incomplete_versionstamp(&self) -> bool {
        self.elements.iter().any(Element::has_incomplete_versionstamp)
    }

    // =========================================================================
    // Encoding
    // =========================================================================

    /// Pack the tuple into bytes.
    ///
    /// Incomplete versionstamps are written with their placeholder bytes; use
    /// [`try_pack`](Self::try_pack) to reject them, or
    /// [`pack_with_versionstamp`](Self::pack_with_versionstamp) to write them
    /// as versionstamped keys.
    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.elements.len() * 8);
        self.pack_into(&mut buf);
        buf
    }

    /// Pack the tuple into an existing buffer.
    pub fn pack_into(&self, buf: &mut Vec<u8>) {
        let mut encoder = Encoder::new(buf);
        for elem in &self.elements {
            encoder.element(elem, false);
        }
    }

    /// Pack the tuple, failing if it holds an incomplete versionstamp.
    pub fn try_pack(&self) -> Result<Vec<u8>, TupleError> {
        if self.has_incomplete_versionstamp() {
            return Err(TupleError::UnsupportedValue {
                reason: "incomplete versionstamp requires pack_with_versionstamp".to_string(),
            });
        }
        Ok(self.pack())
    }

    /// Pack `prefix` followed by this tuple as a versionstamped key.
    ///
    /// The tuple must hold exactly one incomplete versionstamp. The result is
    /// the key bytes followed by the 4-byte little-endian offset of that
    /// versionstamp's commit-version bytes, which the store overwrites at commit.
    pub fn pack_with_versionstamp(&self, prefix: &[u8]) -> Result<Vec<u8>, TupleError> {
        let mut buf = prefix.to_vec();
        let mut encoder = Encoder::new(&mut buf);
        for elem in &self.elements {
            encoder.element(elem, false);
        }
        let offsets = encoder.incomplete_offsets().to_vec();

        let offset = match offsets.as_slice() {
            [single] => *single,
            [] => {
                return Err(TupleError::UnsupportedValue {
                    reason: "no incomplete versionstamp in tuple".to_string(),
                });
            }
            _ => {
                return Err(TupleError::UnsupportedValue {
                    reason: format!("{} incomplete versionstamps in tuple, expected one", offsets.len()),
                });
            }
        };
        let offset = u32::try_from(offset).map_err(|_| TupleError::UnsupportedValue {
            reason: "versionstamp offset exceeds u32".to_string(),
        })?;
        buf.extend_from_slice(&offset.to_le_bytes());
        Ok(buf)
    }

    // =========================================================================
    // Decoding
    // =========================================================================

    /// Unpack a tuple, requiring every byte of `data` to be consumed.
    pub fn unpack(data: &[u8]) -> Result<Self, TupleError> {
        let mut elements = Vec::new();
        let mut offset = 0;

        while offset < data.len() {
            let (elem, consumed) = decode_element(data, offset, 0)?;
            elements.push(elem);
            offset += consumed;
        }

        Ok(Tuple { elements })
    }

    /// Decode only the first `count` elements of `data`.
    ///
    /// Returns the decoded prefix and the number of bytes it occupied. The
    /// remaining bytes are not inspected.
    pub fn unpack_prefix(data: &[u8], count: usize) -> Result<(Self, usize), TupleError> {
        let mut elements = Vec::with_capacity(count);
        let mut offset = 0;

        for _ in 0..count {
            let (elem, consumed) = decode_element(data, offset, 0)?;
            elements.push(elem);
            offset += consumed;
        }

        Ok((Tuple { elements }, offset))
    }

    // =========================================================================
    // Ranges
    // =========================================================================

    /// Key range holding every tuple that strictly extends this one.
    ///
    /// Returns `(pack + 0x00, pack + 0xFF)`. The packed tuple itself is not
    /// included.
    pub fn range(&self) -> (Vec<u8>, Vec<u8>) {
        let packed = self.pack();
        let mut start = packed.clone();
        start.push(0x00);
        let mut end = packed;
        end.push(0xFF);
        (start, end)
    }

    /// Smallest key greater than every key starting with this packed tuple.
    pub fn strinc(&self) -> Option<Vec<u8>> {
        super::strinc(&self.pack())
    }
}

impl FromIterator<Element> for Tuple {
    fn from_iter<I: IntoIterator<Item = Element>>(iter: I) -> Self {
        Tuple {
            elements: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<Element>> for Tuple {
    fn from(elements: Vec<Element>) -> Self {
        Tuple { elements }
    }
}

impl IntoIterator for Tuple {
    type Item = Element;
    type IntoIter = std::vec::IntoIter<Element>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter()
    }
}

impl<'a> IntoIterator for &'a Tuple {
    type Item = &'a Element;
    type IntoIter = std::slice::Iter<'a, Element>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}
