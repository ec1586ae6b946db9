//! Persistent form of directory nodes and the layer version key.

use tessera_constants::directory::DIRECTORY_VERSION;
use tessera_layer::Element;
use tessera_layer::Tuple;

use super::DirectoryError;

/// Metadata stored for one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Node {
    /// Allocated content prefix.
    pub(super) prefix: Vec<u8>,
    /// Opaque tag naming the structure that owns the directory.
    pub(super) layer: Option<String>,
}

impl Node {
    pub(super) fn encode(&self) -> Vec<u8> {
        Tuple::new().push(self.prefix.clone()).push(self.layer.clone()).pack()
    }

    pub(super) fn decode(path: &[String], raw: &[u8]) -> Result<Self, DirectoryError> {
        let corrupted = |reason: String| DirectoryError::CorruptedMetadata {
            path: path.to_vec(),
            reason,
        };

        let tuple = Tuple::unpack(raw).map_err(|e| corrupted(format!("node value is not a tuple: {e}")))?;
        if tuple.len() != 2 {
            return Err(corrupted(format!("node value has {} fields, expected 2", tuple.len())));
        }

        let prefix = match tuple.get(0) {
            Some(Element::Bytes(prefix)) => prefix.clone(),
            other => return Err(corrupted(format!("prefix field is {other:?}"))),
        };
        let layer = match tuple.get(1) {
            Some(Element::Null) => None,
            Some(Element::String(layer)) => Some(layer.clone()),
            other => return Err(corrupted(format!("layer field is {other:?}"))),
        };

        Ok(Self { prefix, layer })
    }
}

/// Value of the version key written by this implementation.
pub(super) fn encode_version() -> Vec<u8> {
    let (major, minor, patch) = DIRECTORY_VERSION;
    Tuple::new().push(major).push(minor).push(patch).pack()
}

/// Decode a stored `(major, minor, patch)` version.
pub(super) fn decode_version(raw: &[u8]) -> Result<(u32, u32, u32), DirectoryError> {
    let corrupted = |reason: String| DirectoryError::CorruptedMetadata {
        path: Vec::new(),
        reason,
    };

    let tuple = Tuple::unpack(raw).map_err(|e| corrupted(format!("version is not a tuple: {e}")))?;
    let parts: Vec<u32> = tuple.iter().filter_map(|e| e.as_int().and_then(|v| u32::try_from(v).ok())).collect();
    match parts.as_slice() {
        [major, minor, patch] if tuple.len() == 3 => Ok((*major, *minor, *patch)),
        _ => Err(corrupted(format!("invalid version tuple {tuple:?}"))),
    }
}

/// `major.minor.patch` rendering for error messages.
pub(super) fn format_version((major, minor, patch): (u32, u32, u32)) -> String {
    format!("{major}.{minor}.{patch}")
}
