//! Directory layer configuration

use serde::Deserialize;
use serde::Serialize;
use tessera_constants::directory::DEFAULT_NODE_PREFIX;
use tessera_core::DirectoryLayer;

use super::error::ConfigError;

/// First and last type codes of packed integers; allocated prefixes start
/// with one of these when the content prefix is empty.
const INT_CODE_RANGE: std::ops::RangeInclusive<u8> = 0x0B..=0x1D;

/// Where the directory layer keeps its metadata and its allocations.
///
/// Prefixes are written as hex strings in files and environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Prefix of node metadata, the version key and the allocator.
    #[serde(with = "hex_bytes")]
    pub node_prefix: Vec<u8>,
    /// Prefix every allocated directory prefix starts with.
    #[serde(with = "hex_bytes")]
    pub content_prefix: Vec<u8>,
}

impl DirectoryConfig {
    /// Apply `TESSERA_DIRECTORY_*` overrides from `lookup`.
    pub fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(val) = lookup("TESSERA_DIRECTORY_NODE_PREFIX") {
            self.node_prefix = decode_hex("TESSERA_DIRECTORY_NODE_PREFIX", &val)?;
        }
        if let Some(val) = lookup("TESSERA_DIRECTORY_CONTENT_PREFIX") {
            self.content_prefix = decode_hex("TESSERA_DIRECTORY_CONTENT_PREFIX", &val)?;
        }
        Ok(())
    }

    /// Node and content keys must never overlap.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_prefix.is_empty() {
            return Err(ConfigError::invalid("directory.node_prefix", "", "must not be empty"));
        }

        if self.content_prefix.is_empty() {
            if INT_CODE_RANGE.contains(&self.node_prefix[0]) {
                return Err(ConfigError::invalid(
                    "directory.node_prefix",
                    hex::encode(&self.node_prefix),
                    "collides with allocated prefixes under an empty content prefix",
                ));
            }
            return Ok(());
        }

        if self.node_prefix.starts_with(&self.content_prefix) || self.content_prefix.starts_with(&self.node_prefix) {
            return Err(ConfigError::invalid(
                "directory.content_prefix",
                hex::encode(&self.content_prefix),
                format!("overlaps node prefix {}", hex::encode(&self.node_prefix)),
            ));
        }
        Ok(())
    }

    /// Directory layer over the configured prefixes.
    pub fn layer(&self) -> DirectoryLayer {
        DirectoryLayer::with_prefixes(self.node_prefix.clone(), self.content_prefix.clone())
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            node_prefix: vec![DEFAULT_NODE_PREFIX],
            content_prefix: Vec::new(),
        }
    }
}

fn decode_hex(key: &str, value: &str) -> Result<Vec<u8>, ConfigError> {
    hex::decode(value.trim()).map_err(|e| ConfigError::invalid(key, value, format!("must be hex: {e}")))
}

mod hex_bytes {
    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        hex::decode(encoded.trim()).map_err(serde::de::Error::custom)
    }
}
