use std::fmt;

use super::TupleError;

/// Length of the commit-version half of a versionstamp.
pub const TR_VERSION_LEN: usize = 10;

/// Total encoded length of a versionstamp payload.
pub const VERSIONSTAMP_LEN: usize = 12;

/// Placeholder commit version used until the store assigns a real one.
const INCOMPLETE_TR_VERSION: [u8; TR_VERSION_LEN] = [0xFF; TR_VERSION_LEN];

/// A 12-byte commit-ordered stamp: 10 bytes assigned by the store at commit
/// plus a 2-byte user version for ordering within one transaction.
///
/// An *incomplete* versionstamp carries the all-`0xFF` placeholder instead of
/// a commit version. It can only be written through
/// [`Tuple::pack_with_versionstamp`](super::Tuple::pack_with_versionstamp),
/// which records where the store must fill in the real value.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Versionstamp {
    bytes: [u8; VERSIONSTAMP_LEN],
}

impl Versionstamp {
    /// A versionstamp with a store-assigned commit version.
    ///
    /// The all-zero and all-`0xFF` commit versions are reserved and rejected.
    pub fn complete(tr_version: [u8; TR_VERSION_LEN], user_version: u16) -> Result<Self, TupleError> {
        if tr_version == INCOMPLETE_TR_VERSION || tr_version == [0u8; TR_VERSION_LEN] {
            return Err(TupleError::UnsupportedValue {
                reason: "reserved commit version in complete versionstamp".to_string(),
            });
        }
        Ok(Self::from_parts(tr_version, user_version))
    }

    /// A placeholder whose commit version is filled in at commit.
    pub fn incomplete(user_version: u16) -> Self {
        Self::from_parts(INCOMPLETE_TR_VERSION, user_version)
    }

    /// Rebuild a versionstamp from its 12 encoded bytes.
    pub fn from_bytes(bytes: [u8; VERSIONSTAMP_LEN]) -> Self {
        Self { bytes }
    }

    fn from_parts(tr_version: [u8; TR_VERSION_LEN], user_version: u16) -> Self {
        let mut bytes = [0u8; VERSIONSTAMP_LEN];
        bytes[..TR_VERSION_LEN].copy_from_slice(&tr_version);
        bytes[TR_VERSION_LEN..].copy_from_slice(&user_version.to_be_bytes());
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; VERSIONSTAMP_LEN] {
        &self.bytes
    }

    pub fn tr_version(&self) -> &[u8] {
        &self.bytes[..TR_VERSION_LEN]
    }

    pub fn user_version(&self) -> u16 {
        u16::from_be_bytes([self.bytes[TR_VERSION_LEN], self.bytes[TR_VERSION_LEN + 1]])
    }

    pub fn is_complete(&self) -> bool {
        self.bytes[..TR_VERSION_LEN] != INCOMPLETE_TR_VERSION
    }
}

impl fmt::Debug for Versionstamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_complete() {
            write!(f, "Versionstamp(")?;
            for b in self.tr_version() {
                write!(f, "{b:02x}")?;
            }
            write!(f, ":{})", self.user_version())
        } else {
            write!(f, "Versionstamp(<incomplete>:{})", self.user_version())
        }
    }
}
