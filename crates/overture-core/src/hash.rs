//! Hashing: version `uid`s, provider digests and BLAKE3 content hashes.

use md5::Md5;
use sha2::{Digest, Sha256};
use std::fmt;

/// Deterministic 32-bit id of a version entry.
///
/// Computed as the first four bytes of `MD5(name ‖ version ‖ time)` read
/// little-endian, so rebuilding an unchanged entry reproduces the same id.
#[must_use]
pub fn version_uid(name: &str, version: &str, time: &str) -> u32 {
    let mut hasher = Md5::new();
    hasher.update(name.as_bytes());
    hasher.update(version.as_bytes());
    hasher.update(time.as_bytes());
    let digest = hasher.finalize();
    u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]])
}

/// Lowercase hex SHA-256 of a serialized document, as used for `%hash%`
/// substitution in provider URLs.
#[must_use]
pub fn provider_digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// A BLAKE3 content hash (32 bytes), used to tell whether a rebuilt document
/// differs from the cached one.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Hash bytes.
    #[must_use]
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Convert to hex string.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.to_hex())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
