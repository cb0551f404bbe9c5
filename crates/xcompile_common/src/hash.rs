//! Content hashing and compile-cache fingerprints.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use xxhash_rust::xxh3::Xxh3;

/// Length of a hex-encoded fingerprint.
const HEX_LEN: usize = 32;

/// A 128-bit content hash computed using XXH3 over the raw bytes of a file.
///
/// Two files with the same `ContentHash` are assumed to have identical content.
/// The hash alone is never used as a compile-cache key; it is folded together
/// with the active compiler configuration into a [`Fingerprint`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    /// Computes a content hash from a byte slice using XXH3-128.
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = xxhash_rust::xxh3::xxh3_128(data);
        Self(hash.to_le_bytes())
    }

    /// Returns the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(f, &self.0)
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

/// The sole compile-cache key: a digest of a file's bytes and the serialized
/// compiler configuration active for that file's format.
///
/// Identical bytes under identical configuration always produce the same
/// fingerprint, across calls and process restarts. Changing either input
/// produces a different fingerprint, which is how an option change invalidates
/// every artifact previously compiled for that format without touching files.
///
/// Serialized as a 32-character lowercase hex string, which is also the
/// artifact file stem in the on-disk cache.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint([u8; 16]);

impl Fingerprint {
    /// Folds a content hash with a configuration fragment.
    ///
    /// The fragment length is mixed in ahead of the fragment itself so that
    /// no two (content, fragment) pairs share a preimage.
    pub fn new(content: &ContentHash, config_fragment: &[u8]) -> Self {
        let mut hasher = Xxh3::new();
        hasher.update(content.as_bytes());
        hasher.update(&(config_fragment.len() as u64).to_le_bytes());
        hasher.update(config_fragment);
        Self(hasher.digest128().to_le_bytes())
    }

    /// Computes the fingerprint of raw bytes under a configuration fragment.
    pub fn of(data: &[u8], config_fragment: &[u8]) -> Self {
        Self::new(&ContentHash::from_bytes(data), config_fragment)
    }

    /// Returns the lowercase hex encoding used for artifact file names.
    pub fn to_hex(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(f, &self.0)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({:02x}{:02x}{:02x}{:02x}..)", self.0[0], self.0[1], self.0[2], self.0[3])
    }
}

/// Error returned when a string is not a valid hex-encoded [`Fingerprint`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid fingerprint '{0}': expected 32 hex characters")]
pub struct ParseFingerprintError(pub String);

impl FromStr for Fingerprint {
    type Err = ParseFingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != HEX_LEN || !s.is_ascii() {
            return Err(ParseFingerprintError(s.to_string()));
        }
        let mut bytes = [0u8; 16];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16)
                .map_err(|_| ParseFingerprintError(s.to_string()))?;
        }
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = ParseFingerprintError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Fingerprint> for String {
    fn from(fp: Fingerprint) -> Self {
        fp.to_string()
    }
}

fn write_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    for byte in bytes {
        write!(f, "{byte:02x}")?;
    }
    Ok(())
}
