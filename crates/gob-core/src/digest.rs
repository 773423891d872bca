//! # Block Digests
//!
//! Defines [`Digest`], the fixed-length content identifier of every block in a
//! gob store, and [`StreamHasher`], the incremental accumulator used for
//! whole-stream digests.
//!
//! ## Invariants
//!
//! - A `Digest` always holds exactly [`HASH_LEN`] bytes and a lowercase hex
//!   rendering of those bytes. Both are fixed at construction and never
//!   change afterwards.
//! - Equality, ordering and hashing are defined on the binary form only.
//! - [`Digest::from_hex`] accepts only canonical input: exactly
//!   `2 * HASH_LEN` characters from `[0-9a-f]`. Uppercase is rejected so that
//!   two different strings can never name the same block.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest as _, Sha256};

use crate::error::DigestError;
use crate::shard::{hex_value, ShardId};

/// Length of a digest in bytes.
pub const HASH_LEN: usize = 32;

/// Length of a digest rendered as hex.
pub const HEX_LEN: usize = HASH_LEN * 2;

const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";

/// A SHA-256 digest identifying a block or a whole stream.
#[derive(Clone)]
pub struct Digest {
    bytes: [u8; HASH_LEN],
    hex: String,
}

impl Digest {
    /// Hash `data` in one shot.
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = StreamHasher::new();
        hasher.update(data);
        hasher.finalize()
    }

    /// Wrap a pre-computed binary digest.
    pub fn from_bytes(bytes: [u8; HASH_LEN]) -> Self {
        let mut hex = String::with_capacity(HEX_LEN);
        for b in bytes {
            hex.push(char::from(HEX_CHARS[usize::from(b >> 4)]));
            hex.push(char::from(HEX_CHARS[usize::from(b & 0x0f)]));
        }
        Self { bytes, hex }
    }

    /// Parse a canonical lowercase hex digest.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError::InvalidEncoding`] if `s` is not exactly
    /// [`HEX_LEN`] characters long or contains anything outside `[0-9a-f]`.
    pub fn from_hex(s: &str) -> Result<Self, DigestError> {
        if s.len() != HEX_LEN {
            return Err(DigestError::InvalidEncoding {
                reason: format!("expected {HEX_LEN} hex characters, got {}", s.len()),
            });
        }

        let mut bytes = [0u8; HASH_LEN];
        for (i, pair) in s.as_bytes().chunks_exact(2).enumerate() {
            let hi = nibble(pair[0], i * 2)?;
            let lo = nibble(pair[1], i * 2 + 1)?;
            bytes[i] = (hi << 4) | lo;
        }

        Ok(Self {
            bytes,
            hex: s.to_owned(),
        })
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.bytes
    }

    /// The lowercase hex rendering.
    pub fn as_hex(&self) -> &str {
        &self.hex
    }

    /// The shard this digest is stored under, selected by its first byte.
    pub fn shard(&self) -> ShardId {
        ShardId::new(self.bytes[0])
    }

    /// The hex characters after the shard prefix; used as the block file name.
    pub fn tail(&self) -> &str {
        &self.hex[2..]
    }
}

fn nibble(c: u8, position: usize) -> Result<u8, DigestError> {
    hex_value(c).ok_or_else(|| DigestError::InvalidEncoding {
        reason: format!(
            "invalid character {:?} at position {position}",
            char::from(c)
        ),
    })
}

impl PartialEq for Digest {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for Digest {}

impl PartialOrd for Digest {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Digest {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bytes.cmp(&other.bytes)
    }
}

impl Hash for Digest {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bytes.hash(state);
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.hex)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex)
    }
}

impl std::str::FromStr for Digest {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; HASH_LEN]> for Digest {
    fn from(bytes: [u8; HASH_LEN]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.hex)
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

/// Incremental hash state: `new`, any number of `update`s, then `finalize`.
///
/// `finalize` consumes the state, so a finished accumulator cannot be fed
/// again.
#[derive(Clone, Default)]
pub struct StreamHasher {
    inner: Sha256,
}

impl StreamHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    pub fn finalize(self) -> Digest {
        let mut bytes = [0u8; HASH_LEN];
        bytes.copy_from_slice(&self.inner.finalize());
        Digest::from_bytes(bytes)
    }
}

impl fmt::Debug for StreamHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamHasher").finish_non_exhaustive()
    }
}
