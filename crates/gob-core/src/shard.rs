//! # Shard Identifiers
//!
//! A store spreads its blocks over 256 shard directories, one per possible
//! value of a digest's first byte. [`ShardId`] is that byte; because it is a
//! `u8`, every shard table indexed by [`ShardId::index`] is in bounds by
//! construction.

use std::fmt;

/// Number of shards in a store.
pub const SHARD_COUNT: usize = 256;

/// One of the 256 shard directories, named by two lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShardId(u8);

impl ShardId {
    pub const fn new(byte: u8) -> Self {
        Self(byte)
    }

    /// Parse a shard directory name. Only exactly two lowercase hex
    /// characters are accepted.
    pub fn from_name(name: &str) -> Option<Self> {
        let bytes = name.as_bytes();
        if bytes.len() != 2 {
            return None;
        }
        let hi = hex_value(bytes[0])?;
        let lo = hex_value(bytes[1])?;
        Some(Self((hi << 4) | lo))
    }

    /// The directory name of this shard.
    pub fn name(self) -> String {
        format!("{:02x}", self.0)
    }

    /// Position of this shard in a [`SHARD_COUNT`]-sized table.
    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    pub fn as_byte(self) -> u8 {
        self.0
    }
}

/// Value of one lowercase hex digit.
pub(crate) fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        _ => None,
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}", self.0)
    }
}
