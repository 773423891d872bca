//! # Store Error Types
//!
//! Structured errors for repository, chunk and cat operations. Uses
//! `thiserror` for ergonomic definitions with diagnostic context.
//!
//! Variants fall into four groups:
//!
//! - **format**: malformed input (`InvalidEncoding`, `MalformedTrailer`);
//! - **consistency**: the reconstructed stream disagrees with its trailer
//!   (`HashMismatch`, `SizeMismatch`, `SizeAndHashMismatch`);
//! - **store**: structural problems with the repository itself;
//! - **I/O**: everything the operating system reports, with the path or
//!   stream that failed.
//!
//! Scanner findings are not errors; see [`Finding`](crate::fsck::Finding).

use std::path::PathBuf;

use gob_core::{Digest, DigestError, ShardId};
use thiserror::Error;

/// Errors from gob store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// An index line is not a valid digest.
    #[error("invalid index line {line}: {source}")]
    InvalidEncoding {
        /// 1-based line number in the index text.
        line: usize,
        #[source]
        source: DigestError,
    },

    /// The trailer line is missing or malformed.
    #[error("malformed trailer: {reason}")]
    MalformedTrailer { reason: String },

    /// The reassembled stream has the right length but the wrong digest.
    #[error("hash mismatch: trailer says {expected}, stream hashes to {computed}")]
    HashMismatch { expected: Digest, computed: Digest },

    /// The reassembled stream has the wrong length.
    #[error("size mismatch: trailer says {expected} bytes, stream has {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    /// Both the length and the digest of the reassembled stream are wrong.
    #[error(
        "size and hash mismatch: trailer says {expected_len} bytes hashing to {expected}, \
         stream has {actual_len} bytes hashing to {computed}"
    )]
    SizeAndHashMismatch {
        expected_len: u64,
        actual_len: u64,
        expected: Digest,
        computed: Digest,
    },

    /// The repository path does not exist.
    #[error("store not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The repository path exists but is not a directory.
    #[error("store is not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },

    /// `init` was pointed at a path that already exists.
    #[error("path exists already: {}", path.display())]
    AlreadyExists { path: PathBuf },

    /// The store's version file names a format this build cannot read.
    #[error("unsupported store version {found} (expected {expected})")]
    VersionMismatch { expected: u32, found: u32 },

    /// The store has no version file.
    #[error("store has no version file: {}", path.display())]
    MissingVersion { path: PathBuf },

    /// The version file exists but is not exactly four bytes.
    #[error("corrupt version file {}: expected 4 bytes, found {len}", path.display())]
    CorruptVersion { path: PathBuf, len: u64 },

    /// A block was requested from a shard directory that does not exist.
    #[error("shard {shard} not found")]
    ShardNotFound { shard: ShardId },

    /// A shard path exists but is not a directory.
    #[error("shard {shard} is not a directory")]
    ShardNotADirectory { shard: ShardId },

    /// The requested block is not in the store.
    #[error("block {digest} not found")]
    BlockNotFound { digest: Digest },

    /// A stored block file is larger than any block the store accepts.
    #[error("block {digest} is {len} bytes, larger than the {max} byte limit")]
    BlockTooLarge { digest: Digest, len: u64, max: u64 },

    /// Filesystem operation failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading the input stream or writing the output stream failed.
    #[error("stream I/O error: {0}")]
    Stream(#[from] std::io::Error),
}

impl StoreError {
    /// Build a closure that attaches `path` to an `io::Error`, for use with
    /// `map_err`.
    pub(crate) fn io_at(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }

    /// Whether this error means the data did not match its trailer.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            Self::HashMismatch { .. } | Self::SizeMismatch { .. } | Self::SizeAndHashMismatch { .. }
        )
    }

    /// Whether this error was caused by malformed input text.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidEncoding { .. } | Self::MalformedTrailer { .. }
        )
    }
}
