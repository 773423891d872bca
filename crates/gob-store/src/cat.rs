//! # Concatenation (decode and verify path)
//!
//! Reads an index, fetches every listed block in order, writes the blocks
//! to the output and checks the reassembled stream against the trailer.
//!
//! ## Verification
//!
//! Two independent checks run after the last block, and both are always
//! evaluated:
//!
//! - the total number of bytes actually read must equal the trailer length;
//! - the digest of those bytes must equal the trailer digest.
//!
//! The length check is based on what was read, not on a block count derived
//! from the trailer, so it also catches a block file of the wrong size.
//!
//! Output is written as blocks arrive. When verification fails the output
//! has already received the bad data; callers must treat it as invalid.

use std::io::{BufRead, Write};

use gob_core::{Digest, StreamHasher};

use crate::error::StoreError;
use crate::index::{Index, Trailer};
use crate::repository::Repository;

/// Parse index text from `input` and reconstruct its stream into `output`.
///
/// The whole index is parsed before any block is fetched, so malformed
/// input fails without touching the repository.
pub fn cat<R: BufRead, W: Write>(
    input: R,
    repo: &mut Repository,
    output: W,
) -> Result<Trailer, StoreError> {
    let index = Index::parse(input)?;
    reassemble(&index, repo, output)?;
    Ok(index.trailer)
}

/// Write the blocks named by `index` to `output` and verify the result.
///
/// Returns the number of bytes written. A missing block aborts the whole
/// operation.
pub fn reassemble<W: Write>(
    index: &Index,
    repo: &mut Repository,
    mut output: W,
) -> Result<u64, StoreError> {
    let mut hasher = StreamHasher::new();
    let mut total: u64 = 0;

    for digest in &index.blocks {
        let block = repo.get(digest)?;
        hasher.update(&block);
        output.write_all(&block)?;
        total += block.len() as u64;
    }
    output.flush()?;

    verify(&index.trailer, total, hasher.finalize())?;
    tracing::info!(blocks = index.blocks.len(), length = total, "reassembled stream");
    Ok(total)
}

fn verify(trailer: &Trailer, actual_len: u64, computed: Digest) -> Result<(), StoreError> {
    let size_ok = actual_len == trailer.length;
    let hash_ok = computed == trailer.digest;

    match (size_ok, hash_ok) {
        (true, true) => Ok(()),
        (false, true) => {
            tracing::debug!(expected = trailer.length, actual = actual_len, "size mismatch");
            Err(StoreError::SizeMismatch {
                expected: trailer.length,
                actual: actual_len,
            })
        }
        (true, false) => {
            tracing::debug!(expected = %trailer.digest, %computed, "hash mismatch");
            Err(StoreError::HashMismatch {
                expected: trailer.digest.clone(),
                computed,
            })
        }
        (false, false) => {
            tracing::debug!(
                expected_len = trailer.length,
                actual_len,
                expected = %trailer.digest,
                %computed,
                "size and hash mismatch"
            );
            Err(StoreError::SizeAndHashMismatch {
                expected_len: trailer.length,
                actual_len,
                expected: trailer.digest.clone(),
                computed,
            })
        }
    }
}
