//! # Chunking (encode path)
//!
//! Splits an input stream into fixed-size blocks, stores each block in the
//! repository and writes the index text that reassembles the stream.
//!
//! All blocks but the last are exactly `block_len` bytes. The last block is
//! whatever remains, and an empty stream produces no blocks at all, only a
//! trailer for zero bytes.
//!
//! Each index line is written as soon as its block is stored, so memory use
//! does not grow with the length of the stream.

use std::io::{Read, Write};

use gob_core::StreamHasher;

use crate::config::GobConfig;
use crate::error::StoreError;
use crate::index::Trailer;
use crate::io::read_full;
use crate::repository::Repository;

/// Chunk `input` into `repo`, writing index text to `output`.
///
/// Returns the trailer, which is also the last line written.
///
/// # Errors
///
/// [`StoreError::Stream`] if the input cannot be read to completion or the
/// output cannot be written, or any error from [`Repository::put`]. Blocks
/// stored and lines written before the failure are not undone; output
/// without a trailer line is not a valid index.
pub fn chunk<R: Read, W: Write>(
    mut input: R,
    repo: &mut Repository,
    config: &GobConfig,
    mut output: W,
) -> Result<Trailer, StoreError> {
    let mut buf = vec![0u8; config.block_len()];
    let mut hasher = StreamHasher::new();
    let mut blocks: u64 = 0;
    let mut length: u64 = 0;

    loop {
        let n = read_full(&mut input, &mut buf)?;
        if n == 0 {
            break;
        }

        let block = &buf[..n];
        hasher.update(block);
        let digest = repo.put(block)?;
        writeln!(output, "{digest}")?;
        blocks += 1;
        length += n as u64;

        if n < buf.len() {
            break;
        }
    }

    let trailer = Trailer {
        digest: hasher.finalize(),
        length,
    };
    writeln!(output, "{trailer}")?;
    output.flush()?;

    tracing::info!(blocks, length, digest = %trailer.digest, "chunked stream");
    Ok(trailer)
}
