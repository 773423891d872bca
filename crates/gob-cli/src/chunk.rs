//! `gob chunk`: store stdin as blocks and print its index.

use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use gob_store::{GobConfig, Trailer};

use crate::open_store;

/// Arguments for `gob chunk`.
#[derive(Args, Debug)]
pub struct ChunkArgs {
    /// Store directory.
    pub dir: PathBuf,
}

/// Execute the chunk subcommand on the process's stdin and stdout.
pub fn run_chunk(args: &ChunkArgs, config: &GobConfig) -> Result<u8> {
    let stdin = io::stdin().lock();
    let stdout = BufWriter::new(io::stdout().lock());
    chunk_stream(args, config, stdin, stdout)?;
    Ok(0)
}

/// Chunk `input` into the store, streaming the index text to `output`.
pub fn chunk_stream<R: Read, W: Write>(
    args: &ChunkArgs,
    config: &GobConfig,
    input: R,
    output: W,
) -> Result<Trailer> {
    let mut repo = open_store(&args.dir)?;
    let trailer = gob_store::chunk(input, &mut repo, config, output).context("chunk failed")?;
    repo.close();
    Ok(trailer)
}
