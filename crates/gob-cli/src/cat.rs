//! `gob cat`: rebuild a stream from the index on stdin.
//!
//! Data is written to stdout as blocks are fetched. A non-zero exit means
//! whatever reached stdout must be discarded.

use std::io::{self, BufRead, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use gob_store::Trailer;

use crate::open_store;

/// Arguments for `gob cat`.
#[derive(Args, Debug)]
pub struct CatArgs {
    /// Store directory.
    pub dir: PathBuf,
}

/// Execute the cat subcommand on the process's stdin and stdout.
pub fn run_cat(args: &CatArgs) -> Result<u8> {
    let stdin = io::stdin().lock();
    let stdout = BufWriter::new(io::stdout().lock());
    cat_stream(args, stdin, stdout)?;
    Ok(0)
}

/// Read index text from `input` and write the verified stream to `output`.
pub fn cat_stream<R: BufRead, W: Write>(args: &CatArgs, input: R, output: W) -> Result<Trailer> {
    let mut repo = open_store(&args.dir)?;
    let trailer = gob_store::cat(input, &mut repo, output).context("cat failed")?;
    repo.close();
    Ok(trailer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gob_core::Digest;
    use gob_store::{GobConfig, Repository, StoreError};

    fn store_with(data: &[u8]) -> (tempfile::TempDir, CatArgs, String) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("store");
        Repository::init(&root).unwrap();
        let mut repo = Repository::open(&root).unwrap();
        let config = GobConfig::with_block_len(4).unwrap();
        let mut text = Vec::new();
        gob_store::chunk(data, &mut repo, &config, &mut text).unwrap();
        (dir, CatArgs { dir: root }, String::from_utf8(text).unwrap())
    }

    #[test]
    fn writes_original_bytes() {
        let (_dir, args, text) = store_with(b"ABCDEFG");
        let mut out = Vec::new();
        let trailer = cat_stream(&args, text.as_bytes(), &mut out).unwrap();
        assert_eq!(out, b"ABCDEFG");
        assert_eq!(trailer.digest, Digest::compute(b"ABCDEFG"));
    }

    #[test]
    fn verification_failure_is_an_error() {
        let (_dir, args, text) = store_with(b"ABCDEFG");
        let tampered = text.replace(" 7\n", " 9\n");
        let err = cat_stream(&args, tampered.as_bytes(), io::sink()).unwrap_err();

        let store_err = err.downcast_ref::<StoreError>().unwrap();
        assert!(store_err.is_integrity_failure(), "got: {err:#}");
    }
}
