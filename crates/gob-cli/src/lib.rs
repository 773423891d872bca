//! # gob-cli: Command-Line Interface for gob Stores
//!
//! Provides the `gob` binary. Each subcommand takes the store directory as
//! its only positional argument:
//!
//! ```bash
//! gob init store/
//! gob chunk store/ < disk.img > disk.idx
//! gob cat store/ < disk.idx > restored.img
//! gob fsck store/
//! ```
//!
//! Stdout carries only index text or reconstructed data. Logs and fsck
//! findings go to stderr.
//!
//! ## Exit Codes
//!
//! - `0`: success.
//! - `1`: any error, including a verification failure in `cat` or a finding
//!   in `fsck`.

pub mod cat;
pub mod chunk;
pub mod fsck;
pub mod init;

use std::path::Path;

use anyhow::{Context, Result};
use gob_store::{GobConfig, Repository};

/// Open the store at `dir`, attaching the path to any error.
pub fn open_store(dir: &Path) -> Result<Repository> {
    Repository::open(dir).with_context(|| format!("cannot open store {}", dir.display()))
}

/// Build the effective configuration: an explicit `--block-len` wins over
/// the environment, which wins over the default.
pub fn resolve_config(block_len: Option<usize>) -> Result<GobConfig> {
    match block_len {
        Some(len) => GobConfig::with_block_len(len).context("invalid --block-len"),
        None => GobConfig::from_env().context("invalid block length in environment"),
    }
}
