//! `gob init`: create an empty store.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use gob_core::HASH_LEN;
use gob_store::{Repository, STORE_VERSION};

/// Arguments for `gob init`.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory to create. Must not exist yet.
    pub dir: PathBuf,
}

/// Execute the init subcommand.
pub fn run_init(args: &InitArgs) -> Result<u8> {
    Repository::init(&args.dir)
        .with_context(|| format!("cannot initialize store {}", args.dir.display()))?;

    tracing::info!(
        dir = %args.dir.display(),
        version = STORE_VERSION,
        hash_len = HASH_LEN,
        "store ready"
    );
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_openable_store() {
        let dir = tempfile::tempdir().unwrap();
        let args = InitArgs {
            dir: dir.path().join("store"),
        };
        assert_eq!(run_init(&args).unwrap(), 0);
        assert!(Repository::open(&args.dir).is_ok());
    }

    #[test]
    fn refuses_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let args = InitArgs {
            dir: dir.path().to_path_buf(),
        };
        assert!(run_init(&args).is_err());
    }
}
