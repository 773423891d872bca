//! # gob CLI entry point
//!
//! Parses command-line arguments, installs logging and dispatches to the
//! subcommand handlers.

use std::io::IsTerminal;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gob_cli::cat::{run_cat, CatArgs};
use gob_cli::chunk::{run_chunk, ChunkArgs};
use gob_cli::fsck::{run_fsck, FsckArgs};
use gob_cli::init::{run_init, InitArgs};
use gob_cli::resolve_config;

/// `--version` output with the fixed storage parameters.
const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\nhash: SHA-256, 32-byte digests",
    "\ndefault block length: 4096 bytes (set with --block-len or GOB_BLOCK_LEN)",
);

/// gob: a content-addressed block store.
///
/// Splits streams into fixed-size blocks named by their SHA-256 digest,
/// rebuilds them from an index with end-to-end verification, and checks
/// stores for corruption.
#[derive(Parser, Debug)]
#[command(name = "gob", version, long_version = LONG_VERSION, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Block length in bytes used by `chunk` (overrides GOB_BLOCK_LEN).
    #[arg(long, global = true, value_name = "BYTES")]
    block_len: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new, empty store.
    Init(InitArgs),

    /// Store stdin as blocks and print its index on stdout.
    Chunk(ChunkArgs),

    /// Rebuild a stream from the index on stdin and verify it.
    Cat(CatArgs),

    /// Check every block in a store against its name.
    Fsck(FsckArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG takes precedence over -v.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .init();

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "gob starting");

    let result = resolve_config(cli.block_len).and_then(|config| match &cli.command {
        Commands::Init(args) => run_init(args),
        Commands::Chunk(args) => run_chunk(args, &config),
        Commands::Cat(args) => run_cat(args),
        Commands::Fsck(args) => run_fsck(args),
    });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
