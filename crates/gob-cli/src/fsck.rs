//! `gob fsck`: scan a store and report every problem found.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use gob_store::ScanReport;

use crate::open_store;

/// Arguments for `gob fsck`.
#[derive(Args, Debug)]
pub struct FsckArgs {
    /// Store directory.
    pub dir: PathBuf,

    /// Also print the full scan report as JSON on stdout.
    #[arg(long)]
    pub json: bool,
}

/// Execute the fsck subcommand. Returns exit code 1 if anything was found.
pub fn run_fsck(args: &FsckArgs) -> Result<u8> {
    let report = scan_store(args)?;

    for finding in &report.findings {
        eprintln!("{finding}");
    }
    if args.json {
        let mut stdout = io::stdout().lock();
        serde_json::to_writer_pretty(&mut stdout, &report).context("cannot write report")?;
        writeln!(stdout).context("cannot write report")?;
    }

    if report.is_clean() {
        Ok(0)
    } else {
        eprintln!(
            "{} problem(s) in {} block(s) across {} shard(s)",
            report.findings.len(),
            report.blocks_scanned,
            report.shards_scanned
        );
        Ok(1)
    }
}

/// Open the store named by `args` and scan it.
pub fn scan_store(args: &FsckArgs) -> Result<ScanReport> {
    let repo = open_store(&args.dir)?;
    let report = gob_store::scan(&repo).context("fsck failed")?;
    repo.close();
    Ok(report)
}
