//! # Store Scanner (fsck)
//!
//! Walks every shard and block of a repository, recomputes each block's
//! digest and records every problem as a [`Finding`]. The scan never stops
//! at the first problem and never modifies the store.
//!
//! Entries are visited in sorted name order, so two scans of the same store
//! report the same findings in the same order.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use gob_core::{Digest, ShardId, HEX_LEN};
use serde::Serialize;

use crate::error::StoreError;
use crate::repository::{Repository, VERSION_FILE};

/// Length of a block file name: the digest's hex form minus the shard prefix.
pub const BLOCK_NAME_LEN: usize = HEX_LEN - 2;

/// One integrity problem found by the scanner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    /// A root entry that is not a valid shard directory.
    MalformedShard { name: String, reason: String },
    /// A shard entry that is not a valid block file.
    MalformedBlockName {
        shard: String,
        name: String,
        reason: String,
    },
    /// A block whose content does not hash to its name.
    HashMismatch { expected: Digest, computed: Digest },
    /// An entry that could not be listed, inspected or read.
    ReadError { path: PathBuf, error: String },
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedShard { name, reason } => {
                write!(f, "malformed shard {name:?}: {reason}")
            }
            Self::MalformedBlockName {
                shard,
                name,
                reason,
            } => write!(f, "malformed block name {shard}/{name:?}: {reason}"),
            Self::HashMismatch { expected, computed } => {
                write!(f, "hash mismatch for block {expected}: content hashes to {computed}")
            }
            Self::ReadError { path, error } => {
                write!(f, "read error on {}: {error}", path.display())
            }
        }
    }
}

/// The outcome of one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub findings: Vec<Finding>,
    pub shards_scanned: usize,
    pub blocks_scanned: usize,
}

impl ScanReport {
    /// True when the scan recorded no findings.
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Walks one repository and accumulates a [`ScanReport`].
pub struct Scanner<'a> {
    root: &'a Path,
    report: ScanReport,
}

impl<'a> Scanner<'a> {
    pub fn new(repo: &'a Repository) -> Self {
        Self {
            root: repo.root(),
            report: ScanReport::default(),
        }
    }

    /// Scan the whole store.
    ///
    /// # Errors
    ///
    /// Only if the store root itself cannot be listed. Every other problem
    /// becomes a [`Finding`] in the returned report.
    pub fn run(mut self) -> Result<ScanReport, StoreError> {
        let root = self.root;
        let entries = fs::read_dir(root).map_err(StoreError::io_at(root))?;

        for (name, path) in self.sorted_entries(root, entries) {
            if name == VERSION_FILE {
                continue;
            }

            let meta = match fs::metadata(&path) {
                Ok(meta) => meta,
                Err(e) => {
                    self.record(Finding::ReadError {
                        path,
                        error: e.to_string(),
                    });
                    continue;
                }
            };
            if !meta.is_dir() {
                self.record(Finding::MalformedShard {
                    name,
                    reason: "not a directory".to_string(),
                });
                continue;
            }
            let Some(shard) = ShardId::from_name(&name) else {
                self.record(Finding::MalformedShard {
                    name,
                    reason: "name is not two lowercase hex characters".to_string(),
                });
                continue;
            };

            self.scan_shard(shard, &path);
        }

        tracing::info!(
            shards = self.report.shards_scanned,
            blocks = self.report.blocks_scanned,
            findings = self.report.findings.len(),
            "scan complete"
        );
        Ok(self.report)
    }

    fn scan_shard(&mut self, shard: ShardId, dir: &Path) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                self.record(Finding::ReadError {
                    path: dir.to_path_buf(),
                    error: e.to_string(),
                });
                return;
            }
        };
        self.report.shards_scanned += 1;

        for (name, path) in self.sorted_entries(dir, entries) {
            let meta = match fs::metadata(&path) {
                Ok(meta) => meta,
                Err(e) => {
                    self.record(Finding::ReadError {
                        path,
                        error: e.to_string(),
                    });
                    continue;
                }
            };
            if !meta.is_file() {
                self.record(Finding::MalformedBlockName {
                    shard: shard.name(),
                    name,
                    reason: "not a regular file".to_string(),
                });
                continue;
            }

            let expected = match block_digest(shard, &name) {
                Some(digest) => digest,
                None => {
                    self.record(Finding::MalformedBlockName {
                        shard: shard.name(),
                        name,
                        reason: format!("not {BLOCK_NAME_LEN} lowercase hex characters"),
                    });
                    continue;
                }
            };

            let data = match fs::read(&path) {
                Ok(data) => data,
                Err(e) => {
                    self.record(Finding::ReadError {
                        path,
                        error: e.to_string(),
                    });
                    continue;
                }
            };
            self.report.blocks_scanned += 1;

            let computed = Digest::compute(&data);
            if computed != expected {
                self.record(Finding::HashMismatch { expected, computed });
            } else {
                tracing::trace!(block = %expected, "block ok");
            }
        }
    }

    /// Collect a directory listing as `(name, path)` pairs sorted by name.
    ///
    /// Entries that cannot be read are recorded and left out. Names that are
    /// not valid UTF-8 are kept in lossy form so they still get reported.
    fn sorted_entries(&mut self, dir: &Path, entries: fs::ReadDir) -> Vec<(String, PathBuf)> {
        let mut listed = Vec::new();
        for entry in entries {
            match entry {
                Ok(entry) => {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    listed.push((name, entry.path()));
                }
                Err(e) => self.record(Finding::ReadError {
                    path: dir.to_path_buf(),
                    error: e.to_string(),
                }),
            }
        }
        listed.sort();
        listed
    }

    fn record(&mut self, finding: Finding) {
        tracing::debug!(%finding, "fsck finding");
        self.report.findings.push(finding);
    }
}

/// Scan `repo` and return its report.
pub fn scan(repo: &Repository) -> Result<ScanReport, StoreError> {
    Scanner::new(repo).run()
}

/// The digest a block file in `shard` named `name` must hash to, if the name
/// is well formed.
fn block_digest(shard: ShardId, name: &str) -> Option<Digest> {
    if name.len() != BLOCK_NAME_LEN {
        return None;
    }
    Digest::from_hex(&format!("{shard}{name}")).ok()
}
