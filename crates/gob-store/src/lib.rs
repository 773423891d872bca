//! # gob-store: Content-Addressed Block Store
//!
//! Stores byte streams as fixed-size, content-addressed blocks:
//!
//! - [`Repository`]: the on-disk store. Blocks live in 256 shard
//!   directories and are written through a temporary file plus no-clobber
//!   rename, so a block name only ever refers to complete content.
//! - [`chunk()`]: splits a stream into blocks, stores them and streams out
//!   the index text needed to rebuild it.
//! - [`cat()`]: rebuilds a stream from its index, then checks both the
//!   total length and the whole-stream digest against the [`Trailer`].
//! - [`fsck`]: an offline scanner that recomputes every block digest and
//!   reports problems without stopping or repairing anything.
//!
//! ## Crate Policy
//!
//! - Depends only on `gob-core` internally.
//! - Library code returns [`StoreError`] and never terminates the process.
//! - Tests run against real directories created with `tempfile`.

pub mod cat;
pub mod chunk;
pub mod config;
pub mod error;
pub mod fsck;
pub mod index;
pub mod io;
pub mod repository;

#[cfg(test)]
mod testing;

pub use cat::{cat, reassemble};
pub use chunk::chunk;
pub use config::{ConfigError, GobConfig, BLOCK_LEN_ENV, DEFAULT_BLOCK_LEN, MAX_BLOCK_LEN};
pub use error::StoreError;
pub use fsck::{scan, Finding, ScanReport, Scanner};
pub use index::{Index, Trailer};
pub use repository::{Repository, STORE_VERSION};
