//! # gob-core: Foundational Types for the gob Block Store
//!
//! Every block in a gob store is named by its content digest. This crate
//! defines that name and the pieces derived from it:
//!
//! - [`Digest`]: a [`HASH_LEN`]-byte SHA-256 value with a cached lowercase
//!   hex rendering. Equality is binary.
//! - [`StreamHasher`]: the incremental form, `new → update* → finalize`.
//! - [`ShardId`]: the first digest byte, selecting one of 256 shard
//!   directories.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `gob-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod digest;
pub mod error;
pub mod shard;

pub use digest::{Digest, StreamHasher, HASH_LEN, HEX_LEN};
pub use error::DigestError;
pub use shard::{ShardId, SHARD_COUNT};
