//! # Error Types
//!
//! Errors produced by the foundational types. Built with `thiserror`; each
//! variant carries enough context to point at the offending input.

use thiserror::Error;

/// Errors from constructing or parsing a [`Digest`](crate::Digest).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DigestError {
    /// The input is not a canonical lowercase hex digest.
    #[error("invalid digest encoding: {reason}")]
    InvalidEncoding {
        /// What was wrong with the input.
        reason: String,
    },
}
