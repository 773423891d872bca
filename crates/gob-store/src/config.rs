//! Chunking configuration.
//!
//! The block length only controls how `chunk` slices its input. Blocks
//! already in a store are read back at whatever size they were written.
//! Defaults can be overridden via environment variables or explicit
//! construction.

/// Default block length in bytes.
pub const DEFAULT_BLOCK_LEN: usize = 4096;

/// Largest block length a store accepts, for writing and reading alike.
pub const MAX_BLOCK_LEN: usize = 16 * 1024 * 1024;

/// Environment variable overriding the block length.
pub const BLOCK_LEN_ENV: &str = "GOB_BLOCK_LEN";

/// Configuration for chunking streams into a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GobConfig {
    block_len: usize,
}

impl GobConfig {
    /// Create a configuration with an explicit block length.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBlockLen`] unless
    /// `1 <= block_len <= MAX_BLOCK_LEN`.
    pub fn with_block_len(block_len: usize) -> Result<Self, ConfigError> {
        if block_len == 0 || block_len > MAX_BLOCK_LEN {
            return Err(ConfigError::InvalidBlockLen(format!(
                "{block_len} is outside 1..={MAX_BLOCK_LEN}"
            )));
        }
        Ok(Self { block_len })
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `GOB_BLOCK_LEN` (default: 4096)
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(BLOCK_LEN_ENV) {
            Ok(raw) => Self::parse_block_len(&raw),
            Err(_) => Ok(Self::default()),
        }
    }

    fn parse_block_len(raw: &str) -> Result<Self, ConfigError> {
        let block_len = raw
            .trim()
            .parse::<usize>()
            .map_err(|e| ConfigError::InvalidBlockLen(format!("{raw:?}: {e}")))?;
        Self::with_block_len(block_len)
    }

    pub fn block_len(&self) -> usize {
        self.block_len
    }
}

impl Default for GobConfig {
    fn default() -> Self {
        Self {
            block_len: DEFAULT_BLOCK_LEN,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid block length {0}")]
    InvalidBlockLen(String),
}
