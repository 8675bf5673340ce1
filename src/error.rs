//! Crate error type.
//!
//! The cache API itself is total — a lookup that finds nothing returns
//! `None`, `false`, or an empty `Vec`, never an error. The one fallible
//! surface is loading a [`CacheConfig`](crate::config::CacheConfig) from
//! disk.

use thiserror::Error;

/// Convenience alias for the fallible parts of this crate.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors produced while loading configuration from disk.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid JSON for the config schema.
    #[error("failed to parse config JSON: {0}")]
    Parse(#[from] serde_json::Error),
}
