//! Error types for hitstore
//!
//! Provides a unified error type for all store operations.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias using HitStoreError
pub type Result<T> = std::result::Result<T, HitStoreError>;

/// Unified error type for hitstore operations
#[derive(Debug, Error)]
pub enum HitStoreError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error during {op} on {}: {source}", path.display())]
    Io {
        /// Store operation that was running (append, merge, resort, ...)
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Store Invariant Errors
    // -------------------------------------------------------------------------
    #[error(
        "Inconsistent store {}: positions={positions} weights={weights} las={las} records",
        path.display()
    )]
    Inconsistent {
        path: PathBuf,
        positions: u64,
        weights: u64,
        las: u64,
    },

    #[error("Torn column {}: {bytes} bytes is not a whole number of records", path.display())]
    TornColumn { path: PathBuf, bytes: u64 },

    // -------------------------------------------------------------------------
    // Batch Errors
    // -------------------------------------------------------------------------
    #[error("Batch is not sorted by position at index {index}")]
    UnsortedBatch { index: usize },

    #[error("Append batch starts at {first} which sorts before store end {last}")]
    AppendOutOfOrder { first: i32, last: i32 },

    #[error("Hit {index} has length {length} which does not fit the packed length field")]
    LengthOutOfRange { index: usize, length: u32 },

    #[error("Record count {count} exceeds the store's addressable range")]
    TooManyRecords { count: u64 },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl HitStoreError {
    /// Build a closure that wraps an `io::Error` with operation and path context.
    ///
    /// Meant for `map_err`: `file.sync_all().map_err(HitStoreError::io("merge", &path))?`
    pub fn io<'a>(op: &'static str, path: &'a Path) -> impl FnOnce(std::io::Error) -> Self + 'a {
        move |source| Self::Io {
            op,
            path: path.to_path_buf(),
            source,
        }
    }

    /// True when this is an I/O error whose cause is a missing file
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}
