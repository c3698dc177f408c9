//! Configuration for hitstore
//!
//! Centralized configuration with sensible defaults.

use crate::error::{HitStoreError, Result};

/// Main configuration for a hitstore engine
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Path prefix shared by every store file.
    /// File names are built by plain concatenation:
    ///   {prefix}{chrom}.spositions
    ///   {prefix}{chrom}.sweights
    ///   {prefix}{chrom}.slas
    /// (`.st2*` for the secondary hit type)
    pub prefix: String,

    // -------------------------------------------------------------------------
    // Write Configuration
    // -------------------------------------------------------------------------
    /// When to fsync column files
    pub sync_strategy: SyncStrategy,

    /// Buffered writer capacity used by the append path (in bytes)
    pub write_buffer_size: usize,

    // -------------------------------------------------------------------------
    // Ingest Configuration
    // -------------------------------------------------------------------------
    /// Sort incoming batches by position before writing instead of rejecting them
    pub sort_incoming: bool,
}

/// Sync strategy for column files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync every column before commit and after append (safest, slowest)
    Always,

    /// Leave write-back to the OS
    Never,
}

/// Options threaded through the store write paths
#[derive(Debug, Clone, Copy)]
pub struct WriteOptions {
    pub sync_strategy: SyncStrategy,
    pub write_buffer_size: usize,
}

impl WriteOptions {
    pub fn should_sync(&self) -> bool {
        self.sync_strategy == SyncStrategy::Always
    }
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            sync_strategy: SyncStrategy::Always,
            write_buffer_size: 64 * 1024, // 64 KB
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let options = WriteOptions::default();
        Self {
            prefix: "./hitstore_data/".to_string(),
            sync_strategy: options.sync_strategy,
            write_buffer_size: options.write_buffer_size,
            sort_incoming: false,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Options for the store write paths
    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            sync_strategy: self.sync_strategy,
            write_buffer_size: self.write_buffer_size,
        }
    }

    /// Reject configurations no store could be written with
    pub fn validate(&self) -> Result<()> {
        if self.prefix.is_empty() {
            return Err(HitStoreError::Config("prefix must not be empty".to_string()));
        }
        if self.write_buffer_size == 0 {
            return Err(HitStoreError::Config(
                "write_buffer_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the storage path prefix
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.prefix = prefix.into();
        self
    }

    /// Set the sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    /// Set the append buffer size (in bytes)
    pub fn write_buffer_size(mut self, size: usize) -> Self {
        self.config.write_buffer_size = size;
        self
    }

    /// Sort unsorted ingest batches instead of rejecting them
    pub fn sort_incoming(mut self, enabled: bool) -> Self {
        self.config.sort_incoming = enabled;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
