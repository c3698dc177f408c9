//! Engine Module
//!
//! Coordinates every store under one path prefix.
//!
//! ## Responsibilities
//! - Map (chromosome, hit type) to store paths
//! - Validate (or sort) incoming batches before they reach a store
//! - Serialize in-process writers per store
//! - Discover existing stores under the prefix

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{HitStoreError, Result};
use crate::format::{Column, StorePaths};
use crate::hit::{Hit, HitType};
use crate::store::{validate_batch, HitStore, RecoveryReport, StoreRecovery};

/// Key identifying one store under the engine's prefix
pub type StoreKey = (u32, HitType);

/// Entry point for reading and writing hit stores
///
/// ## Concurrency Model: Single Writer Per Store
///
/// - Writes to one store (write/ingest/resort/recover) are serialized by a
///   per-store lock, so threads sharing an Engine never interleave on it
/// - Different stores proceed independently
/// - Readers (`open_store`) take no lock; rewrites only ever rename fully
///   written files into place
/// - Separate processes writing the same prefix are NOT coordinated
pub struct Engine {
    config: Config,

    /// Per-store write locks, created on first use
    write_locks: Mutex<HashMap<StoreKey, Arc<Mutex<()>>>>,
}

impl Engine {
    /// Open an engine with the given config
    ///
    /// Creates the directory part of the prefix if it doesn't exist.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let dir = prefix_dir(&config.prefix);
        fs::create_dir_all(dir).map_err(HitStoreError::io("open", dir))?;

        debug!(prefix = %config.prefix, "engine opened");
        Ok(Self {
            config,
            write_locks: Mutex::new(HashMap::new()),
        })
    }

    /// Open with a prefix (convenience method)
    ///
    /// Uses default config with the specified prefix
    pub fn open_prefix(prefix: impl Into<String>) -> Result<Self> {
        Self::open(Config::builder().prefix(prefix).build())
    }

    /// File paths of a store
    pub fn paths(&self, chrom: u32, hit_type: HitType) -> StorePaths {
        StorePaths::new(&self.config.prefix, chrom, hit_type)
    }

    /// Open a store for reading (empty if it was never written)
    pub fn open_store(&self, chrom: u32, hit_type: HitType) -> Result<HitStore> {
        HitStore::open(self.paths(chrom, hit_type))
    }

    /// Replace a store wholesale with `hits`
    pub fn write(&self, chrom: u32, hit_type: HitType, hits: &[Hit]) -> Result<HitStore> {
        let lock = self.write_lock(chrom, hit_type);
        let _guard = lock.lock();

        let hits = self.prepare(hits)?;
        HitStore::create(self.paths(chrom, hit_type), &hits, self.config.write_options())
    }

    /// Add hits to a store, appending or merging as the data allows
    pub fn ingest(&self, chrom: u32, hit_type: HitType, hits: &[Hit]) -> Result<HitStore> {
        let lock = self.write_lock(chrom, hit_type);
        let _guard = lock.lock();

        let hits = self.prepare(hits)?;
        let store = self.open_store(chrom, hit_type)?;
        store.extend(&hits, self.config.write_options())
    }

    /// Rebuild a store's sort order
    pub fn resort(&self, chrom: u32, hit_type: HitType) -> Result<HitStore> {
        let lock = self.write_lock(chrom, hit_type);
        let _guard = lock.lock();

        self.open_store(chrom, hit_type)?
            .resort(self.config.write_options())
    }

    /// Inspect a store's files without changing them
    pub fn verify(&self, chrom: u32, hit_type: HitType) -> Result<RecoveryReport> {
        StoreRecovery::verify(&self.paths(chrom, hit_type))
    }

    /// Repair a store left behind by an interrupted write
    pub fn recover(&self, chrom: u32, hit_type: HitType) -> Result<RecoveryReport> {
        let lock = self.write_lock(chrom, hit_type);
        let _guard = lock.lock();

        StoreRecovery::recover(&self.paths(chrom, hit_type))
    }

    /// Stores with a positions file under the prefix, sorted by chromosome then type
    pub fn stores(&self) -> Result<Vec<StoreKey>> {
        let dir = prefix_dir(&self.config.prefix);
        let name_prefix = prefix_file_part(&self.config.prefix);

        let mut found = Vec::new();
        for entry in fs::read_dir(dir).map_err(HitStoreError::io("list", dir))? {
            let entry = entry.map_err(HitStoreError::io("list", dir))?;
            let name = entry.file_name();
            if let Some(key) = parse_store_name(&name.to_string_lossy(), name_prefix) {
                found.push(key);
            }
        }

        found.sort();
        found.dedup();
        Ok(found)
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn write_lock(&self, chrom: u32, hit_type: HitType) -> Arc<Mutex<()>> {
        let mut locks = self.write_locks.lock();
        Arc::clone(locks.entry((chrom, hit_type)).or_default())
    }

    /// Validate a batch, sorting a copy first when the config allows it
    fn prepare<'a>(&self, hits: &'a [Hit]) -> Result<Cow<'a, [Hit]>> {
        match validate_batch(hits) {
            Ok(()) => Ok(Cow::Borrowed(hits)),
            Err(HitStoreError::UnsortedBatch { index }) if self.config.sort_incoming => {
                debug!(index, batch = hits.len(), "sorting incoming batch");
                let mut sorted = hits.to_vec();
                // Stable, so equal positions keep arrival order
                sorted.sort_by_key(|hit| hit.position);
                validate_batch(&sorted)?;
                info!(batch = sorted.len(), "sorted incoming batch");
                Ok(Cow::Owned(sorted))
            }
            Err(e) => Err(e),
        }
    }
}

/// Directory part of a prefix: "/data/run1_" → "/data", "run1_" → "."
fn prefix_dir(prefix: &str) -> &Path {
    if prefix.ends_with(std::path::MAIN_SEPARATOR) || prefix.ends_with('/') {
        return Path::new(prefix);
    }
    match Path::new(prefix).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// File name part of a prefix: "/data/run1_" → "run1_", "/data/" → ""
fn prefix_file_part(prefix: &str) -> &str {
    if prefix.ends_with(std::path::MAIN_SEPARATOR) || prefix.ends_with('/') {
        return "";
    }
    Path::new(prefix)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("")
}

/// "run1_7.spositions" with prefix "run1_" → Some((7, Primary))
fn parse_store_name(name: &str, name_prefix: &str) -> Option<StoreKey> {
    let rest = name.strip_prefix(name_prefix)?;
    [HitType::Primary, HitType::Secondary]
        .into_iter()
        .find_map(|hit_type| {
            let chrom = rest.strip_suffix(Column::Positions.suffix(hit_type))?;
            chrom.parse().ok().map(|chrom| (chrom, hit_type))
        })
}
