//! Store Module
//!
//! One sorted hit store: three parallel column files for a
//! (prefix, chromosome, hit type) triple.
//!
//! ## Responsibilities
//! - Open the three columns as one row-addressable store
//! - Keep `positions` non-decreasing across every write path
//! - Route a new sorted batch to append (fast path) or merge
//! - Rebuild sort order when it cannot be assumed (resort)
//! - Publish full rewrites through temp-then-rename commit
//!
//! ## Write Paths
//! ```text
//!                  new sorted batch
//!                         │
//!          ┌──────────────┼───────────────┐
//!          │ store empty  │ first > last  │ otherwise
//!          ▼              ▼               ▼
//!      ┌────────┐    ┌─────────┐     ┌─────────┐        ┌─────────┐
//!      │ create │    │ append  │     │  merge  │        │ resort  │
//!      └───┬────┘    │(in place│     └────┬────┘        └────┬────┘
//!          │         │ no tmp) │          │                  │
//!          │         └─────────┘          │                  │
//!          └──────────────┬───────────────┴──────────────────┘
//!                         ▼
//!              write *.tmp → fsync → rename ×3
//! ```

mod append;
mod commit;
mod merge;
mod recovery;
mod resort;

pub use commit::StagedStore;
pub use recovery::{ColumnStatus, PendingCommit, RecoveryReport, StoreRecovery};

use tracing::{debug, info};

use crate::column::ColumnReader;
use crate::config::WriteOptions;
use crate::error::{HitStoreError, Result};
use crate::format::{decode_las, encode_las, StorePaths, MAX_LENGTH};
use crate::hit::Hit;

/// Read handle on one store, plus the write paths that replace it.
///
/// Write paths consume the handle (its maps must be released before the
/// canonical files are replaced) and return a freshly opened one.
pub struct HitStore {
    paths: StorePaths,
    positions: ColumnReader<i32>,
    weights: ColumnReader<f32>,
    las: ColumnReader<i32>,
}

impl HitStore {
    /// Open the store at `paths`.
    ///
    /// A store whose three files are all absent opens as empty. Any other
    /// disagreement between the columns is an `Inconsistent` error.
    pub fn open(paths: StorePaths) -> Result<Self> {
        let positions = open_column::<i32>(&paths.positions)?;
        let weights = open_column::<f32>(&paths.weights)?;
        let las = open_column::<i32>(&paths.las)?;

        // A missing column reads as zero records, so a partly missing store
        // fails the length check below
        let store = Self {
            positions: positions.unwrap_or_else(|| ColumnReader::empty(&paths.positions)),
            weights: weights.unwrap_or_else(|| ColumnReader::empty(&paths.weights)),
            las: las.unwrap_or_else(|| ColumnReader::empty(&paths.las)),
            paths,
        };

        store.check_lengths()?;
        debug!(
            chrom = store.paths.chrom,
            hit_type = %store.paths.hit_type,
            records = store.len(),
            "opened store"
        );
        Ok(store)
    }

    /// Write `hits` as a brand new store, replacing any existing one wholesale
    pub fn create(paths: StorePaths, hits: &[Hit], options: WriteOptions) -> Result<Self> {
        validate_batch(hits)?;

        let mut staged = StagedStore::create(&paths, hits.len(), "write")?;
        for (index, hit) in hits.iter().enumerate() {
            staged.put_hit(index, hit);
        }
        staged.commit(options)?;

        info!(
            chrom = paths.chrom,
            hit_type = %paths.hit_type,
            records = hits.len(),
            "wrote store"
        );
        Self::open(paths)
    }

    /// Add a sorted batch, choosing the cheapest path that keeps the store sorted.
    ///
    /// - empty batch: store returned unchanged
    /// - empty store: written with `create`
    /// - batch starts strictly after the last stored position: `append`
    /// - otherwise: `merge`
    pub fn extend(self, hits: &[Hit], options: WriteOptions) -> Result<Self> {
        let first = match hits.first() {
            Some(hit) => hit.position,
            None => return Ok(self),
        };

        match self.last_position() {
            None => {
                let paths = self.paths.clone();
                drop(self);
                Self::create(paths, hits, options)
            }
            Some(last) if first > last => self.append(hits, options),
            Some(_) => self.merge(hits, options),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Number of hits
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    pub fn positions(&self) -> &ColumnReader<i32> {
        &self.positions
    }

    pub fn weights(&self) -> &ColumnReader<f32> {
        &self.weights
    }

    pub fn las_words(&self) -> &ColumnReader<i32> {
        &self.las
    }

    #[inline]
    pub fn position(&self, index: usize) -> i32 {
        self.positions.get(index)
    }

    #[inline]
    pub fn weight(&self, index: usize) -> f32 {
        self.weights.get(index)
    }

    #[inline]
    pub fn las(&self, index: usize) -> i32 {
        self.las.get(index)
    }

    /// Decoded hit at `index`
    ///
    /// # Panics
    /// If `index >= self.len()`.
    pub fn hit(&self, index: usize) -> Hit {
        let (length, strand) = decode_las(self.las(index));
        Hit {
            position: self.position(index),
            strand,
            length,
            weight: self.weight(index),
        }
    }

    /// Iterate over all hits in stored order
    pub fn iter(&self) -> impl Iterator<Item = Hit> + '_ {
        (0..self.len()).map(move |index| self.hit(index))
    }

    pub fn first_position(&self) -> Option<i32> {
        self.positions.try_get(0)
    }

    pub fn last_position(&self) -> Option<i32> {
        self.positions.last()
    }

    /// Whether `positions` is non-decreasing
    pub fn is_sorted(&self) -> bool {
        (1..self.len()).all(|index| self.position(index - 1) <= self.position(index))
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn check_lengths(&self) -> Result<()> {
        let (positions, weights, las) = (self.positions.len(), self.weights.len(), self.las.len());
        if positions != weights || positions != las {
            return Err(HitStoreError::Inconsistent {
                path: self.paths.positions.clone(),
                positions: positions as u64,
                weights: weights as u64,
                las: las as u64,
            });
        }
        Ok(())
    }
}

/// Check a batch before any of it is written: lengths must fit the packed
/// word and positions must be non-decreasing.
pub fn validate_batch(hits: &[Hit]) -> Result<()> {
    for (index, hit) in hits.iter().enumerate() {
        if hit.length > MAX_LENGTH {
            return Err(HitStoreError::LengthOutOfRange {
                index,
                length: hit.length,
            });
        }
        if index > 0 && hits[index - 1].position > hit.position {
            return Err(HitStoreError::UnsortedBatch { index });
        }
    }
    Ok(())
}

/// Packed word for a validated hit
#[inline]
pub(crate) fn las_of(hit: &Hit) -> i32 {
    encode_las(hit.length, hit.strand)
}

fn open_column<T: crate::column::Element>(
    path: &std::path::Path,
) -> Result<Option<ColumnReader<T>>> {
    match ColumnReader::open(path) {
        Ok(column) => Ok(Some(column)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}
